use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::gitea::server::ServerStateRef;
use crate::gitea::{GiteaRepoName, PullRequestNumber, PullRequestRef};
use crate::lgtm::LgtmError;

/// Gitea payloads are small, anything above this is not a webhook we care about.
const MAX_WEBHOOK_BODY_SIZE: usize = 5 * 1024 * 1024;

/// Values of the `X-Gitea-Event` header that carry a pull request payload.
const PULL_REQUEST_EVENTS: &[&str] = &[
    "pull_request",
    "pull_request_approved",
    "pull_request_rejected",
    "pull_request_comment",
    "pull_request_assign",
    "pull_request_label",
    "pull_request_milestone",
    "pull_request_sync",
    "pull_request_review_request",
];

/// A webhook delivery that passed authentication.
#[derive(Debug)]
pub enum WebhookEvent {
    PullRequest(PullRequestEvent),
    /// Any other kind of hook, identified by its `X-Gitea-Event` value.
    Unsupported(String),
}

#[derive(Debug, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub action: String,
    pub owner: String,
    pub repository: String,
    pub number: u64,
}

impl PullRequestEvent {
    /// Returns the targeted pull request, if the payload identifies one.
    pub fn pull_request(&self) -> Option<PullRequestRef> {
        if self.owner.is_empty() || self.repository.is_empty() || self.number == 0 {
            return None;
        }
        Some(PullRequestRef {
            repository: GiteaRepoName::new(&self.owner, &self.repository),
            number: PullRequestNumber(self.number),
        })
    }
}

#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequestPayload {
    #[serde(default)]
    action: String,
    pull_request: Option<WebhookPullRequest>,
    repository: Option<WebhookRepository>,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequest {
    #[serde(default)]
    number: u64,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookRepository {
    #[serde(default)]
    name: String,
    owner: Option<WebhookUser>,
}

/// Gitea sends both `login` and `username` for users, older versions only `username`.
#[derive(serde::Deserialize, Debug)]
struct WebhookUser {
    login: Option<String>,
    username: Option<String>,
}

/// axum extractor for Gitea webhook events.
#[derive(Debug)]
pub struct GiteaWebhook(pub WebhookEvent);

/// Extracts a webhook event from a HTTP request.
#[async_trait]
impl FromRequest<ServerStateRef> for GiteaWebhook {
    type Rejection = LgtmError;

    async fn from_request(request: Request, state: &ServerStateRef) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();

        // Eagerly load body
        let body: Bytes = axum::body::to_bytes(body, MAX_WEBHOOK_BODY_SIZE)
            .await
            .map_err(|error| {
                tracing::error!("Parsing webhook body failed: {error:?}");
                LgtmError::InvalidPayload(anyhow::anyhow!("Cannot read webhook body: {error}"))
            })?;

        let secret = state.get_webhook_secret().map_err(|error| {
            tracing::error!("Cannot load webhook secret: {error}");
            LgtmError::InvalidPayload(anyhow::anyhow!("Webhook secret is unavailable"))
        })?;

        // Verify that the request is valid
        if !verify_gitea_signature(&parts.headers, &body, &secret) {
            tracing::error!("Webhook request failed, could not authenticate webhook");
            return Err(LgtmError::InvalidPayload(anyhow::anyhow!(
                "Webhook signature is missing or invalid"
            )));
        }

        // Parse webhook content
        match parse_webhook_event(&parts.headers, &body) {
            Ok(event) => Ok(GiteaWebhook(event)),
            Err(error) => {
                tracing::error!("Cannot parse webhook event: {error:?}");
                Err(LgtmError::InvalidPayload(error))
            }
        }
    }
}

fn parse_webhook_event(headers: &HeaderMap, body: &[u8]) -> anyhow::Result<WebhookEvent> {
    let Some(event_type) = headers.get("x-gitea-event") else {
        return Err(anyhow::anyhow!("x-gitea-event header not found"));
    };
    let event_type = event_type.to_str()?;

    if !PULL_REQUEST_EVENTS.contains(&event_type) {
        tracing::debug!("Received unsupported event type {event_type:?}");
        return Ok(WebhookEvent::Unsupported(event_type.to_string()));
    }

    let payload: WebhookPullRequestPayload = serde_json::from_slice(body)?;
    let owner = payload
        .repository
        .as_ref()
        .and_then(|repo| repo.owner.as_ref())
        .and_then(|owner| owner.login.clone().or_else(|| owner.username.clone()))
        .unwrap_or_default();
    Ok(WebhookEvent::PullRequest(PullRequestEvent {
        action: payload.action,
        owner,
        repository: payload.repository.map(|repo| repo.name).unwrap_or_default(),
        number: payload.pull_request.map(|pr| pr.number).unwrap_or_default(),
    }))
}

type HmacSha256 = Hmac<Sha256>;

/// Verifies that the request is signed by Gitea with HMAC-SHA256 and the passed `secret`.
/// Gitea sends the hex encoded digest in the `X-Gitea-Signature` header.
fn verify_gitea_signature(headers: &HeaderMap, body: &[u8], secret: &WebhookSecret) -> bool {
    let Some(signature) = headers
        .get("x-gitea-signature")
        .and_then(|v| hex::decode(v.as_bytes()).ok())
    else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Wrapper for a secret which is zeroed on drop and can be exposed only through the [`WebhookSecret::expose`] method.
pub struct WebhookSecret(SecretString);

impl WebhookSecret {
    pub fn new(secret: SecretString) -> Self {
        Self(secret)
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret().as_str()
    }
}
