//! Keeps the approval status label of pull requests in sync with their reviews.
use axum::async_trait;
use tracing::Instrument;

use crate::config::{GITEA_HOST_SECRET, GITEA_TOKEN_SECRET};
use crate::gitea::{
    GiteaClient, GiteaRepoName, Label, LabelId, PullRequest, PullRequestNumber, PullRequestRef,
    Review, WebhookEvent,
};
use crate::secrets::SecretProvider;
use crate::utils::logging::LogError;

mod error;
mod labels;

pub use error::LgtmError;
pub use labels::{count_approvals, reconcile_approval_label, ApprovalLabel, ReconcileOutcome};

/// Provides functionality for working with a remote repository.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    fn repository(&self) -> &GiteaRepoName;

    /// Resolve a pull request from this repository by its number.
    async fn get_pull_request(&self, pr: PullRequestNumber) -> anyhow::Result<PullRequest>;

    /// Return all reviews submitted to the given pull request.
    async fn get_reviews(&self, pr: PullRequestNumber) -> anyhow::Result<Vec<Review>>;

    /// Return all labels defined in the repository.
    async fn get_labels(&self) -> anyhow::Result<Vec<Label>>;

    /// Attach existing repository labels to a PR.
    async fn add_labels(&self, pr: PullRequestNumber, labels: &[LabelId]) -> anyhow::Result<()>;

    /// Detach a label from a PR.
    async fn remove_label(&self, pr: PullRequestNumber, label: LabelId) -> anyhow::Result<()>;
}

/// Handles a single authenticated webhook delivery.
/// Only pull request events that identify a pull request are accepted.
pub async fn handle_webhook_event(
    event: WebhookEvent,
    secrets: &dyn SecretProvider,
) -> Result<ReconcileOutcome, LgtmError> {
    let pr = match event {
        WebhookEvent::PullRequest(event) => match event.pull_request() {
            Some(pr) => pr,
            None => {
                tracing::warn!("Pull request event does not identify a pull request: {event:?}");
                return Err(LgtmError::UnsupportedEvent(format!(
                    "pull request event `{}` without owner, repository or number",
                    event.action
                )));
            }
        },
        WebhookEvent::Unsupported(kind) => {
            tracing::warn!("Ignoring unsupported event `{kind}`");
            return Err(LgtmError::UnsupportedEvent(kind));
        }
    };

    let span = tracing::info_span!("PullRequest", pr = pr.to_string());
    let result = reconcile_pull_request(&pr, secrets)
        .instrument(span.clone())
        .await;
    if let Err(error) = &result {
        span.log_error(error);
    }
    result
}

async fn reconcile_pull_request(
    pr: &PullRequestRef,
    secrets: &dyn SecretProvider,
) -> Result<ReconcileOutcome, LgtmError> {
    let host = secrets
        .secret(GITEA_HOST_SECRET)
        .map_err(LgtmError::SecretUnavailable)?;
    let token = secrets
        .secret(GITEA_TOKEN_SECRET)
        .map_err(LgtmError::SecretUnavailable)?;

    let client = GiteaClient::connect(&host, &token)
        .await
        .map_err(LgtmError::ClientInit)?;
    let repository = client.repository(pr.repository.clone());

    reconcile_approval_label(&repository, pr.number).await
}
