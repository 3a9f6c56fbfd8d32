use std::any::Any;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::WEBHOOK_SECRET;
use crate::gitea::webhook::{GiteaWebhook, WebhookSecret};
use crate::lgtm::{handle_webhook_event, LgtmError};
use crate::secrets::{SecretError, SecretProvider};

/// Shared server state for all axum handlers.
pub struct ServerState {
    secrets: Arc<dyn SecretProvider>,
}

impl ServerState {
    pub fn new(secrets: Arc<dyn SecretProvider>) -> Self {
        Self { secrets }
    }

    /// The webhook secret is loaded again for each delivery.
    pub fn get_webhook_secret(&self) -> Result<WebhookSecret, SecretError> {
        self.secrets.secret(WEBHOOK_SECRET).map(WebhookSecret::new)
    }

    pub fn secrets(&self) -> &dyn SecretProvider {
        self.secrets.as_ref()
    }
}

pub type ServerStateRef = Arc<ServerState>;

pub fn create_app(state: ServerState) -> Router {
    Router::new()
        .route("/", post(gitea_webhook_handler))
        .route("/health", get(health_handler))
        .layer(ConcurrencyLimitLayer::new(100))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(Arc::new(state))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Router panicked: {err:?}");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "")
}

/// Axum handler that receives a webhook and reconciles the approval label of its pull request.
/// Only the status code is reported back to Gitea.
pub async fn gitea_webhook_handler(
    State(state): State<ServerStateRef>,
    GiteaWebhook(event): GiteaWebhook,
) -> Result<StatusCode, LgtmError> {
    let outcome = handle_webhook_event(event, state.secrets()).await?;
    if outcome.failed_removals.is_empty() {
        tracing::info!("Label reconciled: {outcome}");
    } else {
        tracing::warn!("Label reconciled with failed removals: {outcome}");
    }
    Ok(StatusCode::OK)
}
