use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::gitea::GiteaRepoName;
use crate::secrets::SecretError;

/// Reasons why a webhook delivery could not be handled.
/// Every error ends the delivery, Gitea only ever sees the status code.
#[derive(Debug, thiserror::Error)]
pub enum LgtmError {
    #[error("Invalid webhook payload: {0:#}")]
    InvalidPayload(anyhow::Error),
    #[error("Unsupported webhook event: {0}")]
    UnsupportedEvent(String),
    #[error("Secret is unavailable: {0}")]
    SecretUnavailable(#[source] SecretError),
    #[error("Cannot initialize Gitea client: {0:#}")]
    ClientInit(anyhow::Error),
    #[error("Cannot fetch data from Gitea: {0:#}")]
    Fetch(anyhow::Error),
    #[error("Label `{label}` does not exist in repository {repository}")]
    LabelNotFound {
        label: String,
        repository: GiteaRepoName,
    },
    #[error("Cannot apply label `{label}`: {error:#}")]
    LabelApply { label: String, error: anyhow::Error },
}

impl LgtmError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LgtmError::InvalidPayload(_) | LgtmError::UnsupportedEvent(_) => {
                StatusCode::BAD_REQUEST
            }
            LgtmError::SecretUnavailable(_)
            | LgtmError::ClientInit(_)
            | LgtmError::Fetch(_)
            | LgtmError::LabelNotFound { .. }
            | LgtmError::LabelApply { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors were already logged where they happened, the response carries no body.
impl IntoResponse for LgtmError {
    fn into_response(self) -> Response {
        self.status_code().into_response()
    }
}
