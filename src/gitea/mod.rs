//! Contains definitions of common types (repository name, pull request, label, review)
//! needed for working with Gitea repositories.
use std::fmt::{Display, Formatter};

use serde::Deserialize;

pub mod api;
pub mod server;
mod webhook;

pub use api::{GiteaClient, GiteaRepositoryClient};
pub use webhook::{GiteaWebhook, PullRequestEvent, WebhookEvent, WebhookSecret};

/// Unique identifier of a Gitea repository.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct GiteaRepoName {
    owner: String,
    name: String,
}

impl GiteaRepoName {
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for GiteaRepoName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}/{}", self.owner, self.name))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PullRequestNumber(pub u64);

impl From<u64> for PullRequestNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for PullRequestNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <u64 as Display>::fmt(&self.0, f)
    }
}

/// A pull request targeted by a single webhook delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequestRef {
    pub repository: GiteaRepoName,
    pub number: PullRequestNumber,
}

impl Display for PullRequestRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}#{}", self.repository, self.number))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct LabelId(pub u64);

impl Display for LabelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <u64 as Display>::fmt(&self.0, f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// State of a pull request review, as reported by Gitea.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub enum ReviewState {
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "COMMENT")]
    Comment,
    #[serde(rename = "REQUEST_CHANGES")]
    RequestChanges,
    #[serde(rename = "REQUEST_REVIEW")]
    RequestReview,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Review {
    pub id: u64,
    pub state: ReviewState,
}
