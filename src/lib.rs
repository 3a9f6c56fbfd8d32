//! This is the library of lgtmbot, a Gitea webhook handler that keeps an approval
//! status label (`lgtm/need 2`, `lgtm/need 1`, `lgtm/done`) on pull requests.
pub mod config;
pub mod gitea;
pub mod lgtm;
pub mod secrets;
pub mod utils;

pub use gitea::server::{create_app, ServerState};
pub use secrets::{FileSecretProvider, SecretProvider};

#[cfg(test)]
mod tests;
