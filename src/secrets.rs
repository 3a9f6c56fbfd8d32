//! Access to the secrets the bot needs to talk to Gitea and to authenticate webhooks.
//!
//! Secrets are read again on every webhook delivery, so rotating a mounted secret
//! takes effect without a restart.
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret `{0}` is missing or empty")]
    Missing(String),
    #[error("cannot read secret `{key}`: {error}")]
    Unreadable { key: String, error: std::io::Error },
}

/// Read-only key-value store of secrets.
pub trait SecretProvider: Send + Sync {
    /// Returns the value of the secret stored under `key`.
    /// Surrounding whitespace is stripped and an empty value is treated as missing.
    fn secret(&self, key: &str) -> Result<SecretString, SecretError>;
}

/// Reads secrets from files in a single directory, one file per key.
/// This is how OpenFaaS and Kubernetes expose mounted secrets.
pub struct FileSecretProvider {
    root: PathBuf,
}

impl FileSecretProvider {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl SecretProvider for FileSecretProvider {
    fn secret(&self, key: &str) -> Result<SecretString, SecretError> {
        // Keys are plain file names, never paths.
        if key.is_empty() || key.contains(|c: char| c == '/' || c == '\\') || key == ".." {
            return Err(SecretError::Missing(key.to_string()));
        }
        match std::fs::read_to_string(self.root.join(key)) {
            Ok(value) => normalize(key, &value),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                Err(SecretError::Missing(key.to_string()))
            }
            Err(error) => Err(SecretError::Unreadable {
                key: key.to_string(),
                error,
            }),
        }
    }
}

/// Serves secrets from memory.
#[derive(Default)]
pub struct StaticSecretProvider {
    secrets: HashMap<String, String>,
}

impl StaticSecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.secrets.insert(key.to_string(), value.to_string());
        self
    }
}

impl SecretProvider for StaticSecretProvider {
    fn secret(&self, key: &str) -> Result<SecretString, SecretError> {
        match self.secrets.get(key) {
            Some(value) => normalize(key, value),
            None => Err(SecretError::Missing(key.to_string())),
        }
    }
}

fn normalize(key: &str, value: &str) -> Result<SecretString, SecretError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SecretError::Missing(key.to_string()));
    }
    Ok(SecretString::new(value.to_string()))
}
