/// Directory where OpenFaaS mounts function secrets.
pub const DEFAULT_SECRETS_DIR: &str = "/var/openfaas/secrets";

/// Secret holding the base URL of the Gitea instance.
pub const GITEA_HOST_SECRET: &str = "gitea-host";
/// Secret holding the API token used to modify labels.
pub const GITEA_TOKEN_SECRET: &str = "gitea-token";
/// Secret used to authenticate webhooks.
pub const WEBHOOK_SECRET: &str = "webhook-secret";

/// All approval status labels share this prefix.
/// At most one label with this prefix should be attached to a PR.
pub const LABEL_PREFIX: &str = "lgtm/";

/// Page size used for Gitea list endpoints.
pub const PAGE_LIMIT: u32 = 50;

/// Upper bound on the number of pages read from a single list endpoint.
/// Reaching it means the server does not honor the `page` parameter.
pub const MAX_PAGES: u32 = 100;
