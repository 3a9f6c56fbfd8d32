use anyhow::Context;
use axum::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::{MAX_PAGES, PAGE_LIMIT};
use crate::gitea::{GiteaRepoName, Label, LabelId, PullRequest, PullRequestNumber, Review};
use crate::lgtm::RepositoryClient;

/// Authenticated access to the REST API (v1) of a single Gitea instance.
#[derive(Clone)]
pub struct GiteaClient {
    client: Client,
    api_url: Url,
}

impl GiteaClient {
    /// Creates a client and checks that the instance is reachable with the given token,
    /// the same way the Gitea SDK does when it is constructed.
    pub async fn connect(host: &SecretString, token: &SecretString) -> anyhow::Result<Self> {
        let client = Self::new(host.expose_secret(), token)?;
        let version = client
            .version()
            .await
            .with_context(|| format!("Cannot reach Gitea API at {}", client.api_url))?;
        tracing::debug!("Connected to Gitea {version}");
        Ok(client)
    }

    /// Creates a client without contacting the server.
    pub fn new(host: &str, token: &SecretString) -> anyhow::Result<Self> {
        let mut base =
            Url::parse(host.trim()).with_context(|| format!("Invalid Gitea host `{host}`"))?;
        // The host may be served under a sub-path, which has to be kept when joining.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let api_url = base
            .join("api/v1/")
            .with_context(|| format!("Invalid Gitea host `{host}`"))?;

        let mut authorization = HeaderValue::from_str(&format!("token {}", token.expose_secret()))
            .context("Gitea token is not a valid header value")?;
        authorization.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);

        let client = Client::builder()
            .user_agent(concat!("lgtmbot/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("Cannot build HTTP client")?;
        Ok(Self { client, api_url })
    }

    /// Returns a client scoped to a single repository.
    pub fn repository(&self, repo_name: GiteaRepoName) -> GiteaRepositoryClient {
        GiteaRepositoryClient {
            client: self.clone(),
            repo_name,
        }
    }

    async fn version(&self) -> anyhow::Result<String> {
        #[derive(serde::Deserialize)]
        struct ServerVersion {
            version: String,
        }

        let version: ServerVersion = self.get("version").await?;
        Ok(version.version)
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.api_url
            .join(path)
            .with_context(|| format!("Cannot create API URL for `{path}`"))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let url = self.url(path)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Request to {url} has failed"))?
            .error_for_status()?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("Cannot deserialize response from {url}"))
    }

    /// Loads all items of a paginated list endpoint.
    ///
    /// Pages are requested until the server returns an empty one, or until the number of
    /// collected items reaches the `X-Total-Count` header. Gitea may cap `limit` below the
    /// requested value, so a short page does not mean that it was the last one.
    async fn get_all_pages<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<Vec<T>> {
        let url = self.url(path)?;
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let response = self
                .client
                .get(url.clone())
                .query(&[("page", page), ("limit", PAGE_LIMIT)])
                .send()
                .await
                .with_context(|| format!("Request to {url} (page {page}) has failed"))?
                .error_for_status()?;
            let total = total_count(response.headers());
            let batch = response
                .json::<Vec<T>>()
                .await
                .with_context(|| format!("Cannot deserialize response from {url} (page {page})"))?;
            if batch.is_empty() {
                return Ok(items);
            }
            items.extend(batch);
            if total.is_some_and(|total| items.len() >= total) {
                return Ok(items);
            }
        }
        Err(anyhow::anyhow!(
            "{url} returned more than {MAX_PAGES} pages, the server is probably ignoring pagination"
        ))
    }
}

fn total_count(headers: &HeaderMap) -> Option<usize> {
    headers
        .get("x-total-count")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Provides access to a single repository using the Gitea API.
pub struct GiteaRepositoryClient {
    client: GiteaClient,
    repo_name: GiteaRepoName,
}

impl GiteaRepositoryClient {
    fn format_pr(&self, pr: PullRequestNumber) -> String {
        format!("{}#{}", self.repo_name, pr)
    }

    fn repo_path(&self, suffix: &str) -> String {
        format!(
            "repos/{}/{}/{suffix}",
            self.repo_name.owner(),
            self.repo_name.name()
        )
    }
}

#[async_trait]
impl RepositoryClient for GiteaRepositoryClient {
    fn repository(&self) -> &GiteaRepoName {
        &self.repo_name
    }

    async fn get_pull_request(&self, pr: PullRequestNumber) -> anyhow::Result<PullRequest> {
        self.client
            .get(&self.repo_path(&format!("pulls/{pr}")))
            .await
            .with_context(|| format!("Could not get PR {}", self.format_pr(pr)))
    }

    async fn get_reviews(&self, pr: PullRequestNumber) -> anyhow::Result<Vec<Review>> {
        self.client
            .get_all_pages(&self.repo_path(&format!("pulls/{pr}/reviews")))
            .await
            .with_context(|| format!("Could not list reviews of PR {}", self.format_pr(pr)))
    }

    async fn get_labels(&self) -> anyhow::Result<Vec<Label>> {
        self.client
            .get_all_pages(&self.repo_path("labels"))
            .await
            .with_context(|| format!("Could not list labels of {}", self.repo_name))
    }

    async fn add_labels(&self, pr: PullRequestNumber, labels: &[LabelId]) -> anyhow::Result<()> {
        #[derive(serde::Serialize)]
        struct IssueLabelsOption {
            labels: Vec<u64>,
        }

        if labels.is_empty() {
            return Ok(());
        }
        let url = self
            .client
            .url(&self.repo_path(&format!("issues/{pr}/labels")))?;
        self.client
            .client
            .post(url)
            .json(&IssueLabelsOption {
                labels: labels.iter().map(|label| label.0).collect(),
            })
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("Cannot add label(s) to PR {}", self.format_pr(pr)))?;
        Ok(())
    }

    async fn remove_label(&self, pr: PullRequestNumber, label: LabelId) -> anyhow::Result<()> {
        let url = self
            .client
            .url(&self.repo_path(&format!("issues/{pr}/labels/{label}")))?;
        self.client
            .client
            .delete(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|| {
                format!("Cannot remove label {label} from PR {}", self.format_pr(pr))
            })?;
        Ok(())
    }
}
