use std::time::Duration;

use prcov_core::{PrcovError, StashConfig};
use prcov_difflens::model::DiffDocument;

/// Bitbucket Server REST client for pull-request diffs.
///
/// # Examples
///
/// ```
/// use prcov_core::StashConfig;
/// use prcov_stash::StashClient;
///
/// let client = StashClient::new(
///     "https://stash.example.com/rest/api/1.0",
///     "ci-bot",
///     "secret",
///     &StashConfig::default(),
/// )
/// .unwrap();
/// assert_eq!(
///     client.diff_url("SHOP", "web", 42),
///     "https://stash.example.com/rest/api/1.0/projects/SHOP/repos/web/pull-requests/42/diff?contextLines=0&whitespace=ignore-all&withComments=false"
/// );
/// ```
pub struct StashClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    config: StashConfig,
}

impl StashClient {
    /// Create a client for the REST API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PrcovError::Config`] if `base_url` is empty, or
    /// [`PrcovError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        config: &StashConfig,
    ) -> Result<Self, PrcovError> {
        let base_url = base_url.trim_end_matches('/');
        if base_url.is_empty() {
            return Err(PrcovError::Config("Stash API URL must not be empty".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("prcov/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PrcovError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            config: config.clone(),
        })
    }

    /// URL of the diff endpoint for a pull request.
    pub fn diff_url(&self, project: &str, repo: &str, pr_id: u64) -> String {
        format!(
            "{}/projects/{project}/repos/{repo}/pull-requests/{pr_id}/diff?contextLines={}&whitespace={}&withComments={}",
            self.base_url,
            self.config.context_lines,
            self.config.whitespace,
            self.config.with_comments,
        )
    }

    /// Fetch the structural diff of a pull request.
    ///
    /// Makes a single attempt; there is no retry.
    ///
    /// # Errors
    ///
    /// Returns [`PrcovError::Transport`] if the server is unreachable, the
    /// request times out, or the status is not 2xx, and
    /// [`PrcovError::Serialization`] if the body is not a diff document.
    pub async fn fetch_diff(
        &self,
        project: &str,
        repo: &str,
        pr_id: u64,
    ) -> Result<DiffDocument, PrcovError> {
        let url = self.diff_url(project, repo, pr_id);
        tracing::debug!(%url, "fetching pull request diff");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| PrcovError::Transport(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PrcovError::Transport(format!(
                "Stash API error {status}: {}",
                body.trim()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PrcovError::Transport(format!("failed to read diff response: {e}")))?;
        let diff = DiffDocument::from_json(&body)?;
        tracing::debug!(files = diff.diffs.len(), "received pull request diff");
        Ok(diff)
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out fetching pull request diff: {err}")
    } else if err.is_connect() {
        format!("could not connect to Stash: {err}")
    } else {
        format!("failed to fetch pull request diff: {err}")
    }
}
