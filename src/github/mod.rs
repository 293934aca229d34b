//! GitHub REST and GraphQL access.
//!
//! - [`links`] - URL parsing, extraction and issue/PR lookups for enrichment
//! - [`prs`] - the user's open pull requests with review/CI/merge-queue state
//! - [`notifications`] - participating notifications filtered to open subjects
//!
//! All calls go through [`GitHubClient`], which carries the token and the API
//! base URL (overridable for GitHub Enterprise or a local stand-in).

pub mod links;
pub mod notifications;
pub mod prs;

pub use links::{LinkInfo, LinkKind, ParsedUrl, extract_github_urls, parse_github_url};
pub use notifications::GitHubNotification;
pub use prs::{CiStatus, MergeQueueState, MyPullRequest};

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::resolver::{process_env, resolve_github_token};

/// User-Agent header required by the GitHub API
const USER_AGENT: &str = concat!("logpilot/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from talking to GitHub.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// Token is invalid or expired (401 Unauthorized)
    #[error("Invalid or expired token: GitHub returned 401 Unauthorized")]
    Unauthorized,

    /// Token lacks required permissions (403 Forbidden)
    #[error("Token lacks required permissions: GitHub returned 403 Forbidden")]
    Forbidden,

    /// Network or other HTTP error
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response
    #[error("Failed to parse GitHub response: {0}")]
    Parse(String),

    /// No usable token could be found
    #[error("{0}")]
    Token(String),
}

/// Authenticated user (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// HTTP client bound to one token and API base URL.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
}

impl GitHubClient {
    /// Create a client for `api_base` (e.g. `https://api.github.com`).
    pub fn new(api_base: &str, token: &str) -> Result<Self, GitHubError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(GitHubError::Token("GitHub token is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| GitHubError::Token("GitHub token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GitHubError::Http(e.to_string()))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}{}", self.api_base, path_or_url)
        }
    }

    /// GET a REST resource. `path_or_url` is either an API path such as
    /// `/user` or an absolute URL returned by a previous response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path_or_url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GitHubError> {
        let request = self.http.get(self.url(path_or_url)).query(query);
        Self::send(request).await
    }

    /// Run a GraphQL query and return its `data` object.
    pub async fn graphql<T: DeserializeOwned>(&self, query: &str) -> Result<T, GitHubError> {
        let request = self
            .http
            .post(format!("{}/graphql", self.api_base))
            .json(&serde_json::json!({ "query": query }));
        let response: GraphQlResponse<T> = Self::send(request).await?;

        if !response.errors.is_empty() {
            let messages: Vec<_> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(GitHubError::Http(format!("GraphQL: {}", messages.join("; "))));
        }
        response
            .data
            .ok_or_else(|| GitHubError::Parse("GraphQL response has no data".to_string()))
    }

    async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, GitHubError> {
        let response = request
            .send()
            .await
            .map_err(|e| GitHubError::Http(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(GitHubError::Unauthorized),
            StatusCode::FORBIDDEN => Err(GitHubError::Forbidden),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(GitHubError::Http(format!("HTTP {}: {}", status.as_u16(), body)))
            }
            _ => response
                .json::<T>()
                .await
                .map_err(|e| GitHubError::Parse(e.to_string())),
        }
    }

    /// The user the token belongs to.
    pub async fn authenticated_user(&self) -> Result<GitHubUser, GitHubError> {
        self.get_json("/user", &[]).await
    }
}

/// Lazily constructed, process-wide GitHub client.
///
/// The token is resolved on first use and the client is cached from then on.
/// A failed resolution is not cached, so a later `gh auth login` is picked up.
#[derive(Debug)]
pub struct GitHubProvider {
    api_base: String,
    client: OnceCell<GitHubClient>,
}

impl GitHubProvider {
    pub fn new(api_base: &str) -> Self {
        Self {
            api_base: api_base.to_string(),
            client: OnceCell::new(),
        }
    }

    /// Provider that always hands out `client`.
    pub fn with_client(client: GitHubClient) -> Self {
        Self {
            api_base: client.api_base.clone(),
            client: OnceCell::new_with(Some(client)),
        }
    }

    pub async fn client(&self) -> Result<&GitHubClient, GitHubError> {
        self.client
            .get_or_try_init(|| async {
                let token = tokio::task::spawn_blocking(|| resolve_github_token(&process_env))
                    .await
                    .map_err(|e| GitHubError::Token(e.to_string()))??;
                tracing::debug!("using GitHub token from {}", token.source);
                GitHubClient::new(&self.api_base, &token.value)
            })
            .await
    }
}
