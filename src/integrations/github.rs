//! GitHub integration for Jarvis
//!
//! Repository actions through the GitHub REST v3 API with a personal access token.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cloud::ApiError;

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = "jarvis-backend";

/// Owner/name pair of a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Owner and repo from the first two path segments of a github.com URL
    pub fn from_page_url(page_url: &str) -> Option<Self> {
        let url = url::Url::parse(page_url).ok()?;
        if !is_github_host(url.host_str()?) {
            return None;
        }

        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
        let owner = segments.next()?;
        let repo = segments.next()?;
        Some(Self::new(owner, repo.trim_end_matches(".git")))
    }

    pub fn web_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

pub fn is_github_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("github.com") || host.eq_ignore_ascii_case("www.github.com")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub html_url: String,
}

/// Issue tracker operations used by voice commands
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(
        &self,
        token: &str,
        repo: &RepoRef,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<Issue, ApiError>;

    async fn list_issues(&self, token: &str, repo: &RepoRef, state: &str) -> Result<Vec<Issue>, ApiError>;

    async fn comment(
        &self,
        token: &str,
        repo: &RepoRef,
        issue_number: u64,
        body: &str,
    ) -> Result<IssueComment, ApiError>;

    async fn star(&self, token: &str, repo: &RepoRef) -> Result<(), ApiError>;

    async fn fork(&self, token: &str, repo: &RepoRef) -> Result<Repository, ApiError>;
}

pub struct GitHubClient {
    client: Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new() -> Self {
        Self::with_base_url(GITHUB_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Send one authenticated request and return the raw response body
    async fn request(
        &self,
        token: &str,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<String, ApiError> {
        if token.trim().is_empty() {
            return Err(ApiError::NotConfigured("GitHub"));
        }

        let url = format!("{}{}", self.base_url, endpoint);
        log::info!("GitHub {} {}", method, endpoint);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(token)
            .header("Accept", GITHUB_ACCEPT)
            .header("User-Agent", USER_AGENT);

        request = match body {
            Some(body) if method != Method::GET => request.json(&body),
            // GitHub rejects bodiless PUTs without an explicit length
            _ if method == Method::PUT => request.header("Content-Length", "0"),
            _ => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            log::warn!("GitHub API error {}: {}", status, endpoint);
            return Err(ApiError::from_response(status, &text));
        }

        Ok(text)
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        token: &str,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let text = self.request(token, method, endpoint, body).await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::MalformedResponse(format!("Failed to parse GitHub response: {}", e)))
    }
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn issues_endpoint(repo: &RepoRef) -> String {
    format!("/repos/{}/{}/issues", repo.owner, repo.repo)
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn create_issue(
        &self,
        token: &str,
        repo: &RepoRef,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<Issue, ApiError> {
        let payload = json!({ "title": title, "body": body, "labels": labels });
        self.request_json(token, Method::POST, &issues_endpoint(repo), Some(payload))
            .await
    }

    async fn list_issues(&self, token: &str, repo: &RepoRef, state: &str) -> Result<Vec<Issue>, ApiError> {
        let endpoint = format!("{}?state={}", issues_endpoint(repo), state);
        self.request_json(token, Method::GET, &endpoint, None).await
    }

    async fn comment(
        &self,
        token: &str,
        repo: &RepoRef,
        issue_number: u64,
        body: &str,
    ) -> Result<IssueComment, ApiError> {
        let endpoint = format!("{}/{}/comments", issues_endpoint(repo), issue_number);
        self.request_json(token, Method::POST, &endpoint, Some(json!({ "body": body })))
            .await
    }

    async fn star(&self, token: &str, repo: &RepoRef) -> Result<(), ApiError> {
        let endpoint = format!("/user/starred/{}/{}", repo.owner, repo.repo);
        // 204 No Content on success
        self.request(token, Method::PUT, &endpoint, None).await.map(|_| ())
    }

    async fn fork(&self, token: &str, repo: &RepoRef) -> Result<Repository, ApiError> {
        let endpoint = format!("/repos/{}/{}/forks", repo.owner, repo.repo);
        self.request_json(token, Method::POST, &endpoint, None).await
    }
}
