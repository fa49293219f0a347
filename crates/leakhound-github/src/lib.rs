//! Platform API client for leakhound.
//!
//! This crate provides the outbound half of the service: a
//! [`PlatformClient`] capability with the enumerated REST operations the
//! pipeline needs, a [`Signer`] capability for the app's RS256 JWT, and a
//! [`ClientFactory`] that exchanges the app JWT for a short-lived
//! installation token and returns a client wired with it.
//!
//! Tokens are minted per event; nothing is cached across events.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use leakhound_types::RepoRef;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Default API endpoint.
pub const GITHUB_API: &str = "https://api.github.com";

/// Deadline for each outbound platform call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent for outbound requests.
pub const USER_AGENT: &str = concat!("leakhound/", env!("CARGO_PKG_VERSION"));

/// Media type the platform expects on API requests.
pub const ACCEPT_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Lifetime of the app JWT used for the installation-token exchange.
pub const APP_TOKEN_TTL_SECS: i64 = 5 * 60;

/// Errors from outbound platform operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or timed out.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Request URL.
        url: String,
        /// The underlying HTTP failure.
        source: reqwest::Error,
    },

    /// The platform answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// Request URL.
        url: String,
        /// The response status.
        status: StatusCode,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// Request URL.
        url: String,
        /// The underlying decode failure.
        source: reqwest::Error,
    },

    /// Signing the app JWT failed.
    #[error(transparent)]
    Sign(#[from] SignError),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The minted installation token is not a valid header value.
    #[error("installation token contains invalid header characters")]
    InvalidToken,
}

/// Failure to load a signing key or sign a token.
#[derive(Debug, Error)]
#[error("app token signing failed: {0}")]
pub struct SignError(#[from] jsonwebtoken::errors::Error);

/// Claims of the app JWT presented at the installation-token exchange.
#[derive(Debug, Clone, Serialize)]
pub struct AppClaims {
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// The app identifier.
    pub iss: u64,
}

/// Capability for signing the app JWT. The pipeline never touches key
/// material directly.
pub trait Signer: Send + Sync {
    /// Sign the claims and return the encoded token.
    fn sign(&self, claims: &AppClaims) -> Result<String, SignError>;
}

/// RS256 signer backed by an RSA private key.
///
/// Both PKCS#1 (`RSA PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`) PEM blocks
/// are accepted; the decoder dispatches on the block header.
pub struct RsaSigner {
    key: EncodingKey,
}

impl RsaSigner {
    /// Load a signer from PEM bytes. Fails on anything that is not a
    /// parseable RSA private key.
    pub fn from_pem(pem: &[u8]) -> Result<Self, SignError> {
        let key = EncodingKey::from_rsa_pem(pem)?;
        Ok(Self { key })
    }
}

impl Signer for RsaSigner {
    fn sign(&self, claims: &AppClaims) -> Result<String, SignError> {
        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &self.key)?;
        Ok(token)
    }
}

/// Request body for opening a tracking issue.
#[derive(Debug, Clone, Serialize)]
pub struct NewIssue {
    /// Issue title.
    pub title: String,
    /// Issue body.
    pub body: String,
    /// Login to assign the issue to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

/// The issue the platform created.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    /// Assigned issue number.
    pub number: u64,
}

/// One commit from a pull request's commit list.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    /// Commit identifier.
    pub sha: String,
}

/// One file entry of a commit's changed-file list.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitFile {
    /// Path within the repository.
    pub filename: String,
    /// Platform-reported status string, e.g. `added`.
    pub status: String,
}

/// A commit with its changed-file list.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    /// Commit identifier.
    pub sha: String,
    /// Changed files in platform order.
    #[serde(default)]
    pub files: Vec<CommitFile>,
}

/// File contents fetched at a specific ref.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentsResponse {
    /// Base64-encoded content, possibly with embedded newlines.
    pub content: String,
    /// Web URL of the file at the requested ref.
    pub html_url: String,
}

/// A check run the platform created.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRun {
    /// Check run identifier.
    pub id: u64,
}

/// Lifecycle status of a check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// The run has started and is scanning.
    InProgress,
    /// The run has finished with a conclusion.
    Completed,
}

/// Completion conclusion of a check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckConclusion {
    /// No unresolved findings.
    Success,
    /// Unresolved findings, or the scan itself failed.
    Failure,
    /// The suite had no pull requests to check.
    Skipped,
}

/// Rendered output attached when completing a check run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRunOutput {
    /// Output title.
    pub title: String,
    /// One-line summary.
    pub summary: String,
    /// Optional detailed text, markdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// The enumerated platform operations the pipeline uses.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Open an issue.
    async fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> Result<CreatedIssue, ApiError>;

    /// Replace an issue body.
    async fn edit_issue_body(&self, repo: &RepoRef, number: u64, body: &str) -> Result<(), ApiError>;

    /// Replace an issue comment body.
    async fn edit_issue_comment(
        &self,
        repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> Result<(), ApiError>;

    /// Replace a pull request description.
    async fn edit_pull_request_body(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), ApiError>;

    /// Replace a pull request review body.
    async fn update_review_body(
        &self,
        repo: &RepoRef,
        number: u64,
        review_id: u64,
        body: &str,
    ) -> Result<(), ApiError>;

    /// Replace a pull request review comment body.
    async fn edit_review_comment(
        &self,
        repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> Result<(), ApiError>;

    /// Comment on an issue or pull request.
    async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), ApiError>;

    /// List a pull request's commits, oldest first.
    async fn list_pull_request_commits(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<CommitRef>, ApiError>;

    /// Fetch a commit with its changed-file list.
    async fn get_commit(&self, repo: &RepoRef, sha: &str) -> Result<CommitDetail, ApiError>;

    /// Fetch file contents at a ref.
    async fn get_contents(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<ContentsResponse, ApiError>;

    /// Create a check run in the `in_progress` state.
    async fn create_check_run(
        &self,
        repo: &RepoRef,
        name: &str,
        head_sha: &str,
    ) -> Result<CheckRun, ApiError>;

    /// Complete a check run with a conclusion and output.
    async fn update_check_run(
        &self,
        repo: &RepoRef,
        check_run_id: u64,
        status: CheckStatus,
        conclusion: Option<CheckConclusion>,
        output: &CheckRunOutput,
    ) -> Result<(), ApiError>;
}

/// REST implementation of [`PlatformClient`], one instance per event,
/// carrying that event's installation token.
#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: String,
    http: reqwest::Client,
}

impl RestClient {
    /// Build a client that attaches `Authorization: Bearer <token>` to
    /// every request.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_MEDIA_TYPE));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// The API base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_expect_success(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.send_expect_success(self.http.get(url), url).await?;
        response.json().await.map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PlatformClient for RestClient {
    async fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> Result<CreatedIssue, ApiError> {
        let url = self.url(&format!("/repos/{}/{}/issues", repo.owner, repo.name));
        let response = self
            .send_expect_success(self.http.post(&url).json(issue), &url)
            .await?;
        response.json().await.map_err(|source| ApiError::Decode {
            url: url.clone(),
            source,
        })
    }

    async fn edit_issue_body(&self, repo: &RepoRef, number: u64, body: &str) -> Result<(), ApiError> {
        let url = self.url(&format!(
            "/repos/{}/{}/issues/{number}",
            repo.owner, repo.name
        ));
        self.send_expect_success(self.http.patch(&url).json(&json!({ "body": body })), &url)
            .await?;
        Ok(())
    }

    async fn edit_issue_comment(
        &self,
        repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!(
            "/repos/{}/{}/issues/comments/{comment_id}",
            repo.owner, repo.name
        ));
        self.send_expect_success(self.http.patch(&url).json(&json!({ "body": body })), &url)
            .await?;
        Ok(())
    }

    async fn edit_pull_request_body(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!(
            "/repos/{}/{}/pulls/{number}",
            repo.owner, repo.name
        ));
        self.send_expect_success(self.http.patch(&url).json(&json!({ "body": body })), &url)
            .await?;
        Ok(())
    }

    async fn update_review_body(
        &self,
        repo: &RepoRef,
        number: u64,
        review_id: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!(
            "/repos/{}/{}/pulls/{number}/reviews/{review_id}",
            repo.owner, repo.name
        ));
        self.send_expect_success(self.http.put(&url).json(&json!({ "body": body })), &url)
            .await?;
        Ok(())
    }

    async fn edit_review_comment(
        &self,
        repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!(
            "/repos/{}/{}/pulls/comments/{comment_id}",
            repo.owner, repo.name
        ));
        self.send_expect_success(self.http.patch(&url).json(&json!({ "body": body })), &url)
            .await?;
        Ok(())
    }

    async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!(
            "/repos/{}/{}/issues/{number}/comments",
            repo.owner, repo.name
        ));
        self.send_expect_success(self.http.post(&url).json(&json!({ "body": body })), &url)
            .await?;
        Ok(())
    }

    async fn list_pull_request_commits(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<CommitRef>, ApiError> {
        let url = self.url(&format!(
            "/repos/{}/{}/pulls/{number}/commits",
            repo.owner, repo.name
        ));
        self.get_json(&url).await
    }

    async fn get_commit(&self, repo: &RepoRef, sha: &str) -> Result<CommitDetail, ApiError> {
        let url = self.url(&format!("/repos/{}/{}/commits/{sha}", repo.owner, repo.name));
        self.get_json(&url).await
    }

    async fn get_contents(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<ContentsResponse, ApiError> {
        let url = self.url(&format!(
            "/repos/{}/{}/contents/{path}?ref={reference}",
            repo.owner, repo.name
        ));
        self.get_json(&url).await
    }

    async fn create_check_run(
        &self,
        repo: &RepoRef,
        name: &str,
        head_sha: &str,
    ) -> Result<CheckRun, ApiError> {
        let url = self.url(&format!("/repos/{}/{}/check-runs", repo.owner, repo.name));
        let body = json!({
            "name": name,
            "head_sha": head_sha,
            "status": CheckStatus::InProgress,
        });
        let response = self
            .send_expect_success(self.http.post(&url).json(&body), &url)
            .await?;
        response.json().await.map_err(|source| ApiError::Decode {
            url: url.clone(),
            source,
        })
    }

    async fn update_check_run(
        &self,
        repo: &RepoRef,
        check_run_id: u64,
        status: CheckStatus,
        conclusion: Option<CheckConclusion>,
        output: &CheckRunOutput,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!(
            "/repos/{}/{}/check-runs/{check_run_id}",
            repo.owner, repo.name
        ));
        let body = match conclusion {
            Some(conclusion) => json!({
                "status": status,
                "conclusion": conclusion,
                "output": output,
            }),
            None => json!({
                "status": status,
                "output": output,
            }),
        };
        self.send_expect_success(self.http.patch(&url).json(&body), &url)
            .await?;
        Ok(())
    }
}

/// Response of the installation-token exchange.
#[derive(Debug, Deserialize)]
struct InstallationToken {
    token: String,
}

/// Mints per-installation clients: signs the app JWT, exchanges it for an
/// installation token, and wires a [`RestClient`] with the result.
#[derive(Clone)]
pub struct ClientFactory {
    base_url: String,
    app_id: u64,
    signer: Arc<dyn Signer>,
    http: reqwest::Client,
}

impl ClientFactory {
    /// Create a factory for the given app identity.
    pub fn new(app_id: u64, signer: Arc<dyn Signer>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            base_url: GITHUB_API.to_string(),
            app_id,
            signer,
            http,
        })
    }

    /// Point the factory (and the clients it mints) at a different API
    /// base URL.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Mint a client for one installation. Called once per event.
    pub async fn client_for(&self, installation_id: u64) -> Result<RestClient, ApiError> {
        let now = Utc::now().timestamp();
        let claims = AppClaims {
            iat: now,
            exp: now + APP_TOKEN_TTL_SECS,
            iss: self.app_id,
        };
        let jwt = self.signer.sign(&claims)?;

        let url = format!(
            "{}/app/installations/{installation_id}/access_tokens",
            self.base_url
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&jwt)
            .header(ACCEPT, ACCEPT_MEDIA_TYPE)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }

        let token: InstallationToken =
            response.json().await.map_err(|source| ApiError::Decode {
                url: url.clone(),
                source,
            })?;

        RestClient::new(&self.base_url, &token.token)
    }
}
