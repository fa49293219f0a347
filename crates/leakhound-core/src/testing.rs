//! In-memory platform stub shared by the pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use leakhound_github::{
    ApiError, CheckConclusion, CheckRun, CheckRunOutput, CheckStatus, CommitDetail, CommitFile,
    CommitRef, ContentsResponse, CreatedIssue, NewIssue, PlatformClient,
};
use leakhound_types::RepoRef;
use reqwest::StatusCode;

/// A recorded `update_check_run` call.
#[derive(Debug, Clone)]
pub struct CheckUpdate {
    pub check_run_id: u64,
    pub status: CheckStatus,
    pub conclusion: Option<CheckConclusion>,
    pub summary: String,
    pub text: Option<String>,
}

#[derive(Default)]
struct Inner {
    contents: HashMap<(String, String), ContentsResponse>,
    commits: HashMap<String, Vec<CommitFile>>,
    pr_commits: HashMap<u64, Vec<String>>,
    failing_commits: Vec<String>,
    contents_calls: usize,
    created_issues: Vec<NewIssue>,
    issue_comments: Vec<(u64, String)>,
    edits: Vec<(String, String)>,
    check_creates: Vec<(String, String)>,
    check_updates: Vec<CheckUpdate>,
}

/// Scriptable [`PlatformClient`] that records every write operation.
#[derive(Default)]
pub struct MockPlatform {
    inner: Mutex<Inner>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stub_contents(&self, sha: &str, path: &str, text: &str) {
        let encoded = BASE64.encode(text.as_bytes());
        self.stub_raw_contents(sha, path, &encoded);
    }

    pub fn stub_raw_contents(&self, sha: &str, path: &str, base64_field: &str) {
        let mut inner = self.inner.lock().expect("mock lock");
        inner.contents.insert(
            (sha.to_string(), path.to_string()),
            ContentsResponse {
                content: base64_field.to_string(),
                html_url: format!("https://github.com/o/r/blob/{sha}/{path}"),
            },
        );
    }

    pub fn stub_commit(&self, sha: &str, files: &[(&str, &str)]) {
        let mut inner = self.inner.lock().expect("mock lock");
        inner.commits.insert(
            sha.to_string(),
            files
                .iter()
                .map(|(path, status)| CommitFile {
                    filename: path.to_string(),
                    status: status.to_string(),
                })
                .collect(),
        );
    }

    pub fn stub_pr_commits(&self, number: u64, shas: &[&str]) {
        let mut inner = self.inner.lock().expect("mock lock");
        inner
            .pr_commits
            .insert(number, shas.iter().map(|s| s.to_string()).collect());
    }

    pub fn fail_get_commit(&self, sha: &str) {
        let mut inner = self.inner.lock().expect("mock lock");
        inner.failing_commits.push(sha.to_string());
    }

    pub fn contents_calls(&self) -> usize {
        self.inner.lock().expect("mock lock").contents_calls
    }

    pub fn created_issues(&self) -> Vec<NewIssue> {
        self.inner.lock().expect("mock lock").created_issues.clone()
    }

    pub fn issue_comments(&self) -> Vec<(u64, String)> {
        self.inner.lock().expect("mock lock").issue_comments.clone()
    }

    pub fn edits(&self) -> Vec<(String, String)> {
        self.inner.lock().expect("mock lock").edits.clone()
    }

    pub fn check_creates(&self) -> Vec<(String, String)> {
        self.inner.lock().expect("mock lock").check_creates.clone()
    }

    pub fn check_updates(&self) -> Vec<CheckUpdate> {
        self.inner.lock().expect("mock lock").check_updates.clone()
    }
}

fn not_found(url: &str) -> ApiError {
    ApiError::Status {
        url: url.to_string(),
        status: StatusCode::NOT_FOUND,
    }
}

#[async_trait]
impl PlatformClient for MockPlatform {
    async fn create_issue(
        &self,
        _repo: &RepoRef,
        issue: &NewIssue,
    ) -> Result<CreatedIssue, ApiError> {
        let mut inner = self.inner.lock().expect("mock lock");
        inner.created_issues.push(issue.clone());
        Ok(CreatedIssue { number: 101 })
    }

    async fn edit_issue_body(
        &self,
        _repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().expect("mock lock");
        inner
            .edits
            .push((format!("issue#{number}"), body.to_string()));
        Ok(())
    }

    async fn edit_issue_comment(
        &self,
        _repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().expect("mock lock");
        inner
            .edits
            .push((format!("issue-comment#{comment_id}"), body.to_string()));
        Ok(())
    }

    async fn edit_pull_request_body(
        &self,
        _repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().expect("mock lock");
        inner.edits.push((format!("pull#{number}"), body.to_string()));
        Ok(())
    }

    async fn update_review_body(
        &self,
        _repo: &RepoRef,
        number: u64,
        review_id: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().expect("mock lock");
        inner
            .edits
            .push((format!("pull#{number}/review#{review_id}"), body.to_string()));
        Ok(())
    }

    async fn edit_review_comment(
        &self,
        _repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().expect("mock lock");
        inner
            .edits
            .push((format!("review-comment#{comment_id}"), body.to_string()));
        Ok(())
    }

    async fn create_issue_comment(
        &self,
        _repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().expect("mock lock");
        inner.issue_comments.push((number, body.to_string()));
        Ok(())
    }

    async fn list_pull_request_commits(
        &self,
        _repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<CommitRef>, ApiError> {
        let inner = self.inner.lock().expect("mock lock");
        inner
            .pr_commits
            .get(&number)
            .map(|shas| shas.iter().map(|sha| CommitRef { sha: sha.clone() }).collect())
            .ok_or_else(|| not_found(&format!("pulls/{number}/commits")))
    }

    async fn get_commit(&self, _repo: &RepoRef, sha: &str) -> Result<CommitDetail, ApiError> {
        let inner = self.inner.lock().expect("mock lock");
        if inner.failing_commits.iter().any(|s| s == sha) {
            return Err(ApiError::Status {
                url: format!("commits/{sha}"),
                status: StatusCode::BAD_GATEWAY,
            });
        }
        inner
            .commits
            .get(sha)
            .map(|files| CommitDetail {
                sha: sha.to_string(),
                files: files.clone(),
            })
            .ok_or_else(|| not_found(&format!("commits/{sha}")))
    }

    async fn get_contents(
        &self,
        _repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<ContentsResponse, ApiError> {
        let mut inner = self.inner.lock().expect("mock lock");
        inner.contents_calls += 1;
        inner
            .contents
            .get(&(reference.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| not_found(&format!("contents/{path}?ref={reference}")))
    }

    async fn create_check_run(
        &self,
        _repo: &RepoRef,
        name: &str,
        head_sha: &str,
    ) -> Result<CheckRun, ApiError> {
        let mut inner = self.inner.lock().expect("mock lock");
        inner
            .check_creates
            .push((name.to_string(), head_sha.to_string()));
        Ok(CheckRun { id: 99 })
    }

    async fn update_check_run(
        &self,
        _repo: &RepoRef,
        check_run_id: u64,
        status: CheckStatus,
        conclusion: Option<CheckConclusion>,
        output: &CheckRunOutput,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().expect("mock lock");
        inner.check_updates.push(CheckUpdate {
            check_run_id,
            status,
            conclusion,
            summary: output.summary.clone(),
            text: output.text.clone(),
        });
        Ok(())
    }
}
