pub mod client;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use client::GitHubClient;
pub use types::{Actor, ChangedFile, IssueComment, Page, PullRequest, Review};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub API returned {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("Invalid GitHub API base URL: {0}")]
    InvalidBaseUrl(String),
}

/// The slice of the GitHub REST API the review pipeline needs.
///
/// Every listing is paginated: callers pass a 1-based page number and get back
/// the items plus the next page number, if any. Implementations must be
/// Send + Sync so the worker pool can share one client across tasks.
#[async_trait]
pub trait PullRequestApi: Send + Sync {
    /// List pull requests in any state, most recently updated first.
    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Page<PullRequest>, GitHubError>;

    /// List submitted reviews on a pull request.
    async fn list_reviews(&self, pr: &PullRequest, page: u32) -> Result<Page<Review>, GitHubError>;

    /// List issue-style (conversation) comments on a pull request.
    async fn list_issue_comments(
        &self,
        pr: &PullRequest,
        page: u32,
    ) -> Result<Page<IssueComment>, GitHubError>;

    /// List the files a pull request changes.
    async fn list_files(&self, pr: &PullRequest, page: u32)
        -> Result<Page<ChangedFile>, GitHubError>;
}
