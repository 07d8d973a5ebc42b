//! In-memory `PullRequestApi` for pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{ChangedFile, IssueComment, Page, PullRequest, Review};
use super::{GitHubError, PullRequestApi};

pub const PULLS: &str = "pulls";
pub const REVIEWS: &str = "reviews";
pub const COMMENTS: &str = "comments";
pub const FILES: &str = "files";

/// Serves canned pages and counts calls per endpoint.
///
/// Pages are 1-based; a missing key yields a single empty page.
#[derive(Default)]
pub struct FakeApi {
    pulls: HashMap<String, Vec<Vec<PullRequest>>>,
    reviews: HashMap<String, Vec<Vec<Review>>>,
    comments: HashMap<String, Vec<Vec<IssueComment>>>,
    files: HashMap<String, Vec<Vec<ChangedFile>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, usize>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pulls(mut self, owner: &str, repo: &str, pages: Vec<Vec<PullRequest>>) -> Self {
        self.pulls.insert(format!("{owner}/{repo}"), pages);
        self
    }

    pub fn with_reviews(mut self, pr: &PullRequest, pages: Vec<Vec<Review>>) -> Self {
        self.reviews.insert(pr.html_url.clone(), pages);
        self
    }

    pub fn with_comments(mut self, pr: &PullRequest, pages: Vec<Vec<IssueComment>>) -> Self {
        self.comments.insert(pr.html_url.clone(), pages);
        self
    }

    pub fn with_files(mut self, pr: &PullRequest, pages: Vec<Vec<ChangedFile>>) -> Self {
        self.files.insert(pr.html_url.clone(), pages);
        self
    }

    /// Make the next `times` calls to `endpoint` fail with a 502.
    pub fn failing(self, endpoint: &'static str, times: usize) -> Self {
        self.failures.lock().unwrap().insert(endpoint, times);
        self
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    fn serve<T: Clone>(
        &self,
        endpoint: &'static str,
        pages: Option<&Vec<Vec<T>>>,
        page: u32,
    ) -> Result<Page<T>, GitHubError> {
        *self.calls.lock().unwrap().entry(endpoint).or_default() += 1;

        let mut failures = self.failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(endpoint).filter(|n| **n > 0) {
            *remaining -= 1;
            return Err(GitHubError::Status {
                status: 502,
                url: format!("fake://{endpoint}?page={page}"),
                body: "bad gateway".to_string(),
            });
        }

        let Some(pages) = pages else {
            return Ok(Page::new(Vec::new(), None));
        };
        let index = page.saturating_sub(1) as usize;
        let items = pages.get(index).cloned().unwrap_or_default();
        let next_page = (index + 1 < pages.len()).then_some(page + 1);
        Ok(Page::new(items, next_page))
    }
}

#[async_trait]
impl PullRequestApi for FakeApi {
    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Page<PullRequest>, GitHubError> {
        self.serve(PULLS, self.pulls.get(&format!("{owner}/{repo}")), page)
    }

    async fn list_reviews(&self, pr: &PullRequest, page: u32) -> Result<Page<Review>, GitHubError> {
        self.serve(REVIEWS, self.reviews.get(&pr.html_url), page)
    }

    async fn list_issue_comments(
        &self,
        pr: &PullRequest,
        page: u32,
    ) -> Result<Page<IssueComment>, GitHubError> {
        self.serve(COMMENTS, self.comments.get(&pr.html_url), page)
    }

    async fn list_files(
        &self,
        pr: &PullRequest,
        page: u32,
    ) -> Result<Page<ChangedFile>, GitHubError> {
        self.serve(FILES, self.files.get(&pr.html_url), page)
    }
}

pub fn ts(value: &str) -> DateTime<Utc> {
    value.parse().unwrap()
}

/// A PR in knative/serving created and updated at the given RFC 3339 instants.
pub fn pull_request(number: u64, author: &str, created_at: &str, updated_at: &str) -> PullRequest {
    PullRequest {
        number,
        author: Some(author.to_string()),
        created_at: ts(created_at),
        updated_at: ts(updated_at),
        owner: "knative".to_string(),
        repo: "serving".to_string(),
        html_url: format!("https://github.com/knative/serving/pull/{number}"),
    }
}

pub fn review(login: &str) -> Review {
    Review {
        author: Some(login.to_string()),
    }
}

pub fn comment(login: &str) -> IssueComment {
    IssueComment {
        author: Some(login.to_string()),
    }
}

pub fn file(filename: &str, additions: i64) -> ChangedFile {
    ChangedFile {
        filename: filename.to_string(),
        additions,
    }
}
