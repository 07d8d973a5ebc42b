use chrono::{DateTime, Utc};

/// A pull request as the review pipeline sees it.
/// Not Deserialize: built from the GitHub wire format in client.rs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number within its repository
    pub number: u64,
    /// Author's GitHub login; None for deleted accounts
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owner of the base repository
    pub owner: String,
    /// Name of the base repository
    pub repo: String,
    /// HTML URL, unique per PR; used as the line-count cache key
    pub html_url: String,
}

impl PullRequest {
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }
}

/// Anything with an acting user: reviews and comments.
pub trait Actor {
    fn actor(&self) -> Option<&str>;
}

/// A submitted review on a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub author: Option<String>,
}

impl Actor for Review {
    fn actor(&self) -> Option<&str> {
        self.author.as_deref()
    }
}

/// A conversation comment on the pull request's issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub author: Option<String>,
}

impl Actor for IssueComment {
    fn actor(&self) -> Option<&str> {
        self.author.as_deref()
    }
}

/// A single file touched by a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    /// Repository-relative path (e.g., "pkg/vendor/lib.go")
    pub filename: String,
    /// Lines added in this file
    pub additions: i64,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Page number to request next; None on the last page
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page: Option<u32>) -> Self {
        Self { items, next_page }
    }
}
