use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::github::{GitHubError, Page, PullRequest, PullRequestApi};

pub const DEFAULT_RETRIES: u32 = 5;
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(750);

const FIRST_PAGE: u32 = 1;

/// Fixed-delay retry settings shared by every list request.
///
/// `delay` is slept after every attempt, successful or not, to stay under the
/// API's rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 means a single attempt
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES, DEFAULT_REQUEST_DELAY)
    }
}

/// Call `call` until it succeeds, at most `policy.retries + 1` times.
///
/// Sleeps `policy.delay` after every attempt. Returns the last error once the
/// retries are exhausted.
pub async fn retry_list_up_to<T, E, F, Fut>(policy: &RetryPolicy, mut call: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        let outcome = call().await;
        tokio::time::sleep(policy.delay).await;
        match outcome {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.retries => {
                attempt += 1;
                warn!(attempt, retries = policy.retries, error = %err, "list request failed, retrying");
            }
            Err(err) => return Err(err),
        }
    }
}

/// Fetch pages starting at page 1 until the listing runs out or `stop` returns
/// true for the items of the page just fetched. Items of that last page are
/// still included.
pub async fn collect_pages<T, E, F, Fut, S>(
    policy: &RetryPolicy,
    mut fetch_page: F,
    mut stop: S,
) -> Result<Vec<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    S: FnMut(&[T]) -> bool,
    E: Display,
{
    let mut items = Vec::new();
    let mut page = FIRST_PAGE;
    loop {
        let fetched = retry_list_up_to(policy, || fetch_page(page)).await?;
        let done = stop(&fetched.items);
        items.extend(fetched.items);
        match fetched.next_page {
            Some(next) if !done && next > page => page = next,
            _ => return Ok(items),
        }
    }
}

/// Fetch every page of a listing.
pub async fn fetch_all<T, E, F, Fut>(policy: &RetryPolicy, fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    E: Display,
{
    collect_pages(policy, fetch_page, |_| false).await
}

/// List a repository's pull requests, newest update first, stopping after the
/// first page whose last entry was updated before `since`. Later pages are
/// older still and cannot fall inside the window.
#[instrument(skip(api, policy))]
pub async fn list_pull_requests(
    api: &dyn PullRequestApi,
    policy: &RetryPolicy,
    owner: &str,
    repo: &str,
    since: DateTime<Utc>,
) -> Result<Vec<PullRequest>, GitHubError> {
    let prs = collect_pages(
        policy,
        |page| api.list_pull_requests(owner, repo, page),
        |page| page.last().is_some_and(|pr| pr.updated_at < since),
    )
    .await?;
    debug!(count = prs.len(), "listed pull requests");
    Ok(prs)
}
