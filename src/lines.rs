use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::fetch::{fetch_all, RetryPolicy};
use crate::github::{GitHubError, PullRequest, PullRequestApi};
use crate::pool::WorkerPool;
use crate::stats::StatsError;

/// Vendored paths live under a top-level `vendor/` directory or any nested
/// `/vendor/` segment. A bare `vendored.go` is not vendored.
pub fn is_vendored(path: &str) -> bool {
    path.starts_with("vendor/") || path.contains("/vendor/")
}

/// Non-vendor added-line counts keyed by PR URL.
///
/// Each key owns a once-cell: the map lock only covers finding or inserting
/// that cell, and concurrent lookups of the same key share a single fetch.
#[derive(Debug, Default)]
pub struct LineCountCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<i64>>>>,
}

impl LineCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<OnceCell<i64>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key.to_string()).or_default())
    }

    /// The cached count for `key`, if one has been computed.
    pub fn get(&self, key: &str) -> Option<i64> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).and_then(|cell| cell.get().copied())
    }

    /// Return the cached count for `key`, computing it with `init` on a miss.
    /// A failed `init` leaves the key empty so a later call can try again.
    pub async fn get_or_try_insert_with<E, F, Fut>(&self, key: &str, init: F) -> Result<i64, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<i64, E>>,
    {
        let slot = self.slot(key);
        slot.get_or_try_init(init).await.copied()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|cell| cell.initialized()).count()
    }
}

/// Sum of additions across the non-vendored files of `pr`, memoized in `cache`.
#[instrument(skip_all, fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number))]
pub async fn count_non_vendor_lines(
    api: &dyn PullRequestApi,
    policy: &RetryPolicy,
    cache: &LineCountCache,
    pr: &PullRequest,
) -> Result<i64, GitHubError> {
    if let Some(added) = cache.get(&pr.html_url) {
        debug!(added, "line count cache hit");
        return Ok(added);
    }
    cache
        .get_or_try_insert_with(&pr.html_url, || async {
            let files = fetch_all(policy, |page| api.list_files(pr, page)).await?;
            let added: i64 = files
                .iter()
                .filter(|file| !is_vendored(&file.filename))
                .map(|file| file.additions)
                .sum();
            debug!(files = files.len(), added, "counted lines");
            Ok::<_, GitHubError>(added)
        })
        .await
}

/// Total non-vendor lines added across `prs`.
pub async fn count_lines_added(
    pool: &WorkerPool,
    api: &Arc<dyn PullRequestApi>,
    policy: RetryPolicy,
    cache: &Arc<LineCountCache>,
    prs: Vec<PullRequest>,
) -> Result<i64, StatsError> {
    let total_prs = prs.len();
    let api = Arc::clone(api);
    let cache = Arc::clone(cache);

    let counts = pool
        .run(prs, move |pr| {
            let api = Arc::clone(&api);
            let cache = Arc::clone(&cache);
            async move {
                let added = count_non_vendor_lines(api.as_ref(), &policy, &cache, &pr).await?;
                Ok::<_, StatsError>(added)
            }
        })
        .await?;

    let added: i64 = counts.into_iter().sum();
    info!(prs = total_prs, added, "counted lines added");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::testing::{file, pull_request, FakeApi, FILES};
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(1, Duration::ZERO)
    }

    fn pr(number: u64) -> PullRequest {
        pull_request(number, "carol", "2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z")
    }

    #[test]
    fn test_vendor_paths() {
        assert!(is_vendored("vendor/foo.go"));
        assert!(is_vendored("pkg/vendor/bar.go"));
        assert!(is_vendored("third_party/x/vendor/github.com/y/z.go"));
        assert!(!is_vendored("vendored.go"));
        assert!(!is_vendored("pkg/vendored/lib.go"));
        assert!(!is_vendored("cmd/vendor.go"));
    }

    #[tokio::test]
    async fn test_counts_non_vendor_additions_across_pages() {
        let target = pr(1);
        let api = FakeApi::new().with_files(
            &target,
            vec![
                vec![file("pkg/reconciler/route.go", 40), file("vendor/foo.go", 1000)],
                vec![file("pkg/vendor/bar.go", 500), file("vendored.go", 2)],
                vec![file("docs/README.md", 0)],
            ],
        );

        let added = count_non_vendor_lines(&api, &policy(), &LineCountCache::new(), &target)
            .await
            .unwrap();
        assert_eq!(added, 42);
        assert_eq!(api.calls(FILES), 3);
    }

    #[tokio::test]
    async fn test_second_count_is_a_cache_hit() {
        let target = pr(1);
        let api = FakeApi::new().with_files(&target, vec![vec![file("main.go", 7)]]);
        let cache = LineCountCache::new();

        let first = count_non_vendor_lines(&api, &policy(), &cache, &target).await.unwrap();
        let second = count_non_vendor_lines(&api, &policy(), &cache, &target).await.unwrap();

        assert_eq!(first, 7);
        assert_eq!(first, second);
        assert_eq!(api.calls(FILES), 1);
        assert_eq!(cache.get(&target.html_url), Some(7));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_pr_without_files_counts_zero() {
        let target = pr(9);
        let added = count_non_vendor_lines(&FakeApi::new(), &policy(), &LineCountCache::new(), &target)
            .await
            .unwrap();
        assert_eq!(added, 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let target = pr(1);
        let api = FakeApi::new()
            .with_files(&target, vec![vec![file("main.go", 3)]])
            .failing(FILES, 2);
        let cache = LineCountCache::new();

        assert!(count_non_vendor_lines(&api, &policy(), &cache, &target).await.is_err());
        assert_eq!(cache.get(&target.html_url), None);
        assert_eq!(count_non_vendor_lines(&api, &policy(), &cache, &target).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_prs_fetch_once() {
        let target = pr(1);
        let api = Arc::new(FakeApi::new().with_files(&target, vec![vec![file("main.go", 5)]]));
        let shared: Arc<dyn PullRequestApi> = api.clone();
        let cache = Arc::new(LineCountCache::new());

        let total = count_lines_added(
            &WorkerPool::new(4),
            &shared,
            policy(),
            &cache,
            vec![target.clone(), target.clone(), target],
        )
        .await
        .unwrap();

        assert_eq!(total, 15);
        assert_eq!(api.calls(FILES), 1);
    }

    #[tokio::test]
    async fn test_count_lines_added_sums_set() {
        let (one, two) = (pr(1), pr(2));
        let api = FakeApi::new()
            .with_files(&one, vec![vec![file("a.go", 10), file("vendor/b.go", 99)]])
            .with_files(&two, vec![vec![file("c.go", 5)], vec![file("d.go", 1)]]);
        let api: Arc<dyn PullRequestApi> = Arc::new(api);
        let cache = Arc::new(LineCountCache::new());

        let total = count_lines_added(&WorkerPool::new(2), &api, policy(), &cache, vec![one, two])
            .await
            .unwrap();

        assert_eq!(total, 16);
        assert_eq!(cache.len(), 2);
    }
}
