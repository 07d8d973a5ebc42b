use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinError;
use tracing::{info, instrument, warn};

use crate::config::RunConfig;
use crate::fetch::list_pull_requests;
use crate::filter::{filter_for_time, partition_by_author, TrackedUsers};
use crate::github::{GitHubError, PullRequest, PullRequestApi};
use crate::lines::{count_lines_added, LineCountCache};
use crate::pool::WorkerPool;
use crate::report::{self, LineCounts, PrCounts, Report};
use crate::touch::filter_for_touch;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error(transparent)]
    Api(#[from] GitHubError),

    #[error("Worker task failed: {0}")]
    Worker(#[from] JoinError),
}

/// Runs the list -> filter -> touch -> count pipeline for one configuration.
///
/// The worker pool and line-count cache live as long as this value, so every
/// phase shares one pool size and repeated PRs are counted once.
pub struct ReviewStats {
    api: Arc<dyn PullRequestApi>,
    config: Arc<RunConfig>,
    users: Arc<TrackedUsers>,
    pool: WorkerPool,
    cache: Arc<LineCountCache>,
}

impl ReviewStats {
    pub fn new(api: Arc<dyn PullRequestApi>, config: Arc<RunConfig>) -> Self {
        let users = Arc::new(config.users.clone());
        let pool = WorkerPool::new(config.workers);
        Self {
            api,
            config,
            users,
            pool,
            cache: Arc::new(LineCountCache::new()),
        }
    }

    /// Compute the report. Any unrecovered API failure aborts the run.
    #[instrument(skip(self), fields(owner = %self.config.owner, workers = self.pool.size()))]
    pub async fn run(&self) -> Result<Report, StatsError> {
        let config = self.config.as_ref();
        if self.users.is_empty() {
            warn!("no users tracked; every PR counts as authored by someone else");
        }

        let mut prs = Vec::new();
        for repo in &config.repos {
            let listed =
                list_pull_requests(self.api.as_ref(), &config.retry, &config.owner, repo, config.start)
                    .await?;
            info!(repo = %repo, count = listed.len(), "finished listing PRs");
            prs.extend(listed);
        }
        let listed = prs.len();

        let in_window = filter_for_time(prs, config.start, config.end);
        info!(count = in_window.len(), "finished filtering PRs for time");
        let in_window_count = in_window.len();

        let split = partition_by_author(in_window, &self.users);
        info!(
            authored = split.authored.len(),
            non_authored = split.non_authored.len(),
            "finished filtering PRs for authors"
        );

        let touched = filter_for_touch(
            &self.pool,
            &self.api,
            config.retry,
            &self.users,
            split.non_authored.clone(),
        )
        .await?;

        let prs = PrCounts {
            listed,
            in_window: in_window_count,
            authored: split.authored.len(),
            non_authored: split.non_authored.len(),
            touched: touched.len(),
        };

        let non_authored = self.count(split.non_authored).await?;
        // Touched PRs are a subset of the non-authored set, so these are cache hits.
        let touched = self.count(touched).await?;
        let authored = self.count(split.authored).await?;
        let lines = LineCounts {
            authored,
            non_authored,
            touched,
        };
        info!(
            total = lines.total(),
            reviewed = lines.touched,
            cached = self.cache.len(),
            "finished counting lines"
        );

        Ok(report::build(config, prs, lines))
    }

    async fn count(&self, prs: Vec<PullRequest>) -> Result<i64, StatsError> {
        count_lines_added(&self.pool, &self.api, self.config.retry, &self.cache, prs).await
    }
}
