use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::fetch::{collect_pages, RetryPolicy};
use crate::filter::TrackedUsers;
use crate::github::{GitHubError, PullRequest, PullRequestApi};
use crate::pool::WorkerPool;
use crate::stats::StatsError;

/// True if a tracked user reviewed `pr`. Stops at the first page with a match.
pub async fn reviewed_by(
    api: &dyn PullRequestApi,
    policy: &RetryPolicy,
    pr: &PullRequest,
    users: &TrackedUsers,
) -> Result<bool, GitHubError> {
    let reviews = collect_pages(
        policy,
        |page| api.list_reviews(pr, page),
        |reviews| users.any_actor(reviews),
    )
    .await?;
    Ok(users.any_actor(&reviews))
}

/// True if a tracked user left a conversation comment on `pr`.
pub async fn commented_on_by(
    api: &dyn PullRequestApi,
    policy: &RetryPolicy,
    pr: &PullRequest,
    users: &TrackedUsers,
) -> Result<bool, GitHubError> {
    let comments = collect_pages(
        policy,
        |page| api.list_issue_comments(pr, page),
        |comments| users.any_actor(comments),
    )
    .await?;
    Ok(users.any_actor(&comments))
}

/// Reviews are checked first; comments are only fetched when no tracked user
/// reviewed.
#[instrument(skip_all, fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number))]
pub async fn is_touched(
    api: &dyn PullRequestApi,
    policy: &RetryPolicy,
    pr: &PullRequest,
    users: &TrackedUsers,
) -> Result<bool, GitHubError> {
    if reviewed_by(api, policy, pr, users).await? {
        debug!("reviewed by a tracked user");
        return Ok(true);
    }
    let commented = commented_on_by(api, policy, pr, users).await?;
    debug!(commented, "checked comments");
    Ok(commented)
}

/// Keep the PRs a tracked user reviewed or commented on.
///
/// The result is a subset of `prs` in completion order, not input order.
pub async fn filter_for_touch(
    pool: &WorkerPool,
    api: &Arc<dyn PullRequestApi>,
    policy: RetryPolicy,
    users: &Arc<TrackedUsers>,
    prs: Vec<PullRequest>,
) -> Result<Vec<PullRequest>, StatsError> {
    let total = prs.len();
    let api = Arc::clone(api);
    let users = Arc::clone(users);

    let outcomes = pool
        .run(prs, move |pr| {
            let api = Arc::clone(&api);
            let users = Arc::clone(&users);
            async move {
                let touched = is_touched(api.as_ref(), &policy, &pr, &users).await?;
                Ok::<_, StatsError>(touched.then_some(pr))
            }
        })
        .await?;

    let touched: Vec<PullRequest> = outcomes.into_iter().flatten().collect();
    info!(total, touched = touched.len(), "checked PRs for review activity");
    Ok(touched)
}
