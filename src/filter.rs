use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::github::{Actor, PullRequest};

/// The set of logins whose review activity is being measured.
/// Matching is exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedUsers {
    logins: HashSet<String>,
}

impl TrackedUsers {
    pub fn new<I, S>(logins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            logins: logins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, login: &str) -> bool {
        self.logins.contains(login)
    }

    /// True if any item's actor is tracked. Items without an actor never match.
    pub fn any_actor<A: Actor>(&self, items: &[A]) -> bool {
        items
            .iter()
            .filter_map(Actor::actor)
            .any(|login| self.contains(login))
    }

    /// Logins in sorted order, for display.
    pub fn sorted(&self) -> Vec<&str> {
        let mut logins: Vec<&str> = self.logins.iter().map(String::as_str).collect();
        logins.sort_unstable();
        logins
    }

    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }
}

/// Pull requests split by whether a tracked user authored them.
#[derive(Debug, Clone, Default)]
pub struct AuthorPartition {
    pub authored: Vec<PullRequest>,
    pub non_authored: Vec<PullRequest>,
}

/// A PR is in the window if it was updated strictly after `start` and created
/// strictly before `end`.
pub fn in_window(pr: &PullRequest, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    pr.updated_at > start && pr.created_at < end
}

/// Keep only PRs inside the window, preserving order.
pub fn filter_for_time(
    prs: Vec<PullRequest>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<PullRequest> {
    prs.into_iter()
        .filter(|pr| in_window(pr, start, end))
        .collect()
}

/// Split PRs into those authored by tracked users and everything else.
/// PRs whose author is unknown land in `non_authored`.
pub fn partition_by_author(prs: Vec<PullRequest>, users: &TrackedUsers) -> AuthorPartition {
    let (authored, non_authored) = prs
        .into_iter()
        .partition(|pr| pr.author().is_some_and(|login| users.contains(login)));
    AuthorPartition {
        authored,
        non_authored,
    }
}
