use chrono::{DateTime, Utc};

/// How many pull requests survived each pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrCounts {
    /// Listed from the API across all repositories
    pub listed: usize,
    /// Updated after the window start and created before its end
    pub in_window: usize,
    /// In-window PRs authored by tracked users
    pub authored: usize,
    /// In-window PRs authored by anyone else
    pub non_authored: usize,
    /// Non-authored PRs a tracked user reviewed or commented on
    pub touched: usize,
}

/// Non-vendor lines added, per pull-request set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub authored: i64,
    pub non_authored: i64,
    pub touched: i64,
}

impl LineCounts {
    /// Lines added across every in-window PR.
    pub fn total(&self) -> i64 {
        self.authored + self.non_authored
    }

    /// Fraction of other people's lines that tracked users reviewed or
    /// commented on. None when nobody else added lines.
    pub fn reviewed_share(&self) -> Option<f64> {
        ratio(self.touched, self.non_authored)
    }

    /// Fraction of all in-window lines written by tracked users.
    pub fn authored_share(&self) -> Option<f64> {
        ratio(self.authored, self.total())
    }
}

fn ratio(part: i64, whole: i64) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64)
}

/// Review-participation summary for one run.
#[derive(Debug, Clone)]
pub struct Report {
    pub owner: String,
    pub repos: Vec<String>,
    /// Tracked logins, sorted
    pub users: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub prs: PrCounts,
    pub lines: LineCounts,
}
