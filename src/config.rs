use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Args;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::fetch::{RetryPolicy, DEFAULT_REQUEST_DELAY, DEFAULT_RETRIES};
use crate::filter::TrackedUsers;
use crate::github::client::DEFAULT_API_URL;
use crate::pool::DEFAULT_WORKERS;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = ".review-stats.toml";

/// Date format for `--start` / `--end`, e.g. `1-2-2006`.
pub const DATE_FORMAT: &str = "%m-%d-%Y";

/// Display form of [`DATE_FORMAT`] without zero padding.
pub const DISPLAY_DATE_FORMAT: &str = "%-m-%-d-%Y";

pub const DEFAULT_OWNER: &str = "knative";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unable to parse date '{value}', expected M-D-YYYY: {source}")]
    InvalidDate {
        value: String,
        source: chrono::ParseError,
    },

    #[error("Unable to read token file {path}: {source}")]
    TokenRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No GitHub token: pass --token-file or set GITHUB_TOKEN")]
    MissingToken,

    #[error("Worker count must be at least 1")]
    InvalidWorkers,
}

/// Optional settings loaded from .review-stats.toml.
/// Every field may be omitted; command-line flags take precedence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// File holding the API token. If None, falls back to GITHUB_TOKEN env var.
    pub token_file: Option<PathBuf>,
    pub api_url: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchConfig {
    pub workers: Option<usize>,
    pub retries: Option<u32>,
    pub request_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingConfig {
    #[serde(default)]
    pub repos: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
}

impl Config {
    /// Load `path` if given, otherwise .review-stats.toml in the current
    /// directory. A missing default file yields `Config::default()`; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}

/// Command-line flags describing one run.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Repository names to scan (repeatable or comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub repos: Vec<String>,

    /// GitHub logins whose reviews are counted (repeatable or comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub users: Vec<String>,

    /// Organization or user owning the repositories [default: knative]
    #[arg(long)]
    pub owner: Option<String>,

    /// Window start in M-D-YYYY format [default: today]
    #[arg(long)]
    pub start: Option<String>,

    /// Window end in M-D-YYYY format [default: today]
    #[arg(long)]
    pub end: Option<String>,

    /// Path to a file containing the GitHub token
    #[arg(long)]
    pub token_file: Option<PathBuf>,

    /// Number of concurrent API workers [default: 3]
    #[arg(long)]
    pub workers: Option<usize>,

    /// Retries per failed list request [default: 5]
    #[arg(long)]
    pub retries: Option<u32>,

    /// Pause after every API request, in milliseconds [default: 750]
    #[arg(long)]
    pub request_delay_ms: Option<u64>,

    /// GitHub API base URL [default: https://api.github.com]
    #[arg(long)]
    pub api_url: Option<String>,
}

/// Fully resolved, immutable settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub owner: String,
    pub repos: Vec<String>,
    pub users: TrackedUsers,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub workers: usize,
    pub retry: RetryPolicy,
    pub api_url: String,
    pub token_file: Option<PathBuf>,
}

impl RunConfig {
    /// Merge flags over the config file. Dates not given default to `today`.
    pub fn resolve(args: RunArgs, file: Config, today: NaiveDate) -> Result<RunConfig, ConfigError> {
        let start = match args.start {
            Some(value) => parse_date(&value)?,
            None => midnight_utc(today),
        };
        let end = match args.end {
            Some(value) => parse_date(&value)?,
            None => midnight_utc(today),
        };

        let workers = args
            .workers
            .or(file.fetch.workers)
            .unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }

        let retries = args.retries.or(file.fetch.retries).unwrap_or(DEFAULT_RETRIES);
        let delay = args
            .request_delay_ms
            .or(file.fetch.request_delay_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_DELAY);

        let repos = if args.repos.is_empty() {
            file.tracking.repos
        } else {
            args.repos
        };
        let users = if args.users.is_empty() {
            file.tracking.users
        } else {
            args.users
        };

        Ok(RunConfig {
            owner: args
                .owner
                .or(file.github.owner)
                .unwrap_or_else(|| DEFAULT_OWNER.to_string()),
            repos,
            users: TrackedUsers::new(users),
            start,
            end,
            workers,
            retry: RetryPolicy::new(retries, delay),
            api_url: args
                .api_url
                .or(file.github.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token_file: args.token_file.or(file.github.token_file),
        })
    }

    /// Resolve the GitHub token: the token file takes precedence,
    /// falls back to GITHUB_TOKEN env var.
    pub fn token(&self) -> Result<String, ConfigError> {
        match &self.token_file {
            Some(path) => read_token(path),
            None => std::env::var("GITHUB_TOKEN").map_err(|_| ConfigError::MissingToken),
        }
    }
}

/// Parse an `M-D-YYYY` date as midnight UTC.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(midnight_utc)
        .map_err(|source| ConfigError::InvalidDate {
            value: value.to_string(),
            source,
        })
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Read a token file, dropping one trailing newline.
pub fn read_token(path: &Path) -> Result<String, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::TokenRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(contents
        .strip_suffix('\n')
        .map(str::to_string)
        .unwrap_or(contents))
}
