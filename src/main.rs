mod config;
mod fetch;
mod filter;
mod github;
mod lines;
mod pool;
mod report;
mod stats;
mod touch;

use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use config::DISPLAY_DATE_FORMAT;

/// Review Stats: measures how many lines of other people's pull requests a
/// set of GitHub users reviewed or commented on within a date window.
#[derive(Parser, Debug)]
#[command(name = "review-stats", version, about)]
struct Cli {
    #[command(flatten)]
    run: config::RunArgs,

    /// TOML config file [default: .review-stats.toml if present]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Optional output file path for markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let file_config = config::Config::load(cli.config.as_deref())?;
    let run_config = config::RunConfig::resolve(cli.run, file_config, Utc::now().date_naive())?;
    debug!(?run_config, "resolved configuration");

    let _main_span = info_span!("review_stats", owner = %run_config.owner).entered();
    info!(
        start = %run_config.start.format(DISPLAY_DATE_FORMAT),
        end = %run_config.end.format(DISPLAY_DATE_FORMAT),
        repos = run_config.repos.len(),
        "searching for PRs"
    );

    let token = run_config.token()?;
    let client = github::GitHubClient::new(&run_config.api_url, &token)?;
    let stats = stats::ReviewStats::new(Arc::new(client), Arc::new(run_config));
    let built_report = stats.run().await?;

    info!("generating report");
    report::output(&built_report, cli.output.as_deref())?;
    info!(reviewed_lines = built_report.lines.touched, "done");

    Ok(())
}
