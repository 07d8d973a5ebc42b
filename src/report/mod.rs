pub mod types;

pub use types::{LineCounts, PrCounts, Report};

use crate::config::{RunConfig, DISPLAY_DATE_FORMAT};
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Build a Report from the run settings and the pipeline's tallies.
pub fn build(config: &RunConfig, prs: PrCounts, lines: LineCounts) -> Report {
    Report {
        owner: config.owner.clone(),
        repos: config.repos.clone(),
        users: config.users.sorted().into_iter().map(str::to_string).collect(),
        start: config.start,
        end: config.end,
        prs,
        lines,
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(owner = %report.owner, touched = report.prs.touched))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

fn window(report: &Report) -> String {
    format!(
        "{} to {}",
        report.start.format(DISPLAY_DATE_FORMAT),
        report.end.format(DISPLAY_DATE_FORMAT)
    )
}

fn percent(share: Option<f64>) -> String {
    match share {
        Some(share) => format!("{:.1}%", share * 100.0),
        None => "n/a".to_string(),
    }
}

/// Print the report with colors:
///
/// knative (serving, eventing): 1-1-2024 to 2-1-2024
/// Tracked users: alice, bob
///
/// ═══ Pull Requests ═══
/// ...
/// ═══ Reviewed: 41.3% of other authors' lines ═══
fn print_terminal_report(report: &Report) {
    println!();
    println!(
        "{} ({}): {}",
        report.owner.bold(),
        report.repos.join(", "),
        window(report)
    );
    println!("Tracked users: {}", report.users.join(", "));
    println!();

    println!("═══ Pull Requests ═══");
    println!("  Listed:            {}", report.prs.listed);
    println!("  In window:         {}", report.prs.in_window);
    println!("  Tracked authors:   {}", report.prs.authored);
    println!("  Other authors:     {}", report.prs.non_authored);
    println!("  Reviewed:          {}", report.prs.touched);
    println!();

    println!("═══ Lines Added ═══");
    println!("  Total:             {}", report.lines.total());
    println!(
        "  Tracked authors:   {} ({})",
        report.lines.authored,
        percent(report.lines.authored_share())
    );
    println!("  Other authors:     {}", report.lines.non_authored);
    println!("  Reviewed:          {}", report.lines.touched);
    println!();

    let reviewed = percent(report.lines.reviewed_share());
    println!(
        "═══ Reviewed: {} of other authors' lines ═══",
        reviewed.green().bold()
    );
    println!();
}

/// Write the report as a markdown file.
fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!(
        "# Review stats: {} ({})\n\n",
        report.owner,
        report.repos.join(", ")
    ));
    md.push_str(&format!(
        "**Window:** {} | **Tracked users:** {}\n\n",
        window(report),
        report.users.join(", ")
    ));

    md.push_str("## Pull Requests\n\n");
    md.push_str("| Stage | Count |\n|---|---|\n");
    md.push_str(&format!("| Listed | {} |\n", report.prs.listed));
    md.push_str(&format!("| In window | {} |\n", report.prs.in_window));
    md.push_str(&format!("| Tracked authors | {} |\n", report.prs.authored));
    md.push_str(&format!("| Other authors | {} |\n", report.prs.non_authored));
    md.push_str(&format!("| Reviewed | {} |\n\n", report.prs.touched));

    md.push_str("## Lines Added\n\n");
    md.push_str("| Set | Lines |\n|---|---|\n");
    md.push_str(&format!("| Total | {} |\n", report.lines.total()));
    md.push_str(&format!(
        "| Tracked authors | {} ({}) |\n",
        report.lines.authored,
        percent(report.lines.authored_share())
    ));
    md.push_str(&format!("| Other authors | {} |\n", report.lines.non_authored));
    md.push_str(&format!("| Reviewed | {} |\n\n", report.lines.touched));

    md.push_str(&format!(
        "## Reviewed: {} of other authors' lines\n",
        percent(report.lines.reviewed_share())
    ));

    std::fs::write(path, md)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RunArgs};
    use chrono::NaiveDate;

    fn sample_config() -> RunConfig {
        let args = RunArgs {
            repos: vec!["serving".to_string(), "eventing".to_string()],
            users: vec!["bob".to_string(), "alice".to_string()],
            start: Some("1-1-2024".to_string()),
            end: Some("2-1-2024".to_string()),
            ..RunArgs::default()
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        RunConfig::resolve(args, Config::default(), today).unwrap()
    }

    fn sample_report() -> Report {
        build(
            &sample_config(),
            PrCounts {
                listed: 120,
                in_window: 40,
                authored: 10,
                non_authored: 30,
                touched: 12,
            },
            LineCounts {
                authored: 2000,
                non_authored: 3000,
                touched: 1200,
            },
        )
    }

    #[test]
    fn test_build_report_metadata() {
        let report = sample_report();
        assert_eq!(report.owner, "knative");
        assert_eq!(report.repos, vec!["serving", "eventing"]);
        assert_eq!(report.users, vec!["alice", "bob"]);
        assert_eq!(report.prs.touched, 12);
        assert_eq!(report.lines.total(), 5000);
    }

    #[test]
    fn test_percent_formatting() {
        assert_eq!(percent(Some(0.4)), "40.0%");
        assert_eq!(percent(Some(1.0 / 3.0)), "33.3%");
        assert_eq!(percent(None), "n/a");
    }

    #[test]
    fn test_write_markdown_report() {
        let report = sample_report();
        let path = std::env::temp_dir().join("review_stats_report.md");
        write_markdown_report(&report, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# Review stats: knative (serving, eventing)"));
        assert!(content.contains("**Window:** 1-1-2024 to 2-1-2024"));
        assert!(content.contains("**Tracked users:** alice, bob"));
        assert!(content.contains("| Reviewed | 12 |"));
        assert!(content.contains("| Tracked authors | 2000 (40.0%) |"));
        assert!(content.contains("## Reviewed: 40.0% of other authors' lines"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_terminal_report_does_not_panic() {
        let mut report = sample_report();
        report.lines = LineCounts::default();
        print_terminal_report(&report);
    }

    #[test]
    fn test_output_to_file() {
        let report = sample_report();
        let path = std::env::temp_dir().join("review_stats_output.md");
        output(&report, Some(&path)).unwrap();
        assert!(path.exists());
        std::fs::remove_file(&path).ok();
    }
}
