//! Pure formatting functions for UI output.
//!
//! `format_*` functions build the text; `display_*` functions print it.
//! Styling goes through `console`, which drops colors when the stream is not
//! a terminal.

use crate::domain::{ReleaseMarker, Revision};
use crate::rebase::RebaseReport;
use console::style;
use std::path::Path;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// `<repo>: <text>` when several repositories are printed together
pub fn with_repo(repo: Option<&Path>, text: &str) -> String {
    match repo {
        Some(path) => format!("{}: {}", style(path.display()).bold(), text),
        None => text.to_string(),
    }
}

pub fn format_marker(marker: Option<&ReleaseMarker>) -> String {
    match marker {
        Some(marker) => marker.name(),
        None => style("none").dim().to_string(),
    }
}

/// One revision per line; an absent list reads as "none"
pub fn format_revisions(revisions: Option<&[Revision]>) -> String {
    match revisions {
        None => style("none").dim().to_string(),
        Some([]) => "up to date".to_string(),
        Some(revisions) => revisions
            .iter()
            .map(Revision::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn format_branches(branches: &[String]) -> String {
    branches
        .iter()
        .map(|branch| format!("  - {}", branch))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summary line of a finished rebase
pub fn format_rebase_report(report: &RebaseReport) -> String {
    let plan = &report.plan;
    let mut text = if report.rewritten {
        format!(
            "{} rebased onto {} ({}..{})",
            plan.topic_branch, plan.new_graft, plan.old_graft, plan.topic_head
        )
    } else {
        format!("{} already at {}", plan.topic_branch, plan.new_graft)
    };
    if report.retargeted {
        text.push_str(&format!(
            ", now tracking {} (was {})",
            plan.new_upstream, plan.old_upstream
        ));
    }
    text
}

/// `3 done, 1 failed, 2 skipped`
pub fn format_run_summary(completed: usize, failed: usize, skipped: usize) -> String {
    let mut parts = vec![format!("{} done", completed)];
    if failed > 0 {
        parts.push(style(format!("{} failed", failed)).red().to_string());
    }
    if skipped > 0 {
        parts.push(format!("{} skipped", skipped));
    }
    parts.join(", ")
}
