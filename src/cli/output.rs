//! CLI output formatting

use crate::core::RunStatus;
use crate::execution::RunEvent;
use crate::persistence::RunSummary;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Create a progress bar over matrix jobs
pub fn create_job_progress_bar(total_jobs: usize) -> ProgressBar {
    let progress = ProgressBar::new(total_jobs as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} jobs {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Pending => style("PENDING").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Succeeded => style("SUCCEEDED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
        RunStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format a run summary for display
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        RunStatus::Succeeded => CHECK,
        RunStatus::Failed => CROSS,
        RunStatus::Running => SPINNER,
        RunStatus::Skipped => SKIP,
        _ => INFO,
    };

    format!(
        "{} {} - {} - {} on {} - {} ({}/{} jobs)",
        status_icon,
        style(&summary.run_id.to_string()[..8]).dim(),
        style(&summary.workflow_name).bold(),
        summary.event,
        style(&summary.branch).cyan(),
        format_status(summary.status),
        summary.succeeded_jobs,
        summary.total_jobs,
    )
}

/// Format a run event for display
pub fn format_run_event(event: &RunEvent) -> String {
    match event {
        RunEvent::RunStarted {
            run_id,
            workflow_name,
            total_jobs,
        } => format!(
            "{} Starting {} ({}) with {} job(s)",
            ROCKET,
            style(workflow_name).bold(),
            style(&run_id.to_string()[..8]).dim(),
            style(total_jobs).cyan()
        ),
        RunEvent::RunSkipped { workflow_name, reason, .. } => format!(
            "{} {} skipped: {}",
            SKIP,
            style(workflow_name).bold(),
            style(reason).dim()
        ),
        RunEvent::JobStarted { job_id, runtime } => format!(
            "{} {} (runtime {})",
            SPINNER,
            style(job_id).cyan(),
            style(runtime).dim()
        ),
        RunEvent::StepStarted { job_id, kind } => {
            format!("   {} {}/{}", SPINNER, style(job_id).dim(), kind)
        }
        RunEvent::StepSucceeded { job_id, kind } => {
            format!("   {} {}/{}", CHECK, style(job_id).dim(), style(kind).green())
        }
        RunEvent::StepSkipped { job_id, kind, reason } => format!(
            "   {} {}/{} ({})",
            SKIP,
            style(job_id).dim(),
            style(kind).dim(),
            style(reason).dim()
        ),
        RunEvent::StepFailed {
            job_id,
            kind,
            exit_code,
        } => format!(
            "   {} {}/{} (exit code {})",
            CROSS,
            style(job_id).dim(),
            style(kind).red(),
            style(exit_code).red()
        ),
        RunEvent::JobFinished { job_id, status } => match status {
            RunStatus::Succeeded => format!("{} {}", CHECK, style(job_id).green()),
            RunStatus::Failed => format!("{} {}", CROSS, style(job_id).red()),
            _ => format!("{} {} ({:?})", INFO, style(job_id).dim(), status),
        },
        RunEvent::RunCompleted { run_id, status } => {
            let status_str = match status {
                RunStatus::Succeeded => format!("completed {}", style("successfully").green()),
                RunStatus::Failed => style("failed").red().to_string(),
                _ => format!("{:?}", status),
            };
            format!(
                "{} Run ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventKind, StepKind};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_format_step_failed_mentions_exit_code() {
        let line = format_run_event(&RunEvent::StepFailed {
            job_id: "py3.10".to_string(),
            kind: StepKind::Test,
            exit_code: 2,
        });
        assert!(line.contains("py3.10"));
        assert!(line.contains("2"));
    }

    #[test]
    fn test_format_run_summary() {
        let summary = RunSummary {
            run_id: Uuid::new_v4(),
            workflow_name: "tests".to_string(),
            event: EventKind::Push,
            branch: "master".to_string(),
            status: RunStatus::Succeeded,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            total_jobs: 5,
            succeeded_jobs: 5,
            failed_jobs: 0,
        };
        let line = format_run_summary(&summary);
        assert!(line.contains("tests"));
        assert!(line.contains("master"));
    }
}
