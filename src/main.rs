mod cli;
mod core;
mod execution;
mod persistence;
mod runner;

use anyhow::{Context, Result};
use cli::commands::{HistoryCommand, ListCommand, PlanCommand, RunCommand, ValidateCommand};
use cli::output::*;
use cli::{Cli, Command};
use core::{RunStatus, TriggerEvent};
use execution::{RunEvent, WorkflowEngine};
use persistence::{create_summary, InMemoryRunStore, RunStore, RunSummary};
#[cfg(feature = "sqlite")]
use persistence::SqliteRunStore;
use runner::ShellRunner;
use std::sync::Arc;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_workflow(cmd).await?,
        Command::Plan(cmd) => plan_workflow(cmd)?,
        Command::Validate(cmd) => validate_workflow(cmd)?,
        Command::List(cmd) => list_workflows(cmd).await?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

/// Open the run store, preferring SQLite when available
async fn open_store(ephemeral: bool) -> Result<Arc<dyn RunStore>> {
    #[cfg(feature = "sqlite")]
    if !ephemeral {
        return Ok(Arc::new(SqliteRunStore::with_default_path().await?));
    }
    let _ = ephemeral;
    Ok(Arc::new(InMemoryRunStore::new()))
}

async fn run_workflow(cmd: &RunCommand) -> Result<()> {
    // Load workflow config
    let config = core::WorkflowConfig::from_file(&cmd.file)
        .context("Failed to load workflow config")?;

    println!("{} Loaded workflow: {}", INFO, style(&config.name).bold());
    for finding in config.lint() {
        println!("{} {}", WARN, style(finding).yellow());
    }

    let mut workflow = config.to_workflow()?;
    let event = TriggerEvent::new(cmd.event.into(), &cmd.branch, &cmd.revision);

    // Set up persistence
    let store = open_store(cmd.no_history).await?;

    // Create execution engine over the real shell runner
    let engine = WorkflowEngine::new(ShellRunner::default(), cmd.strategy.into());

    // Console output plus a job-level progress bar
    let total_jobs = workflow
        .entries
        .iter()
        .filter(|e| cmd.runtime.as_deref().map_or(true, |r| e.runtime == r))
        .count();
    let progress = create_job_progress_bar(total_jobs);
    let bar = progress.clone();
    engine.add_event_handler(move |event| {
        bar.println(format_run_event(&event));
        if matches!(event, RunEvent::JobFinished { .. }) {
            bar.inc(1);
        }
    });

    // Execute the run
    println!();
    let report = engine
        .execute(&mut workflow, &event, cmd.runtime.as_deref())
        .await;
    progress.finish_and_clear();

    // Save to history
    if !cmd.no_history {
        let summary = create_summary(&workflow, &event);
        store.save_run(&summary).await?;
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(&summary.run_id.to_string()[..8]).dim()
        );
    }

    // Print final status
    match report.status {
        RunStatus::Succeeded => {
            println!(
                "\n{} {} completed {} ({} job(s))",
                CHECK,
                style(&workflow.name).bold(),
                style("successfully").green(),
                report.succeeded_jobs()
            );
        }
        RunStatus::Skipped => {
            println!(
                "\n{} {} {} for {} on '{}'",
                SKIP,
                style(&workflow.name).bold(),
                style("not triggered").dim(),
                event.kind,
                event.branch
            );
        }
        _ => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&workflow.name).bold(),
                style("failed").red()
            );
            for job in report.jobs.iter().filter(|j| j.failure.is_some()) {
                if let Some(failure) = &job.failure {
                    println!("  {} {}: {}", CROSS, style(&job.job_id).red(), failure);
                }
            }
            std::process::exit(report.exit_code());
        }
    }

    Ok(())
}

fn plan_workflow(cmd: &PlanCommand) -> Result<()> {
    let config = core::WorkflowConfig::from_file(&cmd.file)
        .context("Failed to load workflow config")?;
    let workflow = config.to_workflow()?;
    let jobs = workflow.expand(&cmd.revision, None);

    if cmd.json {
        let data = serde_json::json!({
            "workflow": workflow.name,
            "jobs": jobs.iter().map(|job| {
                serde_json::json!({
                    "id": job.id,
                    "runtime": job.runtime,
                    "test_env": job.test_env,
                    "primary": job.primary,
                    "steps": job.planned_steps().iter().map(|s| {
                        serde_json::json!({
                            "kind": s.kind.to_string(),
                            "command": s.command.display_line(),
                        })
                    }).collect::<Vec<_>>(),
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Plan for {}:", INFO, style(&workflow.name).bold());
    for job in &jobs {
        println!(
            "\n  {} (runtime {}, test env {})",
            style(&job.id).bold(),
            style(&job.runtime).cyan(),
            style(&job.test_env).cyan()
        );
        for step in job.planned_steps() {
            println!(
                "    {} {}",
                style(format!("{:<9}", step.kind.to_string())).cyan(),
                style(step.command.display_line()).dim()
            );
        }
    }

    Ok(())
}

fn validate_workflow(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating workflow...", INFO);

    let result = core::WorkflowConfig::from_file(&cmd.file);

    match result {
        Ok(config) => {
            println!("{} Workflow configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Matrix jobs: {}", style(config.matrix.len()).cyan());
            println!(
                "  Events: {}",
                style(
                    config
                        .trigger
                        .events
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
                .cyan()
            );
            println!("  Primary runtime: {}", style(&config.primary).cyan());

            for finding in config.lint() {
                println!("{} {}", WARN, style(finding).yellow());
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

async fn list_workflows(cmd: &ListCommand) -> Result<()> {
    let store = open_store(false).await?;
    let workflows = store.list_workflows().await?;

    if workflows.is_empty() {
        println!("{} No workflows found in history", INFO);
        return Ok(());
    }

    println!("{} Workflows in history:", INFO);

    for workflow_name in &workflows {
        let runs = store.list_runs(workflow_name).await?;

        if cmd.with_counts {
            let succeeded = runs.iter().filter(|r| r.status == RunStatus::Succeeded).count();
            let failed = runs.iter().filter(|r| r.status == RunStatus::Failed).count();
            println!(
                "  {} ({} runs: {} succeeded, {} failed)",
                style(workflow_name).bold(),
                style(runs.len()).cyan(),
                style(succeeded).green(),
                style(failed).red()
            );
        } else {
            println!("  {}", style(workflow_name).bold());
        }
    }

    if cmd.json {
        let mut json_data = Vec::new();
        for workflow in &workflows {
            let runs = store.list_runs(workflow).await.ok();
            json_data.push(serde_json::json!({
                "name": workflow,
                "run_count": runs.as_ref().map(|r| r.len()).unwrap_or(0)
            }));
        }
        let data = serde_json::json!({ "workflows": json_data });
        println!("\n{}", serde_json::to_string_pretty(&data)?);
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = open_store(false).await?;

    // If a specific run ID is requested
    if let Some(run_id_str) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id_str).context("Invalid run ID format")?;
        let summary = store.load_run(run_id).await?;

        match summary {
            Some(summary) => {
                print_run_details(&summary, cmd.details)?;
            }
            None => {
                println!("{} Run not found", WARN);
            }
        }
        return Ok(());
    }

    // List runs for a workflow or all
    let runs = if let Some(workflow_name) = &cmd.workflow {
        store.list_runs(workflow_name).await?
    } else {
        let workflows = store.list_workflows().await?;
        let mut all_runs = Vec::new();
        for workflow in &workflows {
            all_runs.extend(store.list_runs(workflow).await?);
        }
        all_runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all_runs.into_iter().take(cmd.limit).collect()
    };

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        for summary in runs.iter().take(cmd.limit) {
            println!("  {}", format_run_summary(summary));
        }
    }

    Ok(())
}

fn print_run_details(summary: &RunSummary, verbose: bool) -> Result<()> {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.run_id).cyan());
    println!("  Workflow: {}", style(&summary.workflow_name).bold());
    println!("  Event: {} on {}", summary.event, style(&summary.branch).cyan());
    println!("  Status: {}", format_status(summary.status));
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Jobs: {} succeeded, {} failed, {} total",
        style(summary.succeeded_jobs).green(),
        style(summary.failed_jobs).red(),
        summary.total_jobs
    );

    if verbose {
        println!("\n  {}", style("Full details:").bold());
        let json = serde_json::to_string_pretty(summary)?;
        for line in json.lines() {
            println!("    {}", line);
        }
    }

    if summary.status == RunStatus::Running {
        warn!("Run is still marked as running; it may have been interrupted");
    }

    Ok(())
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
