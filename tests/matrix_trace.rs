//! End-to-end traces of matrix runs against a recording runner
//!
//! These pin down the observable contract: steps 1-4 run for every
//! matrix entry in order, the conditional checks run only for the
//! primary runtime, and the test step selects the right tox label.

mod common;

use common::{test_workflow, RecordingRunner};
use conveyor::core::{EventKind, StepKind, TriggerEvent};
use conveyor::{RunStatus, SchedulingStrategy, WorkflowEngine};

fn push_to_master() -> TriggerEvent {
    TriggerEvent::new(EventKind::Push, "master", "HEAD")
}

#[tokio::test]
async fn every_entry_runs_the_unconditional_steps_in_order() {
    let (runner, _) = RecordingRunner::new();
    let engine = WorkflowEngine::new(runner, SchedulingStrategy::Sequential);
    let mut workflow = test_workflow();

    let report = engine.execute(&mut workflow, &push_to_master(), None).await;

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.jobs.len(), 5);

    for job in &report.jobs {
        let trace = job.executed_trace();
        assert_eq!(
            &trace[..4],
            &[
                StepKind::Checkout,
                StepKind::Provision,
                StepKind::Install,
                StepKind::Test,
            ],
            "job {} must run the unconditional steps in template order",
            job.job_id
        );
    }
}

#[tokio::test]
async fn conditional_steps_run_only_for_the_primary_runtime() {
    let (runner, _) = RecordingRunner::new();
    let engine = WorkflowEngine::new(runner, SchedulingStrategy::Sequential);
    let mut workflow = test_workflow();

    let report = engine.execute(&mut workflow, &push_to_master(), None).await;

    for job in &report.jobs {
        let trace = job.executed_trace();
        if job.runtime == "3.10" {
            assert_eq!(
                trace,
                vec![
                    StepKind::Checkout,
                    StepKind::Provision,
                    StepKind::Install,
                    StepKind::Test,
                    StepKind::Docs,
                    StepKind::Pep8,
                    StepKind::Upload,
                ]
            );
        } else {
            assert!(
                !trace.contains(&StepKind::Docs)
                    && !trace.contains(&StepKind::Pep8)
                    && !trace.contains(&StepKind::Upload),
                "job {} must not run the primary-only checks",
                job.job_id
            );
            assert_eq!(trace.len(), 4);
        }
    }
}

#[tokio::test]
async fn test_step_selects_the_matrix_tox_label() {
    let (runner, invocations) = RecordingRunner::new();
    let engine = WorkflowEngine::new(runner, SchedulingStrategy::Sequential);
    let mut workflow = test_workflow();

    engine.execute(&mut workflow, &push_to_master(), None).await;

    let lines = invocations.lock().unwrap();
    // 3.6 overrides the label, everything else uses the default
    assert_eq!(lines.iter().filter(|l| *l == "tox -e min").count(), 1);
    assert_eq!(lines.iter().filter(|l| *l == "tox -e py").count(), 4);
    // Primary-only environments appear exactly once each
    assert_eq!(lines.iter().filter(|l| *l == "tox -e docs").count(), 1);
    assert_eq!(lines.iter().filter(|l| *l == "tox -e pep8").count(), 1);
    assert_eq!(lines.iter().filter(|l| *l == "codecov").count(), 1);
}

#[tokio::test]
async fn pull_request_on_release_branch_triggers_a_run() {
    let (runner, _) = RecordingRunner::new();
    let engine = WorkflowEngine::new(runner, SchedulingStrategy::Sequential);
    let mut workflow = test_workflow();

    let event = TriggerEvent::new(EventKind::PullRequest, "release/2.0", "abc123");
    let report = engine.execute(&mut workflow, &event, None).await;

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.jobs.len(), 5);
}

#[tokio::test]
async fn push_to_unlisted_branch_is_skipped_without_spawning() {
    let (runner, invocations) = RecordingRunner::new();
    let engine = WorkflowEngine::new(runner, SchedulingStrategy::Sequential);
    let mut workflow = test_workflow();

    let event = TriggerEvent::new(EventKind::Push, "feature/shiny", "HEAD");
    let report = engine.execute(&mut workflow, &event, None).await;

    assert_eq!(report.status, RunStatus::Skipped);
    assert!(report.jobs.is_empty());
    assert!(invocations.lock().unwrap().is_empty());
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn parallel_scheduling_produces_identical_traces() {
    let (runner, _) = RecordingRunner::new();
    let engine = WorkflowEngine::new(runner, SchedulingStrategy::Parallel);
    let mut workflow = test_workflow();

    let report = engine.execute(&mut workflow, &push_to_master(), None).await;

    assert_eq!(report.status, RunStatus::Succeeded);
    let runtimes: Vec<&str> = report.jobs.iter().map(|j| j.runtime.as_str()).collect();
    assert_eq!(runtimes, vec!["3.6", "3.7", "3.8", "3.9", "3.10"]);

    let primary = report.jobs.iter().find(|j| j.runtime == "3.10").unwrap();
    assert_eq!(primary.executed_trace().len(), 7);
}

#[tokio::test]
async fn checkout_uses_the_event_revision() {
    let (runner, invocations) = RecordingRunner::new();
    let engine = WorkflowEngine::new(runner, SchedulingStrategy::Sequential);
    let mut workflow = test_workflow();

    let event = TriggerEvent::new(EventKind::Push, "master", "1f2e3d");
    engine.execute(&mut workflow, &event, Some("3.10")).await;

    let lines = invocations.lock().unwrap();
    assert_eq!(lines[0], "git checkout --detach 1f2e3d");
}
