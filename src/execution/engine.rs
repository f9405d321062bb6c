//! Workflow engine - expands the matrix and drives job execution

use crate::core::{Job, RunStatus, StepKind, StepState, TriggerEvent, Workflow};
use crate::execution::executor::{StepExecutor, StepFailure, StepOutcome};
use crate::runner::CommandRunner;
use chrono::Utc;
use std::sync::{Arc, RwLock};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Strategy for scheduling matrix jobs
///
/// Jobs are independent of each other, so any of these produces the
/// same per-job traces; only wall-clock behaviour differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingStrategy {
    /// Run one job at a time, in matrix order
    #[default]
    Sequential,

    /// Run every job concurrently
    Parallel,

    /// Run at most N jobs concurrently
    LimitedParallel(usize),
}

/// Events that occur during a workflow run
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        run_id: Uuid,
        workflow_name: String,
        total_jobs: usize,
    },
    RunSkipped {
        run_id: Uuid,
        workflow_name: String,
        reason: String,
    },
    JobStarted {
        job_id: String,
        runtime: String,
    },
    StepStarted {
        job_id: String,
        kind: StepKind,
    },
    StepSucceeded {
        job_id: String,
        kind: StepKind,
    },
    StepSkipped {
        job_id: String,
        kind: StepKind,
        reason: String,
    },
    StepFailed {
        job_id: String,
        kind: StepKind,
        exit_code: i32,
    },
    JobFinished {
        job_id: String,
        status: RunStatus,
    },
    RunCompleted {
        run_id: Uuid,
        status: RunStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(RunEvent) + Send + Sync>;

type Handlers = Arc<RwLock<Vec<EventHandler>>>;

/// Final state of one matrix job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: String,
    pub runtime: String,
    pub test_env: String,
    pub status: RunStatus,
    /// First failing step, if any
    pub failure: Option<StepFailure>,
    /// Terminal state of every step, in template order
    pub steps: Vec<(StepKind, StepState)>,
}

impl JobReport {
    /// The steps that were actually invoked, in order
    pub fn executed_trace(&self) -> Vec<StepKind> {
        self.steps
            .iter()
            .filter(|(_, state)| state.was_executed())
            .map(|(kind, _)| *kind)
            .collect()
    }
}

/// Final state of a whole workflow run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub workflow_name: String,
    pub status: RunStatus,
    pub jobs: Vec<JobReport>,
}

impl RunReport {
    /// Process exit code for this run: 0 on success or a skipped run,
    /// otherwise the first failing step's exit code
    pub fn exit_code(&self) -> i32 {
        self.jobs
            .iter()
            .find_map(|j| j.failure.as_ref().map(|f| f.exit_code))
            .unwrap_or(0)
    }

    pub fn succeeded_jobs(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.status == RunStatus::Succeeded)
            .count()
    }

    pub fn failed_jobs(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.status == RunStatus::Failed)
            .count()
    }
}

/// Drives a full workflow run: trigger check, matrix expansion, job scheduling
pub struct WorkflowEngine<R> {
    executor: Arc<StepExecutor<R>>,
    strategy: SchedulingStrategy,
    event_handlers: Handlers,
}

impl<R: CommandRunner + Send + Sync + 'static> WorkflowEngine<R> {
    pub fn new(runner: R, strategy: SchedulingStrategy) -> Self {
        Self {
            executor: Arc::new(StepExecutor::new(runner)),
            strategy,
            event_handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(RunEvent) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.event_handlers.write() {
            handlers.push(Arc::new(handler));
        }
    }

    /// Execute a workflow run for the given event
    ///
    /// A non-matching event yields a `Skipped` report without expanding
    /// the matrix. `runtime_filter` restricts the run to one matrix entry.
    pub async fn execute(
        &self,
        workflow: &mut Workflow,
        event: &TriggerEvent,
        runtime_filter: Option<&str>,
    ) -> RunReport {
        let run_id = workflow.state.run_id;
        let workflow_name = workflow.name.clone();

        if !workflow.trigger.matches(event) {
            let reason = format!("{} on '{}' does not match the trigger", event.kind, event.branch);
            info!("Run skipped: {}", reason);
            workflow.state.skip();
            emit(
                &self.event_handlers,
                RunEvent::RunSkipped {
                    run_id,
                    workflow_name: workflow_name.clone(),
                    reason,
                },
            );
            return RunReport {
                run_id,
                workflow_name,
                status: RunStatus::Skipped,
                jobs: Vec::new(),
            };
        }

        let jobs = workflow.expand(&event.revision, runtime_filter);
        if let Some(runtime) = runtime_filter {
            if jobs.is_empty() {
                warn!("Runtime filter '{}' matches no matrix entry", runtime);
            }
        }

        info!(
            "Starting run {} of '{}' with {} job(s)",
            run_id,
            workflow_name,
            jobs.len()
        );
        workflow.state.start(jobs.len());
        emit(
            &self.event_handlers,
            RunEvent::RunStarted {
                run_id,
                workflow_name: workflow_name.clone(),
                total_jobs: jobs.len(),
            },
        );

        let reports = match self.strategy {
            SchedulingStrategy::Sequential => self.run_sequential(jobs).await,
            SchedulingStrategy::Parallel => self.run_parallel(jobs, usize::MAX).await,
            SchedulingStrategy::LimitedParallel(max) => {
                self.run_parallel(jobs, max.max(1)).await
            }
        };

        let succeeded = reports
            .iter()
            .filter(|r| r.status == RunStatus::Succeeded)
            .count();
        let failed = reports.len() - succeeded;
        workflow.state.finish(succeeded, failed);

        let status = workflow.state.status;
        info!("Run {} finished: {:?}", run_id, status);
        emit(
            &self.event_handlers,
            RunEvent::RunCompleted { run_id, status },
        );

        RunReport {
            run_id,
            workflow_name,
            status,
            jobs: reports,
        }
    }

    async fn run_sequential(&self, jobs: Vec<Job>) -> Vec<JobReport> {
        let mut reports = Vec::with_capacity(jobs.len());
        for job in jobs {
            reports.push(run_job(self.executor.clone(), self.event_handlers.clone(), job).await);
        }
        reports
    }

    async fn run_parallel(&self, jobs: Vec<Job>, max_concurrent: usize) -> Vec<JobReport> {
        let mut set: JoinSet<(usize, JobReport)> = JoinSet::new();
        let mut pending = jobs.into_iter().enumerate();
        let mut reports: Vec<Option<JobReport>> = Vec::new();

        loop {
            while set.len() < max_concurrent {
                match pending.next() {
                    Some((index, job)) => {
                        if reports.len() <= index {
                            reports.resize_with(index + 1, || None);
                        }
                        let executor = self.executor.clone();
                        let handlers = self.event_handlers.clone();
                        set.spawn(async move { (index, run_job(executor, handlers, job).await) });
                    }
                    None => break,
                }
            }

            match set.join_next().await {
                Some(Ok((index, report))) => reports[index] = Some(report),
                Some(Err(e)) => error!("Job task panicked: {}", e),
                None => break,
            }
        }

        // Matrix order regardless of completion order
        reports.into_iter().flatten().collect()
    }
}

/// Emit an event to all handlers
fn emit(handlers: &Handlers, event: RunEvent) {
    if let Ok(handlers) = handlers.read() {
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }
}

/// Run one job to completion: steps strictly in order, fail-fast
async fn run_job<R: CommandRunner>(
    executor: Arc<StepExecutor<R>>,
    handlers: Handlers,
    mut job: Job,
) -> JobReport {
    info!("[{}] job started (runtime {})", job.id, job.runtime);
    emit(
        &handlers,
        RunEvent::JobStarted {
            job_id: job.id.clone(),
            runtime: job.runtime.clone(),
        },
    );

    let mut failure: Option<StepFailure> = None;

    for index in 0..job.steps.len() {
        if failure.is_some() {
            // Fail-fast: later steps are never attempted
            job.steps[index].state = StepState::Skipped {
                reason: "an earlier step failed".to_string(),
            };
            continue;
        }

        let started_at = Utc::now();
        let step = job.steps[index].clone();

        if step.condition.map_or(true, |c| c.holds(&job)) {
            emit(
                &handlers,
                RunEvent::StepStarted {
                    job_id: job.id.clone(),
                    kind: step.kind,
                },
            );
        }
        job.steps[index].state = StepState::Running { started_at };

        match executor.execute(&job, &step).await {
            StepOutcome::Succeeded { .. } => {
                job.steps[index].state = StepState::Succeeded {
                    started_at,
                    finished_at: Utc::now(),
                };
                emit(
                    &handlers,
                    RunEvent::StepSucceeded {
                        job_id: job.id.clone(),
                        kind: step.kind,
                    },
                );
            }
            StepOutcome::Skipped { reason } => {
                job.steps[index].state = StepState::Skipped {
                    reason: reason.clone(),
                };
                emit(
                    &handlers,
                    RunEvent::StepSkipped {
                        job_id: job.id.clone(),
                        kind: step.kind,
                        reason,
                    },
                );
            }
            StepOutcome::Failed(step_failure) => {
                job.steps[index].state = StepState::Failed {
                    exit_code: step_failure.exit_code,
                    message: step_failure.stderr.clone(),
                    started_at,
                    failed_at: Utc::now(),
                };
                emit(
                    &handlers,
                    RunEvent::StepFailed {
                        job_id: job.id.clone(),
                        kind: step_failure.kind,
                        exit_code: step_failure.exit_code,
                    },
                );
                failure = Some(step_failure);
            }
        }
    }

    let status = if failure.is_some() {
        RunStatus::Failed
    } else {
        RunStatus::Succeeded
    };
    info!("[{}] job finished: {:?}", job.id, status);
    emit(
        &handlers,
        RunEvent::JobFinished {
            job_id: job.id.clone(),
            status,
        },
    );

    JobReport {
        job_id: job.id,
        runtime: job.runtime,
        test_env: job.test_env,
        status,
        failure,
        steps: job.steps.into_iter().map(|s| (s.kind, s.state)).collect(),
    }
}
