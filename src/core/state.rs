//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall status of a run or a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Not started yet
    Pending,
    /// Currently running
    Running,
    /// All jobs succeeded
    Succeeded,
    /// At least one job failed
    Failed,
    /// The trigger did not match the incoming event
    Skipped,
}

/// State of a single step within a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepState {
    /// Step has not run yet
    Pending,
    /// Step is currently running
    Running { started_at: DateTime<Utc> },
    /// Step finished with exit code 0
    Succeeded {
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    /// Step finished with a non-zero exit code (or could not be spawned)
    Failed {
        exit_code: i32,
        message: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Step predicate was false, or an earlier step in the job failed
    Skipped { reason: String },
}

impl StepState {
    /// Check if the step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Succeeded { .. } | StepState::Failed { .. } | StepState::Skipped { .. }
        )
    }

    /// Check if the step was actually invoked (succeeded or failed)
    pub fn was_executed(&self) -> bool {
        matches!(self, StepState::Succeeded { .. } | StepState::Failed { .. })
    }
}

/// State of a whole workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run ID
    pub run_id: Uuid,

    /// Current run status
    pub status: RunStatus,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of matrix jobs
    pub total_jobs: usize,

    /// Number of jobs that succeeded
    pub succeeded_jobs: usize,

    /// Number of jobs that failed
    pub failed_jobs: usize,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            total_jobs: 0,
            succeeded_jobs: 0,
            failed_jobs: 0,
        }
    }

    /// Mark the run as started
    pub fn start(&mut self, total_jobs: usize) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_jobs = total_jobs;
    }

    /// Mark the run as finished with the given job counts
    pub fn finish(&mut self, succeeded: usize, failed: usize) {
        self.succeeded_jobs = succeeded;
        self.failed_jobs = failed;
        self.status = if failed > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };
        self.completed_at = Some(Utc::now());
    }

    /// Mark the run as skipped (trigger did not match)
    pub fn skip(&mut self) {
        self.status = RunStatus::Skipped;
        self.completed_at = Some(Utc::now());
    }

    /// Fraction of jobs that have reached a terminal state (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_jobs == 0 {
            return 0.0;
        }
        (self.succeeded_jobs + self.failed_jobs) as f64 / self.total_jobs as f64
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
