//! Persistence layer for run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteRunStore;

use crate::core::{EventKind, RunStatus, TriggerEvent, Workflow};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run ID
    pub run_id: Uuid,

    /// Workflow name
    pub workflow_name: String,

    /// The event kind that started the run
    pub event: EventKind,

    /// The branch the run was triggered for
    pub branch: String,

    /// Run status
    pub status: RunStatus,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run completed (if it has)
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of matrix jobs
    pub total_jobs: usize,

    /// Number of jobs that succeeded
    pub succeeded_jobs: usize,

    /// Number of jobs that failed
    pub failed_jobs: usize,
}

impl RunSummary {
    /// Fraction of jobs that reached a terminal state (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_jobs == 0 {
            return 0.0;
        }
        (self.succeeded_jobs + self.failed_jobs) as f64 / self.total_jobs as f64
    }
}

/// Trait for run history backends
#[async_trait::async_trait]
pub trait RunStore: Send + Sync {
    /// Save a run summary
    async fn save_run(&self, run: &RunSummary) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>>;

    /// List all runs for a workflow, most recent first
    async fn list_runs(&self, workflow_name: &str) -> Result<Vec<RunSummary>>;

    /// List all workflow names with stored runs
    async fn list_workflows(&self) -> Result<Vec<String>>;
}

/// In-memory run store (for --no-history and tests)
pub struct InMemoryRunStore {
    runs: tokio::sync::RwLock<std::collections::HashMap<Uuid, RunSummary>>,
    by_workflow: tokio::sync::RwLock<std::collections::HashMap<String, Vec<Uuid>>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self {
            runs: tokio::sync::RwLock::new(std::collections::HashMap::new()),
            by_workflow: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryRunStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RunStore for InMemoryRunStore {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        let mut runs = self.runs.write().await;
        runs.insert(run.run_id, run.clone());

        let mut by_workflow = self.by_workflow.write().await;
        by_workflow
            .entry(run.workflow_name.clone())
            .or_default()
            .push(run.run_id);

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>> {
        let runs = self.runs.read().await;
        Ok(runs.get(&run_id).cloned())
    }

    async fn list_runs(&self, workflow_name: &str) -> Result<Vec<RunSummary>> {
        let runs = self.runs.read().await;
        let by_workflow = self.by_workflow.read().await;

        let mut result: Vec<RunSummary> = by_workflow
            .get(workflow_name)
            .into_iter()
            .flatten()
            .filter_map(|id| runs.get(id).cloned())
            .collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(result)
    }

    async fn list_workflows(&self) -> Result<Vec<String>> {
        let by_workflow = self.by_workflow.read().await;
        Ok(by_workflow.keys().cloned().collect())
    }
}

/// Build a summary from a finished workflow and its triggering event
pub fn create_summary(workflow: &Workflow, event: &TriggerEvent) -> RunSummary {
    RunSummary {
        run_id: workflow.state.run_id,
        workflow_name: workflow.name.clone(),
        event: event.kind,
        branch: event.branch.clone(),
        status: workflow.state.status,
        started_at: workflow.state.started_at.unwrap_or_else(Utc::now),
        completed_at: workflow.state.completed_at,
        total_jobs: workflow.state.total_jobs,
        succeeded_jobs: workflow.state.succeeded_jobs,
        failed_jobs: workflow.state.failed_jobs,
    }
}
