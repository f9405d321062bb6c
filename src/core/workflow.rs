//! Workflow domain model

use crate::core::{
    config::WorkflowConfig,
    job::Job,
    matrix::MatrixEntry,
    state::RunState,
    trigger::Trigger,
};
use anyhow::Result;

/// A workflow definition: trigger plus version matrix
#[derive(Debug, Clone)]
pub struct Workflow {
    /// Workflow name
    pub name: String,

    /// Condition set under which the workflow runs
    pub trigger: Trigger,

    /// The runtime version that gates the conditional steps
    pub primary: String,

    /// Matrix entries; each expands into one job
    pub entries: Vec<MatrixEntry>,

    /// Run state
    pub state: RunState,
}

impl Workflow {
    /// Create a workflow from configuration
    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        Ok(Workflow {
            name: config.name.clone(),
            trigger: config.build_trigger()?,
            primary: config.primary.clone(),
            entries: config.matrix.clone(),
            state: RunState::new(),
        })
    }

    /// Expand the matrix into jobs for the given revision
    ///
    /// When `runtime_filter` is set, only matching entries are expanded
    /// (used to re-run a single matrix job).
    pub fn expand(&self, revision: &str, runtime_filter: Option<&str>) -> Vec<Job> {
        self.entries
            .iter()
            .filter(|e| runtime_filter.map_or(true, |r| e.runtime == r))
            .map(|e| Job::from_entry(e, &self.primary, revision))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::StepKind;

    fn workflow() -> Workflow {
        let yaml = r#"
name: "tests"
on:
  events: [push, pull_request]
  branches: ["master"]
matrix:
  - runtime: "3.6"
    tox_env: "min"
  - runtime: "3.7"
  - runtime: "3.8"
  - runtime: "3.9"
  - runtime: "3.10"
primary: "3.10"
"#;
        WorkflowConfig::from_yaml(yaml).unwrap().to_workflow().unwrap()
    }

    #[test]
    fn test_expand_one_job_per_entry() {
        let jobs = workflow().expand("HEAD", None);
        assert_eq!(jobs.len(), 5);

        let primary: Vec<_> = jobs.iter().filter(|j| j.primary).collect();
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].runtime, "3.10");
    }

    #[test]
    fn test_expand_with_runtime_filter() {
        let jobs = workflow().expand("HEAD", Some("3.8"));
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].runtime, "3.8");
    }

    #[test]
    fn test_expanded_jobs_carry_revision() {
        let jobs = workflow().expand("deadbeef", None);
        for job in &jobs {
            assert!(job
                .step(StepKind::Checkout)
                .unwrap()
                .command
                .args
                .contains(&"deadbeef".to_string()));
        }
    }
}
