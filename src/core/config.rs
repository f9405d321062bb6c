//! Workflow configuration from YAML

use crate::core::{
    matrix::MatrixEntry,
    trigger::{BranchPattern, EventKind, Trigger},
    workflow::Workflow,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level workflow configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Workflow name
    pub name: String,

    /// Trigger definition
    #[serde(rename = "on")]
    pub trigger: TriggerConfig,

    /// Version matrix; one job per entry
    pub matrix: Vec<MatrixEntry>,

    /// The runtime version that gates the docs/pep8/upload steps
    pub primary: String,
}

/// Trigger section as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Event kinds that start a run
    pub events: Vec<EventKind>,

    /// Branch filter patterns; empty means all branches
    #[serde(default)]
    pub branches: Vec<String>,
}

impl WorkflowConfig {
    /// Load workflow configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse workflow configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WorkflowConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the workflow configuration
    pub fn validate(&self) -> Result<()> {
        if self.trigger.events.is_empty() {
            anyhow::bail!("Trigger must name at least one event");
        }

        if self.matrix.is_empty() {
            anyhow::bail!("Matrix must contain at least one entry");
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &self.matrix {
            if entry.runtime.trim().is_empty() {
                anyhow::bail!("Matrix entry has an empty runtime version");
            }
            if !seen.insert(&entry.runtime) {
                anyhow::bail!("Duplicate runtime version in matrix: {}", entry.runtime);
            }
        }

        for pattern in &self.trigger.branches {
            if let Err(e) = BranchPattern::compile(pattern) {
                anyhow::bail!("Invalid branch pattern '{}': {}", pattern, e);
            }
        }

        Ok(())
    }

    /// Non-fatal findings worth surfacing to the user
    pub fn lint(&self) -> Vec<String> {
        let mut findings = Vec::new();

        if !self.matrix.iter().any(|e| e.runtime == self.primary) {
            findings.push(format!(
                "primary version '{}' does not appear in the matrix; docs/pep8/upload will never run",
                self.primary
            ));
        }

        findings
    }

    /// Build the trigger domain model
    pub fn build_trigger(&self) -> Result<Trigger> {
        let branches = self
            .trigger
            .branches
            .iter()
            .map(|p| BranchPattern::compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Trigger {
            events: self.trigger.events.clone(),
            branches,
        })
    }

    /// Convert config to a Workflow domain model
    pub fn to_workflow(&self) -> Result<Workflow> {
        Workflow::from_config(self)
    }
}
