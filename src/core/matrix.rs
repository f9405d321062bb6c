//! Matrix entries - one parameterization per job

use serde::{Deserialize, Serialize};

/// Test environment label used when a matrix entry does not override it
pub const DEFAULT_TEST_ENV: &str = "py";

/// One parameterization of the step template
///
/// Each entry is expanded into its own independent job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixEntry {
    /// Interpreter version to provision, e.g. "3.10"
    pub runtime: String,

    /// Optional test environment label override, e.g. "min"
    #[serde(default)]
    pub tox_env: Option<String>,
}

impl MatrixEntry {
    pub fn new(runtime: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
            tox_env: None,
        }
    }

    pub fn with_tox_env(mut self, env: impl Into<String>) -> Self {
        self.tox_env = Some(env.into());
        self
    }

    /// The test environment label this entry selects
    pub fn test_env(&self) -> &str {
        self.tox_env.as_deref().unwrap_or(DEFAULT_TEST_ENV)
    }

    /// Job identifier derived from the entry, e.g. "py3.10"
    pub fn job_id(&self) -> String {
        format!("py{}", self.runtime)
    }
}
