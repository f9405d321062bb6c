//! Shared test helpers: mock command runners and workflow fixtures

use async_trait::async_trait;
use conveyor::core::CommandSpec;
use conveyor::runner::{CommandOutput, CommandRunner, RunnerError};
use conveyor::{Workflow, WorkflowConfig};
use std::sync::{Arc, Mutex};

/// Fixture workflow: five interpreter versions, one tox override,
/// conditional checks gated on 3.10
pub const TEST_WORKFLOW: &str = r#"
name: "tests"
on:
  events: [push, pull_request]
  branches: ["master", "release/*"]
matrix:
  - runtime: "3.6"
    tox_env: "min"
  - runtime: "3.7"
  - runtime: "3.8"
  - runtime: "3.9"
  - runtime: "3.10"
primary: "3.10"
"#;

pub fn test_workflow() -> Workflow {
    WorkflowConfig::from_yaml(TEST_WORKFLOW)
        .expect("fixture workflow should parse")
        .to_workflow()
        .expect("fixture workflow should build")
}

/// Records every command line it is asked to run; optionally fails
/// commands containing a substring
pub struct RecordingRunner {
    invocations: Arc<Mutex<Vec<String>>>,
    fail_on: Option<(String, i32)>,
}

impl RecordingRunner {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let invocations = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                invocations: invocations.clone(),
                fail_on: None,
            },
            invocations,
        )
    }

    pub fn failing_on(substring: &str, exit_code: i32) -> (Self, Arc<Mutex<Vec<String>>>) {
        let (mut runner, invocations) = Self::new();
        runner.fail_on = Some((substring.to_string(), exit_code));
        (runner, invocations)
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, RunnerError> {
        let line = command.display_line();
        self.invocations
            .lock()
            .expect("invocation log poisoned")
            .push(line.clone());
        if let Some((substring, exit_code)) = &self.fail_on {
            if line.contains(substring) {
                return Ok(CommandOutput::failure(*exit_code, "simulated failure"));
            }
        }
        Ok(CommandOutput::success())
    }
}
