//! Step executor - runs a single step of a job

use crate::core::{Job, Step, StepKind};
use crate::runner::{CommandRunner, RunnerError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Exit code reported when a command times out (shell convention)
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit code reported when a command cannot be spawned (shell convention)
pub const SPAWN_EXIT_CODE: i32 = 127;

/// A step that finished unsuccessfully
///
/// The kind identifies which part of the template failed (checkout,
/// provision, install, test, docs, pep8, upload); the exit code is the
/// one the job reports as its terminal status.
#[derive(Debug, Clone, Error)]
#[error("{kind} failed with exit code {exit_code}")]
pub struct StepFailure {
    pub kind: StepKind,
    pub exit_code: i32,
    pub stderr: String,
}

/// Result of executing a step
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// The command ran and exited cleanly
    Succeeded { stdout: String },
    /// The step's predicate was false; nothing was spawned
    Skipped { reason: String },
    /// The command exited non-zero, timed out, or could not be spawned
    Failed(StepFailure),
}

/// Executes a single step through a command runner
pub struct StepExecutor<R> {
    runner: R,
}

impl<R: CommandRunner> StepExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Execute one step of a job
    ///
    /// Evaluates the step's predicate first; a false predicate yields
    /// `Skipped` without spawning anything.
    pub async fn execute(&self, job: &Job, step: &Step) -> StepOutcome {
        if let Some(condition) = step.condition {
            if !condition.holds(job) {
                debug!("[{}] skipping {}: {}", job.id, step.kind, condition.skip_reason());
                return StepOutcome::Skipped {
                    reason: condition.skip_reason().to_string(),
                };
            }
        }

        info!("[{}] {} $ {}", job.id, step.kind, step.command.display_line());

        let output = match self.runner.run(&step.command).await {
            Ok(output) => output,
            Err(e) => {
                warn!("[{}] {} could not run: {}", job.id, step.kind, e);
                let exit_code = match e {
                    RunnerError::Timeout(_) => TIMEOUT_EXIT_CODE,
                    _ => SPAWN_EXIT_CODE,
                };
                return StepOutcome::Failed(StepFailure {
                    kind: step.kind,
                    exit_code,
                    stderr: e.to_string(),
                });
            }
        };

        if output.is_success() {
            StepOutcome::Succeeded {
                stdout: output.stdout,
            }
        } else {
            warn!(
                "[{}] {} exited with code {}",
                job.id, step.kind, output.exit_code
            );
            StepOutcome::Failed(StepFailure {
                kind: step.kind,
                exit_code: output.exit_code,
                stderr: output.stderr,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CommandSpec, MatrixEntry};
    use crate::runner::{CommandOutput, RunnerError};
    use async_trait::async_trait;

    struct FixedRunner {
        result: fn() -> Result<CommandOutput, RunnerError>,
    }

    #[async_trait]
    impl CommandRunner for FixedRunner {
        async fn run(&self, _command: &CommandSpec) -> Result<CommandOutput, RunnerError> {
            (self.result)()
        }
    }

    fn primary_job() -> Job {
        Job::from_entry(&MatrixEntry::new("3.10"), "3.10", "HEAD")
    }

    fn secondary_job() -> Job {
        Job::from_entry(&MatrixEntry::new("3.7"), "3.10", "HEAD")
    }

    #[tokio::test]
    async fn test_successful_step() {
        let executor = StepExecutor::new(FixedRunner {
            result: || Ok(CommandOutput::success()),
        });
        let job = primary_job();
        let step = job.step(StepKind::Test).unwrap();

        let outcome = executor.execute(&job, step).await;
        assert!(matches!(outcome, StepOutcome::Succeeded { .. }));
    }

    #[tokio::test]
    async fn test_failing_step_carries_exit_code() {
        let executor = StepExecutor::new(FixedRunner {
            result: || Ok(CommandOutput::failure(2, "assertion failed")),
        });
        let job = primary_job();
        let step = job.step(StepKind::Test).unwrap();

        match executor.execute(&job, step).await {
            StepOutcome::Failed(failure) => {
                assert_eq!(failure.kind, StepKind::Test);
                assert_eq!(failure.exit_code, 2);
                assert_eq!(failure.stderr, "assertion failed");
            }
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_conditional_step_skipped_on_secondary_runtime() {
        let executor = StepExecutor::new(FixedRunner {
            // Would fail loudly if the command were ever spawned
            result: || panic!("conditional step must not spawn"),
        });
        let job = secondary_job();
        let step = job.step(StepKind::Docs).unwrap();

        match executor.execute(&job, step).await {
            StepOutcome::Skipped { reason } => {
                assert!(reason.contains("primary"));
            }
            other => panic!("Expected skip, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_conditional_step_runs_on_primary_runtime() {
        let executor = StepExecutor::new(FixedRunner {
            result: || Ok(CommandOutput::success()),
        });
        let job = primary_job();
        let step = job.step(StepKind::Pep8).unwrap();

        assert!(matches!(
            executor.execute(&job, step).await,
            StepOutcome::Succeeded { .. }
        ));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_conventional_exit_code() {
        let executor = StepExecutor::new(FixedRunner {
            result: || Err(RunnerError::Timeout(30)),
        });
        let job = primary_job();
        let step = job.step(StepKind::Checkout).unwrap();

        match executor.execute(&job, step).await {
            StepOutcome::Failed(failure) => {
                assert_eq!(failure.exit_code, TIMEOUT_EXIT_CODE);
                assert_eq!(failure.kind, StepKind::Checkout);
            }
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawn_error_maps_to_conventional_exit_code() {
        let executor = StepExecutor::new(FixedRunner {
            result: || {
                Err(RunnerError::Spawn {
                    program: "pyenv".to_string(),
                    message: "not found".to_string(),
                })
            },
        });
        let job = primary_job();
        let step = job.step(StepKind::Provision).unwrap();

        match executor.execute(&job, step).await {
            StepOutcome::Failed(failure) => {
                assert_eq!(failure.exit_code, SPAWN_EXIT_CODE);
                assert!(failure.stderr.contains("pyenv"));
            }
            other => panic!("Expected failure, got {:?}", other),
        }
    }
}
