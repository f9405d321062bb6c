//! Command runner - the seam between the engine and external tools

pub mod shell;

pub use shell::ShellRunner;

use crate::core::CommandSpec;
use async_trait::async_trait;
use thiserror::Error;

/// Error types for command execution
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("timed out after {0} seconds")]
    Timeout(u64),

    #[error("command produced invalid utf-8 output")]
    InvalidOutput,
}

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the process
    pub exit_code: i32,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Convenience constructor for a clean exit
    pub fn success() -> Self {
        Self {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Convenience constructor for a failing exit
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Check if the command exited cleanly
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait for spawning external commands - allows mock implementations in tests
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion and capture its output
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, RunnerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_success() {
        assert!(CommandOutput::success().is_success());
        assert!(!CommandOutput::failure(2, "boom").is_success());
    }

    #[test]
    fn test_runner_error_display() {
        let err = RunnerError::Spawn {
            program: "tox".to_string(),
            message: "No such file or directory".to_string(),
        };
        assert!(err.to_string().contains("tox"));
        assert_eq!(RunnerError::Timeout(30).to_string(), "timed out after 30 seconds");
    }
}
