//! Shell runner - spawns the real external tools as subprocesses

use crate::core::CommandSpec;
use crate::runner::{CommandOutput, CommandRunner, RunnerError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Default per-command timeout (30 minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 1800;

/// Runs commands as real subprocesses
#[derive(Debug, Clone)]
pub struct ShellRunner {
    /// Working directory for spawned commands
    workdir: Option<PathBuf>,

    /// Timeout for command execution in seconds
    timeout_secs: u64,
}

impl ShellRunner {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            workdir: None,
            timeout_secs,
        }
    }

    /// Set the working directory for spawned commands
    pub fn with_workdir(mut self, workdir: PathBuf) -> Self {
        self.workdir = Some(workdir);
        self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_SECS)
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, RunnerError> {
        debug!("Spawning: {}", command.display_line());

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        let output = timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
            .map_err(|_| RunnerError::Timeout(self.timeout_secs))?
            .map_err(|e| RunnerError::Spawn {
                program: command.program.clone(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8(output.stdout).map_err(|_| RunnerError::InvalidOutput)?;
        let stderr = String::from_utf8(output.stderr).map_err(|_| RunnerError::InvalidOutput)?;

        // A killed process has no exit code; report it like a shell would
        let exit_code = output.status.code().unwrap_or(128);

        debug!(
            "'{}' exited with code {} ({} bytes stdout)",
            command.program,
            exit_code,
            stdout.len()
        );

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}
