//! conveyor - a matrix CI workflow runner

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod runner;

// Re-export commonly used types
pub use core::{EventKind, Job, MatrixEntry, RunStatus, Step, StepKind, StepState, Trigger, TriggerEvent, Workflow, WorkflowConfig};
pub use execution::{JobReport, RunEvent, RunReport, SchedulingStrategy, StepFailure, WorkflowEngine};
pub use runner::{CommandOutput, CommandRunner, RunnerError, ShellRunner};
