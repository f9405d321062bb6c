//! Workflow execution

pub mod engine;
pub mod executor;

pub use engine::{EventHandler, JobReport, RunEvent, RunReport, SchedulingStrategy, WorkflowEngine};
pub use executor::{StepExecutor, StepFailure, StepOutcome};
