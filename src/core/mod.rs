//! Core domain models

pub mod config;
pub mod job;
pub mod matrix;
pub mod state;
pub mod trigger;
pub mod workflow;

pub use config::WorkflowConfig;
pub use job::{CommandSpec, Condition, Job, Step, StepKind};
pub use matrix::{MatrixEntry, DEFAULT_TEST_ENV};
pub use state::{RunState, RunStatus, StepState};
pub use trigger::{BranchPattern, EventKind, Trigger, TriggerEvent};
pub use workflow::Workflow;
