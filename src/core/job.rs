//! Job and step domain model
//!
//! A job is one matrix-expanded instantiation of the fixed step template.
//! The template itself is not configurable: matrix values are substituted
//! into it, nothing else.

use crate::core::{matrix::MatrixEntry, state::StepState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a step, which doubles as its failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Check out the triggering revision
    Checkout,
    /// Provision the runtime matching the matrix entry
    Provision,
    /// Bootstrap the package manager and install the tool set
    Install,
    /// Run the test environment runner
    Test,
    /// Build the documentation (primary runtime only)
    Docs,
    /// Run the style/lint check (primary runtime only)
    Pep8,
    /// Upload the coverage report (primary runtime only)
    Upload,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Checkout => "checkout",
            StepKind::Provision => "provision",
            StepKind::Install => "install",
            StepKind::Test => "test",
            StepKind::Docs => "docs",
            StepKind::Pep8 => "pep8",
            StepKind::Upload => "upload",
        };
        write!(f, "{}", name)
    }
}

/// An external command invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The full command line for display and logging
    pub fn display_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_line())
    }
}

/// Predicate gating a conditional step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Only run when the job's runtime is the designated primary version
    PrimaryRuntime,
}

impl Condition {
    /// Evaluate the predicate for a job
    pub fn holds(&self, job: &Job) -> bool {
        match self {
            Condition::PrimaryRuntime => job.primary,
        }
    }

    /// Human-readable reason used when the predicate does not hold
    pub fn skip_reason(&self) -> &'static str {
        match self {
            Condition::PrimaryRuntime => "runtime is not the primary version",
        }
    }
}

/// One external command invocation within a job
#[derive(Debug, Clone)]
pub struct Step {
    pub kind: StepKind,
    pub command: CommandSpec,
    pub condition: Option<Condition>,
    pub state: StepState,
}

impl Step {
    fn new(kind: StepKind, command: CommandSpec) -> Self {
        Self {
            kind,
            command,
            condition: None,
            state: StepState::Pending,
        }
    }

    fn gated(kind: StepKind, command: CommandSpec, condition: Condition) -> Self {
        Self {
            kind,
            command,
            condition: Some(condition),
            state: StepState::Pending,
        }
    }
}

/// One independent sequential execution of the step template
#[derive(Debug, Clone)]
pub struct Job {
    /// Job identifier, e.g. "py3.10"
    pub id: String,

    /// Interpreter version this job provisions
    pub runtime: String,

    /// Test environment label this job selects
    pub test_env: String,

    /// Whether this job's runtime is the designated primary version
    pub primary: bool,

    /// Ordered steps; failure of one aborts the rest
    pub steps: Vec<Step>,
}

impl Job {
    /// Build a job from a matrix entry by substituting its values into
    /// the fixed step template
    pub fn from_entry(entry: &MatrixEntry, primary_runtime: &str, revision: &str) -> Self {
        let test_env = entry.test_env().to_string();

        let steps = vec![
            Step::new(
                StepKind::Checkout,
                CommandSpec::new("git", ["checkout", "--detach", revision]),
            ),
            Step::new(
                StepKind::Provision,
                CommandSpec::new("pyenv", ["install", "--skip-existing", entry.runtime.as_str()]),
            ),
            Step::new(
                StepKind::Install,
                CommandSpec::new("pip", ["install", "--upgrade", "pip", "tox", "codecov"]),
            ),
            Step::new(
                StepKind::Test,
                CommandSpec::new("tox", ["-e", test_env.as_str()]),
            ),
            Step::gated(
                StepKind::Docs,
                CommandSpec::new("tox", ["-e", "docs"]),
                Condition::PrimaryRuntime,
            ),
            Step::gated(
                StepKind::Pep8,
                CommandSpec::new("tox", ["-e", "pep8"]),
                Condition::PrimaryRuntime,
            ),
            Step::gated(
                StepKind::Upload,
                CommandSpec::new("codecov", Vec::<String>::new()),
                Condition::PrimaryRuntime,
            ),
        ];

        Job {
            id: entry.job_id(),
            runtime: entry.runtime.clone(),
            test_env,
            primary: entry.runtime == primary_runtime,
            steps,
        }
    }

    /// Get a step by kind
    pub fn step(&self, kind: StepKind) -> Option<&Step> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    /// The steps this job would actually invoke, before running anything
    ///
    /// Conditional steps whose predicate does not hold are excluded.
    pub fn planned_steps(&self) -> Vec<&Step> {
        self.steps
            .iter()
            .filter(|s| s.condition.map_or(true, |c| c.holds(self)))
            .collect()
    }

    /// Check if every step reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.state.is_terminal())
    }

    /// Check if any step failed
    pub fn has_failed(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s.state, StepState::Failed { .. }))
    }
}
