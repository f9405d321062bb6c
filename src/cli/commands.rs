//! CLI command definitions

use crate::core::EventKind;
use crate::execution::SchedulingStrategy;
use clap::Args;

/// Run a workflow for an incoming event
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to workflow YAML file
    #[arg(short, long)]
    pub file: String,

    /// Event kind that triggered the run
    #[arg(long, value_enum)]
    pub event: EventArg,

    /// Branch the event refers to
    #[arg(long)]
    pub branch: String,

    /// Revision to check out
    #[arg(long, default_value = "HEAD")]
    pub revision: String,

    /// Only run the matrix entry for this runtime version
    #[arg(long)]
    pub runtime: Option<String>,

    /// Scheduling strategy for matrix jobs
    #[arg(long, value_enum, default_value_t = SchedulingStrategyArg::Parallel)]
    pub strategy: SchedulingStrategyArg,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,
}

/// Show the planned step sequence per job
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Path to workflow YAML file
    #[arg(short, long)]
    pub file: String,

    /// Revision to substitute into the checkout step
    #[arg(long, default_value = "HEAD")]
    pub revision: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate a workflow configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to workflow YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List workflows with stored runs
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Show run counts
    #[arg(long)]
    pub with_counts: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Workflow name to filter by
    #[arg(short, long)]
    pub workflow: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show full details
    #[arg(long)]
    pub details: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a specific run by ID
    #[arg(long)]
    pub run_id: Option<String>,
}

/// Event kind argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventArg {
    Push,
    #[clap(name = "pull-request")]
    PullRequest,
}

impl From<EventArg> for EventKind {
    fn from(arg: EventArg) -> Self {
        match arg {
            EventArg::Push => EventKind::Push,
            EventArg::PullRequest => EventKind::PullRequest,
        }
    }
}

/// Scheduling strategy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchedulingStrategyArg {
    Sequential,
    Parallel,
    #[clap(name = "parallel-limited")]
    ParallelLimited,
}

impl From<SchedulingStrategyArg> for SchedulingStrategy {
    fn from(arg: SchedulingStrategyArg) -> Self {
        match arg {
            SchedulingStrategyArg::Sequential => SchedulingStrategy::Sequential,
            SchedulingStrategyArg::Parallel => SchedulingStrategy::Parallel,
            SchedulingStrategyArg::ParallelLimited => SchedulingStrategy::LimitedParallel(4),
        }
    }
}
