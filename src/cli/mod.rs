//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{HistoryCommand, ListCommand, PlanCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Matrix CI workflow runner
#[derive(Debug, Parser, Clone)]
#[command(name = "conveyor")]
#[command(author = "Conveyor Contributors")]
#[command(version = "0.1.0")]
#[command(about = "A matrix CI workflow runner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a workflow for an incoming event
    Run(RunCommand),

    /// Show the step sequence each job would execute, without running
    Plan(PlanCommand),

    /// Validate a workflow configuration
    Validate(ValidateCommand),

    /// List workflows with stored runs
    List(ListCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
