//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: generate tasks, schedule them, print the ledger
//! - config: print the effective configuration

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// hetsched - priority scheduling across CPU-like and GPU-like queues
#[derive(Parser, Debug)]
#[command(name = "hetsched")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output; raises the log level to debug
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduling simulation (default)
    Run(RunArgs),

    /// Print the effective configuration as YAML
    Config,
}

/// Overrides for a simulation run; unset values come from the config file
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Number of tasks to generate
    #[arg(short = 'n', long)]
    pub tasks: Option<usize>,

    /// Seed for the task generator
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Capacity of each resource queue
    #[arg(short = 'q', long)]
    pub queue_capacity: Option<usize>,

    /// Worker units on the CPU-like queue
    #[arg(long)]
    pub cpu_workers: Option<usize>,

    /// Worker units on the GPU-like queue
    #[arg(long)]
    pub gpu_workers: Option<usize>,

    /// Print the ledger as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}
