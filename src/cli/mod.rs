//! CLI module for hetsched - command-line interface and subcommands.
//!
//! Runs the scheduling simulation by default; `config` prints the effective
//! configuration.

pub mod commands;

pub use commands::Cli;
