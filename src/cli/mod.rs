//! CLI module for ReelTrim
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{ResolveArgs, SimulateArgs};

/// ReelTrim bounded playback engine
///
/// Resolves media durations and replays trim sessions against simulated
/// players, printing the outcome as JSON.
#[derive(Parser, Debug)]
#[command(name = "reeltrim")]
#[command(about = "ReelTrim - Bounded playback and trim range engine")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (default: reeltrim.toml, then config/reeltrim.toml)
    #[arg(long, global = true, env = "REELTRIM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Minimum trim length in seconds
    #[arg(long, global = true)]
    pub min_gap: Option<f64>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the duration of a managed asset through the configured sources
    Resolve(args::ResolveArgs),
    /// Run a scripted trim session against a simulated player
    Simulate(args::SimulateArgs),
    /// Print the effective configuration as TOML
    Config,
}
