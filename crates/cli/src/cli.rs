//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Failover - sticky-failover dispatch over configured source groups
#[derive(Parser, Debug)]
#[command(
    name = "failover",
    author,
    version,
    about = "Sticky-failover dispatch over configured source groups",
    long_about = "Loads source groups and retry policy from a config file.\n\n\
                  Validates the file, describes its groups, and simulates dispatch \n\
                  rounds with chosen sources failing."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FAILOVER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FAILOVER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration file
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Run a dispatch round against a group with simulated failures
    Simulate(SimulateArgs),
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "failover.toml", env = "FAILOVER_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "failover.toml", env = "FAILOVER_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "failover.toml", env = "FAILOVER_CONFIG")]
    pub config: PathBuf,

    /// Group to dispatch over
    #[arg(short, long)]
    pub group: String,

    /// Sources that fail every attempt (repeatable)
    #[arg(long = "fail", value_name = "SOURCE")]
    pub fail: Vec<String>,

    /// Pass cap; makes the round continuous (default: the group's own policy)
    #[arg(long)]
    pub passes: Option<u64>,

    /// Override the retry interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Use the async dispatch path (Ctrl+C cancels during backoff)
    #[arg(long = "async")]
    pub use_async: bool,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "FAILOVER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Output trace and report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
