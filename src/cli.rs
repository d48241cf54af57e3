//! CLI definitions for Cadence.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cadence CLI.
#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cron-driven job scheduler with retries, hooks and middleware")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: config/cadence.toml, then the
    /// user config directory)
    #[arg(short, long, env = "CADENCE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, overrides `[logging].level`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the scheduler in the foreground (default)
    Run,

    /// Check the configuration file and report problems
    Validate,

    /// Show upcoming fire times
    Next {
        /// Fire times per job
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },

    /// Run one job immediately and print the result
    Trigger {
        /// Job name
        name: String,
    },
}
