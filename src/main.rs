//! Cadence - cron-driven job scheduler
//!
//! Main entry point for the Cadence CLI.

mod cli;
mod cmd_inspect;
mod cmd_run;
mod register;
mod shell;

use std::path::Path;

use clap::Parser;
use tracing::debug;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cadence_config::{ConfigLoader, LoggingConfig};

use crate::cli::{Cli, Commands};

/// Initialize tracing with console output and, when `[logging].directory`
/// is set, a daily rolling log file.
fn init_tracing(logging: &LoggingConfig, level: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    // --log-level, then RUST_LOG, then the config file.
    let env_filter = match level {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level)),
    }
    .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = if logging.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).with_ansi(true).boxed()
    };

    let file = match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(logging.file.as_str())
                .max_log_files(30)
                .build(Path::new(dir))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // The worker flushes until its guard is dropped.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            Some(if logging.json { layer.json().boxed() } else { layer.boxed() })
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(ConfigLoader::default_path);
    let config = ConfigLoader::load(&config_path)?;

    init_tracing(&config.logging, cli.log_level.as_deref())?;
    debug!(path = %config_path.display(), "Configuration loaded");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run::run(config).await,
        Commands::Validate => cmd_inspect::validate(&config),
        Commands::Next { count } => cmd_inspect::next(&config, count),
        Commands::Trigger { name } => cmd_inspect::trigger(&config, &name).await,
    }
}
