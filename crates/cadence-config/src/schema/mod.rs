//! Configuration schema definitions.

use cadence_core::OverlapPolicy;
use serde::{Deserialize, Serialize};

mod schema_jobs;

pub use schema_jobs::*;

pub(crate) fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

impl Config {
    /// Look up a job by name.
    pub fn job(&self, name: &str) -> Option<&JobConfig> {
        self.jobs.iter().find(|j| j.name == name)
    }

    /// Jobs with `enabled = true`.
    pub fn enabled_jobs(&self) -> impl Iterator<Item = &JobConfig> {
        self.jobs.iter().filter(|j| j.enabled)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for rolling log files. Console only when unset.
    #[serde(default)]
    pub directory: Option<String>,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// File name prefix inside `directory`.
    #[serde(default = "default_file")]
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            json: false,
            file: default_file(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file() -> String {
    "cadence.log".to_string()
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    /// IANA zone used by jobs that do not set their own.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    #[serde(default)]
    pub default_overlap: OverlapPolicy,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            event_capacity: default_event_capacity(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            default_overlap: OverlapPolicy::default(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_event_capacity() -> usize {
    256
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}
