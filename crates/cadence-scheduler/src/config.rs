//! Configuration for the scheduler.

use std::time::Duration;

use cadence_core::OverlapPolicy;
use serde::{Deserialize, Serialize};

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Buffer size of the broadcast event bus.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// How long `shutdown` waits for in-flight runs.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Overlap policy for jobs that do not set one.
    #[serde(default)]
    pub default_overlap: OverlapPolicy,
}

fn default_event_capacity() -> usize {
    256
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            default_overlap: OverlapPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
