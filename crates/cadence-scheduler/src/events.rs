//! Scheduler lifecycle events and the bus they are published to.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Why a fire did not run the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "detail")]
pub enum SkipReason {
    /// A previous run is still in flight and the job skips overlaps.
    AlreadyRunning,
    /// The fire fell on an excluded weekend day or holiday.
    Excluded(String),
    /// The scheduler is draining.
    ShuttingDown,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyRunning => f.write_str("previous run still in flight"),
            SkipReason::Excluded(why) => write!(f, "excluded: {}", why),
            SkipReason::ShuttingDown => f.write_str("scheduler shutting down"),
        }
    }
}

/// Events published by the scheduler. Serialised with an `event` tag
/// holding the event name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SchedulerEvent {
    #[serde(rename = "taskAdded")]
    TaskAdded { name: String },

    #[serde(rename = "taskRemoved")]
    TaskRemoved { name: String },

    #[serde(rename = "taskSuccess")]
    TaskSucceeded { name: String },

    #[serde(rename = "taskError")]
    TaskFailed { name: String, error: String },

    #[serde(rename = "taskRescheduled")]
    TaskRescheduled {
        name: String,
        #[serde(rename = "newSchedule")]
        new_schedule: String,
    },

    #[serde(rename = "taskSkipped")]
    TaskSkipped { name: String, reason: SkipReason },
}

impl SchedulerEvent {
    /// Event name as published on the bus.
    pub fn name(&self) -> &'static str {
        match self {
            SchedulerEvent::TaskAdded { .. } => "taskAdded",
            SchedulerEvent::TaskRemoved { .. } => "taskRemoved",
            SchedulerEvent::TaskSucceeded { .. } => "taskSuccess",
            SchedulerEvent::TaskFailed { .. } => "taskError",
            SchedulerEvent::TaskRescheduled { .. } => "taskRescheduled",
            SchedulerEvent::TaskSkipped { .. } => "taskSkipped",
        }
    }

    /// Name of the job the event is about.
    pub fn job_name(&self) -> &str {
        match self {
            SchedulerEvent::TaskAdded { name }
            | SchedulerEvent::TaskRemoved { name }
            | SchedulerEvent::TaskSucceeded { name }
            | SchedulerEvent::TaskFailed { name, .. }
            | SchedulerEvent::TaskRescheduled { name, .. }
            | SchedulerEvent::TaskSkipped { name, .. } => name,
        }
    }
}

/// Sink for scheduler events.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: SchedulerEvent);
}

/// Source of scheduler events.
pub trait EventSubscriber: Send + Sync {
    /// Every subscriber sees every event published after it subscribed.
    fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent>;
}

/// In-process fan-out bus on a tokio broadcast channel.
///
/// Slow subscribers lag and lose the oldest events rather than blocking
/// the scheduler.
#[derive(Clone)]
pub struct BroadcastEventBus {
    sender: broadcast::Sender<SchedulerEvent>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventPublisher for BroadcastEventBus {
    fn publish(&self, event: SchedulerEvent) {
        trace!(event = event.name(), job = event.job_name(), "Publishing event");
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }
}

impl EventSubscriber for BroadcastEventBus {
    fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.sender.subscribe()
    }
}

/// Publisher that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: SchedulerEvent) {}
}
