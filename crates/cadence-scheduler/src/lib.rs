//! # Cadence Scheduler
//!
//! Drives [`cadence_core::Job`]s on their cron schedules.
//!
//! ```text
//! ┌───────────────┐  schedule()   ┌──────────────────┐
//! │   Scheduler   │──────────────▶│  TimerFacility   │
//! │ (name → job)  │               │ (cron → callback)│
//! └──────┬────────┘               └────────┬─────────┘
//!        │ owns                            │ fires
//! ┌──────▼────────┐   execute()   ┌────────▼─────────┐
//! │   JobRunner   │◀──────────────│   TimerCallback  │
//! │ overlap/skip  │               └──────────────────┘
//! └──────┬────────┘
//!        │ publish()
//! ┌──────▼────────┐
//! │ EventPublisher│  taskAdded, taskSuccess, taskError, ...
//! └───────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`Scheduler`]: job registry, timer binding and graceful shutdown
//! - [`JobRunner`]: overlap policy and outcome-to-event mapping per fire
//! - [`TimerFacility`]: [`CronTimerFacility`] for production,
//!   [`ManualTimerFacility`] for tests
//! - [`SchedulerEvent`] / [`BroadcastEventBus`]: lifecycle notifications
//!
//! ## Example
//!
//! ```rust,no_run
//! use cadence_core::JobBuilder;
//! use cadence_scheduler::{Scheduler, SchedulerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = Scheduler::new(SchedulerConfig::default());
//!     let mut events = scheduler.subscribe().expect("bus attached");
//!
//!     let job = JobBuilder::new()
//!         .with_name("heartbeat")
//!         .with_task_fn(|| async { Ok(()) })
//!         .with_schedule("* * * * *")
//!         .build()?;
//!     scheduler.add_job(job).await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{} {}", event.name(), event.job_name());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod runner;
pub mod scheduler;
pub mod timer;

pub use config::SchedulerConfig;
pub use error::{SchedulerError, TimerError};
pub use events::{
    BroadcastEventBus, EventPublisher, EventSubscriber, NoopPublisher, SchedulerEvent, SkipReason,
};
pub use runner::{JobRunner, RunReport};
pub use scheduler::{JobHandle, Scheduler, SchedulerState};
pub use timer::{
    CronTimer, CronTimerFacility, ManualTimer, ManualTimerFacility, TimerCallback, TimerFacility,
    TimerHandle,
};
