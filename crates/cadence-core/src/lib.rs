//! # Cadence Core
//!
//! The job model behind the Cadence scheduler:
//!
//! - [`Job`]: a named unit of work with a schedule, retry policy, priority,
//!   lifecycle hooks, middleware and a status machine
//! - [`JobBuilder`]: fluent construction with deferred validation
//! - [`ScheduleBuilder`]: recurrence rules rendered into a [`ScheduleDescriptor`]
//! - [`CronExpression`]: validated five-field cron expressions
//! - [`RetryPolicy`] / [`RetryExecutor`]: fixed or exponential retries
//! - [`MiddlewarePipeline`]: layers wrapped around every attempt
//! - [`LifecycleHooks`]: per-event async callbacks
//!
//! Nothing in this crate owns a timer; driving jobs on their schedule is the
//! job of `cadence-scheduler`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use cadence_core::{JobBuilder, RetryStrategy, TaskError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let job = JobBuilder::new()
//!         .with_name("cleanup")
//!         .with_task_fn(|| async { Err(TaskError::new("disk busy")) })
//!         .with_schedule("*/10 * * * *")
//!         .with_max_retries(3)
//!         .with_retry_delay(Duration::from_millis(500))
//!         .use_retry_strategy(RetryStrategy::Exponential)
//!         .build()?;
//!
//!     let outcome = job.execute().await?;
//!     println!("{} -> {:?}", job.name(), outcome);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod cron;
pub mod error;
pub mod hooks;
pub mod job;
pub mod middleware;
pub mod retry;
pub mod schedule;
pub mod task;

pub use builder::{IntoSchedule, JobBuilder};
pub use cron::CronExpression;
pub use error::{HookError, JobError, ScheduleValidationError, TaskError, TaskResult};
pub use hooks::{Hook, HookContext, HookEvent, LifecycleHooks, hook_fn};
pub use job::{ExecutionOutcome, Job, JobOptions, JobStats, JobStatus, OverlapPolicy};
pub use middleware::{
    LoggingMiddleware, Middleware, MiddlewareContext, MiddlewarePipeline, Next, TimingMiddleware,
};
pub use retry::{RetryExecutor, RetryPolicy, RetryStrategy};
pub use schedule::{Exclusion, Recurrence, ScheduleBuilder, ScheduleDescriptor, TimeOfDay};
pub use task::{Task, task_fn};

/// Re-exported so callers can name time zones without another dependency.
pub use chrono_tz::Tz;
