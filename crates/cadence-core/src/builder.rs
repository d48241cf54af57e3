//! Fluent job construction.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cron::CronExpression;
use crate::error::{JobError, ScheduleValidationError, TaskResult};
use crate::hooks::{Hook, HookEvent};
use crate::job::{Job, JobOptions, OverlapPolicy};
use crate::middleware::Middleware;
use crate::retry::{RetryPolicy, RetryStrategy};
use crate::schedule::{ScheduleBuilder, ScheduleDescriptor};
use crate::task::{Task, task_fn};

/// Anything that can become a job schedule.
pub trait IntoSchedule {
    fn into_schedule(self) -> Result<ScheduleDescriptor, ScheduleValidationError>;
}

impl IntoSchedule for &str {
    fn into_schedule(self) -> Result<ScheduleDescriptor, ScheduleValidationError> {
        ScheduleDescriptor::from_cron(self)
    }
}

impl IntoSchedule for String {
    fn into_schedule(self) -> Result<ScheduleDescriptor, ScheduleValidationError> {
        ScheduleDescriptor::from_cron(&self)
    }
}

impl IntoSchedule for CronExpression {
    fn into_schedule(self) -> Result<ScheduleDescriptor, ScheduleValidationError> {
        Ok(self.into())
    }
}

impl IntoSchedule for ScheduleDescriptor {
    fn into_schedule(self) -> Result<ScheduleDescriptor, ScheduleValidationError> {
        Ok(self)
    }
}

impl IntoSchedule for ScheduleBuilder {
    fn into_schedule(self) -> Result<ScheduleDescriptor, ScheduleValidationError> {
        self.to_config()
    }
}

/// Builder for [`Job`].
///
/// Name, task and schedule are required; everything else has a default.
/// Schedule errors are held until [`JobBuilder::build`].
///
/// ```rust
/// use std::time::Duration;
/// use cadence_core::{JobBuilder, RetryStrategy};
///
/// let job = JobBuilder::new()
///     .with_name("nightly-sync")
///     .with_task_fn(|| async { Ok(()) })
///     .with_schedule("0 2 * * *")
///     .with_max_retries(2)
///     .with_retry_delay(Duration::from_millis(10))
///     .use_retry_strategy(RetryStrategy::Fixed)
///     .build()
///     .unwrap();
/// assert_eq!(job.name(), "nightly-sync");
/// ```
#[derive(Default)]
pub struct JobBuilder {
    name: Option<String>,
    task: Option<Arc<dyn Task>>,
    schedule: Option<Result<ScheduleDescriptor, ScheduleValidationError>>,
    hooks: Vec<(HookEvent, Arc<dyn Hook>)>,
    priority: i32,
    retry: RetryPolicy,
    middleware: Vec<Arc<dyn Middleware>>,
    overlap: Option<OverlapPolicy>,
    reset_retries_each_cycle: bool,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_task(mut self, task: Arc<dyn Task>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn with_task_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        self.with_task(task_fn(f))
    }

    pub fn with_schedule(mut self, schedule: impl IntoSchedule) -> Self {
        self.schedule = Some(schedule.into_schedule());
        self
    }

    /// Append a hook; repeated calls for the same event stack up.
    pub fn with_hook(mut self, event: HookEvent, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push((event, hook));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn use_retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry.strategy = strategy;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn use_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap = Some(policy);
        self
    }

    /// Give every cycle a fresh retry budget.
    pub fn reset_retries_each_cycle(mut self, reset: bool) -> Self {
        self.reset_retries_each_cycle = reset;
        self
    }

    pub fn build(self) -> Result<Job, JobError> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.task.is_none() {
            missing.push("task");
        }
        if self.schedule.is_none() {
            missing.push("schedule");
        }

        let (Some(name), Some(task), Some(schedule)) = (self.name, self.task, self.schedule) else {
            return Err(JobError::Configuration(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        };

        Job::new(JobOptions {
            name,
            task,
            schedule: schedule?,
            hooks: self.hooks,
            priority: self.priority,
            retry: self.retry,
            middleware: self.middleware,
            overlap: self.overlap,
            reset_retries_each_cycle: self.reset_retries_each_cycle,
        })
    }
}
