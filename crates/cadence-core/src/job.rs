//! The job entity and its status machine.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cron::CronExpression;
use crate::error::{HookError, JobError, ScheduleValidationError, TaskError};
use crate::hooks::{Hook, HookContext, HookEvent, LifecycleHooks};
use crate::middleware::{Middleware, MiddlewareContext, MiddlewarePipeline};
use crate::retry::{RetryPolicy, RetryStrategy};
use crate::schedule::ScheduleDescriptor;
use crate::task::Task;

/// Job status.
///
/// ```text
/// idle ──► running ──► completed
///            │  ▲  └──► error
///            ▼  │
///           paused
/// ```
///
/// `completed` and `error` move back to `running` on the next fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Running,
    Paused,
    Completed,
    Error,
}

impl JobStatus {
    /// Whether `self -> next` is an edge of the status machine.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Idle, Running)
                | (Running, Running)
                | (Running, Paused)
                | (Running, Completed)
                | (Running, Error)
                | (Paused, Running)
                | (Completed, Running)
                | (Error, Running)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens when a job fires while a previous run is still going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Run concurrently.
    Allow,
    /// Drop the new fire.
    #[default]
    Skip,
    /// Wait for the running one to finish.
    Queue,
}

/// Result of one execution cycle.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Completed,
    /// Retries exhausted; carries the last task error.
    Failed(TaskError),
    /// The job was paused mid-cycle.
    Paused,
}

impl ExecutionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed)
    }

    pub fn error(&self) -> Option<&TaskError> {
        match self {
            ExecutionOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Run bookkeeping.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    pub run_count: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Everything needed to construct a [`Job`] directly.
pub struct JobOptions {
    pub name: String,
    pub task: Arc<dyn Task>,
    pub schedule: ScheduleDescriptor,
    pub hooks: Vec<(HookEvent, Arc<dyn Hook>)>,
    pub priority: i32,
    pub retry: RetryPolicy,
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub overlap: Option<OverlapPolicy>,
    pub reset_retries_each_cycle: bool,
}

impl JobOptions {
    pub fn new(name: impl Into<String>, task: Arc<dyn Task>, schedule: ScheduleDescriptor) -> Self {
        Self {
            name: name.into(),
            task,
            schedule,
            hooks: Vec::new(),
            priority: 0,
            retry: RetryPolicy::default(),
            middleware: Vec::new(),
            overlap: None,
            reset_retries_each_cycle: false,
        }
    }
}

/// A named, scheduled unit of work.
///
/// All mutation goes through `&self` so a job can be shared between the
/// scheduler registry, its timer callback and callers holding a handle.
pub struct Job {
    name: String,
    priority: i32,
    overlap: Option<OverlapPolicy>,
    reset_retries_each_cycle: bool,
    task: RwLock<Arc<dyn Task>>,
    schedule: RwLock<ScheduleDescriptor>,
    retry_policy: RwLock<RetryPolicy>,
    middleware: RwLock<MiddlewarePipeline>,
    hooks: LifecycleHooks,
    status: Mutex<JobStatus>,
    retry_count: AtomicU32,
    runs: AtomicU64,
    last_run_at: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<TaskError>>,
}

impl Job {
    pub fn new(options: JobOptions) -> Result<Self, JobError> {
        let name = options.name.trim().to_string();
        if name.is_empty() {
            return Err(JobError::Configuration("job name must not be empty".to_string()));
        }
        if options.schedule.cron().is_none() {
            return Err(ScheduleValidationError::MissingRecurrence.into());
        }

        let hooks = LifecycleHooks::new();
        for (event, hook) in options.hooks {
            hooks.register(event, hook);
        }

        Ok(Self {
            name,
            priority: options.priority,
            overlap: options.overlap,
            reset_retries_each_cycle: options.reset_retries_each_cycle,
            task: RwLock::new(options.task),
            schedule: RwLock::new(options.schedule),
            retry_policy: RwLock::new(options.retry),
            middleware: RwLock::new(options.middleware.into_iter().collect()),
            hooks,
            status: Mutex::new(JobStatus::Idle),
            retry_count: AtomicU32::new(0),
            runs: AtomicU64::new(0),
            last_run_at: RwLock::new(None),
            last_error: RwLock::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn status(&self) -> JobStatus {
        *self.status.lock()
    }

    pub fn overlap_policy(&self) -> Option<OverlapPolicy> {
        self.overlap
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::SeqCst)
    }

    pub fn reset_retry_count(&self) {
        self.retry_count.store(0, Ordering::SeqCst);
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        *self.retry_policy.read()
    }

    pub fn set_retry_policy(&self, policy: RetryPolicy) {
        *self.retry_policy.write() = policy;
    }

    /// Change strategy, retry budget and base delay in one go.
    pub fn set_retry_strategy(&self, strategy: RetryStrategy, max_retries: u32, delay: std::time::Duration) {
        self.set_retry_policy(RetryPolicy::new(strategy, max_retries, delay));
    }

    pub fn schedule(&self) -> ScheduleDescriptor {
        self.schedule.read().clone()
    }

    /// The job's cron expression. Always present once constructed.
    pub fn cron(&self) -> Option<CronExpression> {
        self.schedule.read().cron().cloned()
    }

    /// Replace the cron expression, keeping time zone and exclusions.
    pub fn set_schedule(&self, expression: &str) -> Result<(), ScheduleValidationError> {
        let cron = CronExpression::parse(expression)?;
        self.set_cron(cron);
        Ok(())
    }

    pub fn set_cron(&self, cron: CronExpression) {
        let mut schedule = self.schedule.write();
        *schedule = schedule.clone().with_cron(cron);
    }

    /// Replace the whole descriptor. It must carry a cron expression.
    pub fn set_schedule_descriptor(
        &self,
        descriptor: ScheduleDescriptor,
    ) -> Result<(), ScheduleValidationError> {
        if descriptor.cron().is_none() {
            return Err(ScheduleValidationError::MissingRecurrence);
        }
        *self.schedule.write() = descriptor;
        Ok(())
    }

    pub fn set_task(&self, task: Arc<dyn Task>) {
        *self.task.write() = task;
    }

    pub fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }

    pub fn add_hook(&self, event: HookEvent, hook: Arc<dyn Hook>) {
        self.hooks.register(event, hook);
    }

    pub fn remove_hook(&self, event: HookEvent, hook: &Arc<dyn Hook>) -> bool {
        self.hooks.unregister(event, hook)
    }

    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.middleware.write().use_middleware(middleware);
    }

    pub fn middleware_count(&self) -> usize {
        self.middleware.read().len()
    }

    pub fn stats(&self) -> JobStats {
        JobStats {
            run_count: self.runs.load(Ordering::Relaxed),
            last_run_at: *self.last_run_at.read(),
            last_error: self.last_error.read().as_ref().map(|e| e.to_string()),
        }
    }

    pub fn last_error(&self) -> Option<TaskError> {
        self.last_error.read().clone()
    }

    /// Hook context for this job at the current retry count.
    pub fn hook_context(&self, event: HookEvent, attempt: u32, error: Option<TaskError>) -> HookContext {
        HookContext {
            job_name: self.name.clone(),
            event,
            attempt,
            retry_count: self.retry_count(),
            error,
        }
    }

    /// Pause a running job. Returns `false` in any other status.
    pub fn pause(&self) -> bool {
        let paused = self.transition_from(JobStatus::Running, JobStatus::Paused);
        if paused {
            info!(job = %self.name, "Job paused");
        }
        paused
    }

    /// Resume a paused job by running a fresh cycle from the top.
    ///
    /// Returns `Ok(None)` when the job was not paused.
    pub async fn resume(&self) -> Result<Option<ExecutionOutcome>, HookError> {
        if self.status() != JobStatus::Paused {
            return Ok(None);
        }
        info!(job = %self.name, "Job resumed");
        self.execute().await.map(Some)
    }

    /// Run one execution cycle: the task through the middleware chain,
    /// retried under the job's policy, with lifecycle hooks around it.
    ///
    /// Task failures are reported through [`ExecutionOutcome::Failed`]; a
    /// hook failure aborts the cycle and is returned as the error.
    pub async fn execute(&self) -> Result<ExecutionOutcome, HookError> {
        if self.reset_retries_each_cycle {
            self.reset_retry_count();
        }
        self.transition(JobStatus::Running);
        self.runs.fetch_add(1, Ordering::Relaxed);
        *self.last_run_at.write() = Some(Utc::now());

        let result = self.run_cycle().await;
        match &result {
            Ok(ExecutionOutcome::Failed(e)) => {
                *self.last_error.write() = Some(e.clone());
            }
            Err(e) => {
                // A cycle-end hook may fail after the cycle already completed.
                *self.status.lock() = JobStatus::Error;
                error!(job = %self.name, error = %e, "Lifecycle hook failed");
                *self.last_error.write() = Some(TaskError::from_error(e.clone()));
            }
            Ok(_) => {}
        }
        result
    }

    async fn run_cycle(&self) -> Result<ExecutionOutcome, HookError> {
        let policy = self.retry_policy();
        let task = self.task.read().clone();
        let pipeline = self.middleware.read().clone();
        let schedule = self.cron().map(|c| c.to_string()).unwrap_or_default();

        self.hooks
            .execute(&self.hook_context(HookEvent::CycleStart, 0, None))
            .await?;

        let mut attempt = 0u32;
        loop {
            if self.status() == JobStatus::Paused {
                return Ok(self.paused(attempt));
            }
            self.transition(JobStatus::Running);

            self.hooks
                .execute(&self.hook_context(HookEvent::Start, attempt, None))
                .await?;

            let ctx = MiddlewareContext {
                job_name: self.name.clone(),
                attempt,
                priority: self.priority,
                schedule: schedule.clone(),
            };
            let result = pipeline.execute(&ctx, task.as_ref()).await;

            if self.status() == JobStatus::Paused {
                return Ok(self.paused(attempt));
            }

            let error = match result {
                Ok(()) => {
                    self.hooks
                        .execute(&self.hook_context(HookEvent::Complete, attempt, None))
                        .await?;
                    self.transition(JobStatus::Completed);
                    self.hooks
                        .execute(&self.hook_context(HookEvent::CycleEnd, attempt, None))
                        .await?;
                    debug!(job = %self.name, attempt, "Job completed");
                    return Ok(ExecutionOutcome::Completed);
                }
                Err(error) => error,
            };

            let retries = self.retry_count();
            if retries < policy.max_retries {
                self.retry_count.fetch_add(1, Ordering::SeqCst);
                let delay = policy.delay_for(attempt);
                warn!(
                    job = %self.name,
                    retry = retries + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Job attempt failed, retrying"
                );
                self.hooks
                    .execute(&self.hook_context(HookEvent::Retry, attempt, Some(error)))
                    .await?;
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            self.transition(JobStatus::Error);
            error!(
                job = %self.name,
                retries,
                error = %error,
                "Job failed, retries exhausted"
            );
            self.hooks
                .execute(&self.hook_context(HookEvent::Error, attempt, Some(error.clone())))
                .await?;
            self.hooks
                .execute(&self.hook_context(HookEvent::CycleEnd, attempt, Some(error.clone())))
                .await?;
            return Ok(ExecutionOutcome::Failed(error));
        }
    }

    fn paused(&self, attempt: u32) -> ExecutionOutcome {
        debug!(job = %self.name, attempt, "Cycle stopped, job is paused");
        ExecutionOutcome::Paused
    }

    /// Apply `next` if it is a valid edge from the current status.
    fn transition(&self, next: JobStatus) -> bool {
        let mut status = self.status.lock();
        if status.can_transition_to(next) {
            *status = next;
            true
        } else {
            debug!(job = %self.name, from = %*status, to = %next, "Ignoring status transition");
            false
        }
    }

    fn transition_from(&self, expected: JobStatus, next: JobStatus) -> bool {
        let mut status = self.status.lock();
        if *status == expected {
            *status = next;
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("status", &self.status())
            .field("priority", &self.priority)
            .field("schedule", &*self.schedule.read())
            .field("retry_policy", &self.retry_policy())
            .field("retry_count", &self.retry_count())
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
