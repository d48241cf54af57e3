//! The scheduler: registry of jobs bound to timers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use cadence_core::{CronExpression, HookEvent, Job, JobStatus};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::events::{BroadcastEventBus, EventPublisher, EventSubscriber, SchedulerEvent};
use crate::runner::{JobRunner, RunReport};
use crate::timer::{CronTimerFacility, TimerCallback, TimerFacility, TimerHandle};

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    /// Accepting jobs and firing timers.
    Running = 0,
    /// Timers stopped, waiting for in-flight runs.
    ShuttingDown = 1,
    /// Drained.
    Stopped = 2,
}

impl From<u8> for SchedulerState {
    fn from(v: u8) -> Self {
        match v {
            0 => SchedulerState::Running,
            1 => SchedulerState::ShuttingDown,
            _ => SchedulerState::Stopped,
        }
    }
}

/// Caller-side handle to a registered job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    job: Arc<Job>,
}

impl JobHandle {
    pub fn name(&self) -> &str {
        self.job.name()
    }

    pub fn status(&self) -> JobStatus {
        self.job.status()
    }

    pub fn job(&self) -> &Arc<Job> {
        &self.job
    }
}

struct JobEntry {
    job: Arc<Job>,
    runner: Arc<JobRunner>,
    timer: Arc<dyn TimerHandle>,
}

/// Owns every registered job and the timer driving it.
///
/// Jobs are keyed by name. Each entry pairs the job with a [`JobRunner`]
/// and a timer whose callback invokes that runner.
pub struct Scheduler {
    config: SchedulerConfig,
    jobs: DashMap<String, JobEntry>,
    timers: Arc<dyn TimerFacility>,
    events: Arc<dyn EventPublisher>,
    subscriber: Option<Arc<dyn EventSubscriber>>,
    state: AtomicU8,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Scheduler {
    /// Scheduler with tokio-driven cron timers and a broadcast event bus.
    pub fn new(config: SchedulerConfig) -> Self {
        let bus = Arc::new(BroadcastEventBus::new(config.event_capacity));
        let mut scheduler = Self::with_components(config, Arc::new(CronTimerFacility::new()), bus.clone());
        scheduler.subscriber = Some(bus);
        scheduler
    }

    /// Scheduler with injected timer facility and event publisher.
    pub fn with_components(
        config: SchedulerConfig,
        timers: Arc<dyn TimerFacility>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            jobs: DashMap::new(),
            timers,
            events,
            subscriber: None,
            state: AtomicU8::new(SchedulerState::Running as u8),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Attach a subscriber so [`Scheduler::subscribe`] works with injected
    /// publishers.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from(self.state.load(Ordering::SeqCst))
    }

    /// Receive scheduler events, when a subscriber is available.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<SchedulerEvent>> {
        self.subscriber.as_ref().map(|s| s.subscribe())
    }

    /// Register a job and start its timer.
    ///
    /// Runs the job's `onInitialize` hooks first; a hook failure leaves the
    /// job unregistered. A name that is already registered is logged and
    /// rejected without touching the existing entry.
    pub async fn add_job(&self, job: Job) -> Result<JobHandle, SchedulerError> {
        if self.state() != SchedulerState::Running {
            return Err(SchedulerError::ShuttingDown);
        }

        let name = job.name().to_string();
        if self.jobs.contains_key(&name) {
            warn!(job = %name, "Job already registered, ignoring duplicate");
            return Err(SchedulerError::DuplicateJob(name));
        }

        let job = Arc::new(job);
        job.hooks()
            .execute(&job.hook_context(HookEvent::Initialize, 0, None))
            .await?;

        let cron = job
            .cron()
            .ok_or(cadence_core::ScheduleValidationError::MissingRecurrence)?;
        let overlap = job.overlap_policy().unwrap_or(self.config.default_overlap);
        let runner = Arc::new(JobRunner::new(
            job.clone(),
            self.events.clone(),
            overlap,
            self.shutdown.clone(),
        ));
        let timer = self.timers.schedule(
            &name,
            &cron,
            job.schedule().time_zone(),
            self.timer_callback(&runner),
            false,
        )?;

        match self.jobs.entry(name.clone()) {
            Entry::Occupied(_) => {
                warn!(job = %name, "Job already registered, ignoring duplicate");
                return Err(SchedulerError::DuplicateJob(name));
            }
            Entry::Vacant(slot) => {
                slot.insert(JobEntry {
                    job: job.clone(),
                    runner,
                    timer: timer.clone(),
                });
            }
        }

        info!(job = %name, schedule = %cron, priority = job.priority(), "Job added");
        self.events.publish(SchedulerEvent::TaskAdded { name });
        timer.start();

        Ok(JobHandle { job })
    }

    /// Stop and unregister a job.
    pub fn remove_job(&self, name: &str) -> Option<Arc<Job>> {
        let Some((_, entry)) = self.jobs.remove(name) else {
            warn!(job = %name, "Job not found");
            return None;
        };
        entry.timer.stop();
        info!(job = %name, "Job removed");
        self.events.publish(SchedulerEvent::TaskRemoved {
            name: name.to_string(),
        });
        Some(entry.job)
    }

    /// Restart a job's timer.
    pub fn start_job(&self, name: &str) -> bool {
        match self.jobs.get(name) {
            Some(entry) => {
                entry.timer.start();
                debug!(job = %name, "Job timer started");
                true
            }
            None => {
                warn!(job = %name, "Job not found");
                false
            }
        }
    }

    /// Stop a job's timer. Runs already in flight continue.
    pub fn stop_job(&self, name: &str) -> bool {
        match self.jobs.get(name) {
            Some(entry) => {
                entry.timer.stop();
                debug!(job = %name, "Job timer stopped");
                true
            }
            None => {
                warn!(job = %name, "Job not found");
                false
            }
        }
    }

    /// Move a job to a new cron expression.
    ///
    /// The expression is validated before anything changes, so a bad
    /// expression leaves the job on its old schedule. Returns `Ok(false)`
    /// for an unknown job.
    pub fn reschedule_job(&self, name: &str, new_schedule: &str) -> Result<bool, SchedulerError> {
        let expression = CronExpression::parse(new_schedule)?;

        let Some(mut entry) = self.jobs.get_mut(name) else {
            warn!(job = %name, "Job not found");
            return Ok(false);
        };

        let timer = self.timers.schedule(
            name,
            &expression,
            entry.job.schedule().time_zone(),
            self.timer_callback(&entry.runner),
            false,
        )?;
        entry.timer.stop();
        entry.job.set_cron(expression.clone());
        entry.timer = timer.clone();
        drop(entry);

        info!(job = %name, schedule = %expression, "Job rescheduled");
        self.events.publish(SchedulerEvent::TaskRescheduled {
            name: name.to_string(),
            new_schedule: expression.to_string(),
        });
        timer.start();
        Ok(true)
    }

    /// Fire a job now, outside its schedule, and wait for the result.
    pub async fn trigger_job(&self, name: &str) -> Option<RunReport> {
        let runner = match self.jobs.get(name) {
            Some(entry) => entry.runner.clone(),
            None => {
                warn!(job = %name, "Job not found");
                return None;
            }
        };
        Some(self.tracker.track_future(async move { runner.fire().await }).await)
    }

    pub fn get_job(&self, name: &str) -> Option<Arc<Job>> {
        self.jobs.get(name).map(|e| e.job.clone())
    }

    pub fn job_exists(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Jobs ordered by descending priority, then name.
    pub fn jobs_by_priority(&self) -> Vec<Arc<Job>> {
        let mut jobs: Vec<Arc<Job>> = self.jobs.iter().map(|e| e.job.clone()).collect();
        jobs.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.name().cmp(b.name()))
        });
        jobs
    }

    /// Next fire time of a running job's timer.
    pub fn next_fire_time(&self, name: &str) -> Option<DateTime<Utc>> {
        self.jobs.get(name).and_then(|e| e.timer.next_fire_time())
    }

    pub fn is_timer_running(&self, name: &str) -> bool {
        self.jobs.get(name).is_some_and(|e| e.timer.is_running())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Runs currently executing.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Start every timer.
    pub fn start(&self) {
        for entry in self.jobs.iter() {
            entry.timer.start();
        }
        info!(jobs = self.jobs.len(), "Scheduler timers started");
    }

    /// Stop every timer without unregistering any job.
    pub fn stop_all(&self) {
        for entry in self.jobs.iter() {
            entry.timer.stop();
        }
        info!(jobs = self.jobs.len(), "Scheduler timers stopped");
    }

    /// Stop all timers, reject new work and wait for in-flight runs.
    ///
    /// Returns `true` when every run finished within the configured timeout.
    pub async fn shutdown(&self) -> bool {
        if self
            .state
            .compare_exchange(
                SchedulerState::Running as u8,
                SchedulerState::ShuttingDown as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            debug!(state = ?self.state(), "Shutdown already requested");
            return self.tracker.is_empty();
        }

        info!(in_flight = self.tracker.len(), "Scheduler shutting down");
        self.stop_all();
        self.shutdown.cancel();
        self.tracker.close();

        let timeout = self.config.shutdown_timeout();
        let drained = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        if drained {
            info!("Scheduler stopped");
        } else {
            warn!(
                in_flight = self.tracker.len(),
                timeout_secs = timeout.as_secs(),
                "Shutdown timed out with runs still in flight"
            );
        }
        self.state.store(SchedulerState::Stopped as u8, Ordering::SeqCst);
        drained
    }

    fn timer_callback(&self, runner: &Arc<JobRunner>) -> TimerCallback {
        let runner = runner.clone();
        let tracker = self.tracker.clone();
        Arc::new(move || {
            let runner = runner.clone();
            tracker
                .track_future(async move {
                    runner.fire().await;
                })
                .boxed()
        })
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
