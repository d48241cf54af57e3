//! Per-job runner invoked by the job's timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cadence_core::{ExecutionOutcome, HookEvent, Job, OverlapPolicy, TaskError};
use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::events::{EventPublisher, SchedulerEvent, SkipReason};

/// What a single fire did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "result")]
pub enum RunReport {
    Completed,
    Failed { error: String },
    Paused,
    Skipped { reason: SkipReason },
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunReport::Completed)
    }
}

/// Clears the in-flight flag when a run ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs one job when its timer fires.
///
/// Each fire goes through the same checks in order: scheduler shutdown,
/// schedule exclusions, then the overlap policy. Only then is the job
/// executed and the outcome published.
pub struct JobRunner {
    job: Arc<Job>,
    events: Arc<dyn EventPublisher>,
    overlap: OverlapPolicy,
    in_flight: AtomicBool,
    queue: tokio::sync::Mutex<()>,
    shutdown: CancellationToken,
}

impl JobRunner {
    pub fn new(
        job: Arc<Job>,
        events: Arc<dyn EventPublisher>,
        overlap: OverlapPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            job,
            events,
            overlap,
            in_flight: AtomicBool::new(false),
            queue: tokio::sync::Mutex::new(()),
            shutdown,
        }
    }

    pub fn job(&self) -> &Arc<Job> {
        &self.job
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.overlap
    }

    /// Whether a run is currently executing (tracked for `Skip` only).
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Handle one timer fire.
    pub async fn fire(&self) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("job_run", job = %self.job.name(), run_id = %run_id);
        self.fire_inner().instrument(span).await
    }

    async fn fire_inner(&self) -> RunReport {
        if self.shutdown.is_cancelled() {
            return self.skip(SkipReason::ShuttingDown);
        }

        if let Some(exclusion) = self.job.schedule().is_excluded(Utc::now()) {
            return self.skip(SkipReason::Excluded(exclusion.to_string()));
        }

        match self.overlap {
            OverlapPolicy::Allow => self.run().await,
            OverlapPolicy::Skip => {
                if self
                    .in_flight
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    return self.skip(SkipReason::AlreadyRunning);
                }
                let _guard = InFlight(&self.in_flight);
                self.run().await
            }
            OverlapPolicy::Queue => {
                let _turn = self.queue.lock().await;
                self.run().await
            }
        }
    }

    async fn run(&self) -> RunReport {
        let name = self.job.name().to_string();
        match self.job.execute().await {
            Ok(ExecutionOutcome::Completed) => {
                info!(job = %name, "Job run succeeded");
                self.events.publish(SchedulerEvent::TaskSucceeded { name });
                RunReport::Completed
            }
            Ok(ExecutionOutcome::Failed(e)) => {
                let error = e.to_string();
                self.events.publish(SchedulerEvent::TaskFailed {
                    name,
                    error: error.clone(),
                });
                RunReport::Failed { error }
            }
            Ok(ExecutionOutcome::Paused) => {
                info!(job = %name, "Job run paused");
                RunReport::Paused
            }
            Err(hook_error) => {
                let error = hook_error.to_string();
                error!(job = %name, error = %error, "Job run aborted by lifecycle hook");

                // Error hooks already ran when the failure came from them or
                // from the cycle-end hooks that follow a failed task.
                let error_hooks_ran = match hook_error.event {
                    HookEvent::Error => true,
                    HookEvent::CycleEnd => hook_error.task_failed,
                    _ => false,
                };
                if !error_hooks_ran {
                    let ctx = self.job.hook_context(
                        HookEvent::Error,
                        hook_error.attempt,
                        Some(TaskError::from_error(hook_error.clone())),
                    );
                    if let Err(e) = self.job.hooks().execute(&ctx).await {
                        warn!(job = %name, error = %e, "Error hook failed");
                    }
                }

                self.events.publish(SchedulerEvent::TaskFailed {
                    name,
                    error: error.clone(),
                });
                RunReport::Failed { error }
            }
        }
    }

    fn skip(&self, reason: SkipReason) -> RunReport {
        debug!(job = %self.job.name(), reason = %reason, "Skipping fire");
        self.events.publish(SchedulerEvent::TaskSkipped {
            name: self.job.name().to_string(),
            reason: reason.clone(),
        });
        RunReport::Skipped { reason }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
