//! Timer facility: binds a cron expression to a callback.
//!
//! [`CronTimerFacility`] drives timers on the tokio runtime.
//! [`ManualTimerFacility`] never fires on its own; tests fire its timers
//! explicitly.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cadence_core::CronExpression;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::TimerError;

#[path = "timer_manual.rs"]
mod manual;

pub use manual::{ManualTimer, ManualTimerFacility};

/// Callback invoked on every fire.
pub type TimerCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Creates timers.
pub trait TimerFacility: Send + Sync {
    /// Bind `expression` to `callback`. The timer starts stopped unless
    /// `start_immediately` is set.
    fn schedule(
        &self,
        id: &str,
        expression: &CronExpression,
        time_zone: Tz,
        callback: TimerCallback,
        start_immediately: bool,
    ) -> Result<Arc<dyn TimerHandle>, TimerError>;
}

/// Control over one timer. Dropping the last handle cancels the timer.
pub trait TimerHandle: Send + Sync {
    fn id(&self) -> &str;

    fn start(&self);

    fn stop(&self);

    fn is_running(&self) -> bool;

    /// Next fire time while running.
    fn next_fire_time(&self) -> Option<DateTime<Utc>>;

    fn fire_count(&self) -> u64;
}

/// Timer facility backed by tokio sleeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct CronTimerFacility;

impl CronTimerFacility {
    pub fn new() -> Self {
        Self
    }
}

impl TimerFacility for CronTimerFacility {
    fn schedule(
        &self,
        id: &str,
        expression: &CronExpression,
        time_zone: Tz,
        callback: TimerCallback,
        start_immediately: bool,
    ) -> Result<Arc<dyn TimerHandle>, TimerError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| TimerError::NoRuntime(id.to_string()))?;
        Ok(CronTimer::spawn(
            &runtime,
            id,
            expression.clone(),
            time_zone,
            callback,
            start_immediately,
        ))
    }
}

/// A cron-driven timer running as a tokio task.
///
/// The driver task sleeps until the next fire time, spawns the callback
/// and repeats. Stopping parks the driver; dropping the timer ends it.
pub struct CronTimer {
    id: String,
    expression: CronExpression,
    time_zone: Tz,
    running: watch::Sender<bool>,
    fire_count: Arc<AtomicU64>,
}

impl CronTimer {
    fn spawn(
        runtime: &tokio::runtime::Handle,
        id: &str,
        expression: CronExpression,
        time_zone: Tz,
        callback: TimerCallback,
        start_immediately: bool,
    ) -> Arc<Self> {
        let (running, rx) = watch::channel(start_immediately);
        let fire_count = Arc::new(AtomicU64::new(0));

        runtime.spawn(drive(
            id.to_string(),
            expression.clone(),
            time_zone,
            callback,
            rx,
            fire_count.clone(),
        ));

        Arc::new(Self {
            id: id.to_string(),
            expression,
            time_zone,
            running,
            fire_count,
        })
    }

    pub fn expression(&self) -> &CronExpression {
        &self.expression
    }
}

async fn drive(
    id: String,
    expression: CronExpression,
    time_zone: Tz,
    callback: TimerCallback,
    mut running: watch::Receiver<bool>,
    fire_count: Arc<AtomicU64>,
) {
    let mut last_fire: Option<DateTime<Utc>> = None;
    loop {
        while !*running.borrow_and_update() {
            if running.changed().await.is_err() {
                trace!(timer = %id, "Timer dropped while stopped");
                return;
            }
        }

        // Never re-arm for a slot that already fired, even if the wall clock
        // lags the sleep that woke us.
        let now = Utc::now();
        let from = last_fire.map_or(now, |last| last.max(now));
        let Some(next) = expression.next_after(from, time_zone) else {
            debug!(timer = %id, expression = %expression, "No upcoming fire time");
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        trace!(timer = %id, next = %next.to_rfc3339(), "Timer armed");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                if *running.borrow() {
                    last_fire = Some(next);
                    fire_count.fetch_add(1, Ordering::Relaxed);
                    debug!(timer = %id, "Timer fired");
                    tokio::spawn(callback());
                }
            }
            changed = running.changed() => {
                if changed.is_err() {
                    trace!(timer = %id, "Timer dropped");
                    return;
                }
            }
        }
    }
}

impl TimerHandle for CronTimer {
    fn id(&self) -> &str {
        &self.id
    }

    fn start(&self) {
        self.running.send_if_modified(|running| !std::mem::replace(running, true));
    }

    fn stop(&self) {
        self.running.send_if_modified(|running| std::mem::replace(running, false));
    }

    fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        if !self.is_running() {
            return None;
        }
        self.expression.next_after(Utc::now(), self.time_zone)
    }

    fn fire_count(&self) -> u64 {
        self.fire_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
