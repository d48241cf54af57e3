//! Timers fired by hand.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use cadence_core::CronExpression;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;

use super::{TimerCallback, TimerFacility, TimerHandle};
use crate::error::TimerError;

/// Facility whose timers only fire through [`ManualTimerFacility::fire`].
#[derive(Default)]
pub struct ManualTimerFacility {
    timers: Mutex<HashMap<String, Arc<ManualTimer>>>,
}

impl ManualTimerFacility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest timer created under `id`.
    pub fn timer(&self, id: &str) -> Option<Arc<ManualTimer>> {
        self.timers.lock().get(id).cloned()
    }

    /// Fire the latest timer for `id` and wait for its callback. Returns
    /// `false` when there is no such timer or it is stopped.
    pub async fn fire(&self, id: &str) -> bool {
        match self.timer(id) {
            Some(timer) => timer.fire().await,
            None => false,
        }
    }

    pub fn timer_count(&self) -> usize {
        self.timers.lock().len()
    }
}

impl TimerFacility for ManualTimerFacility {
    fn schedule(
        &self,
        id: &str,
        expression: &CronExpression,
        time_zone: Tz,
        callback: TimerCallback,
        start_immediately: bool,
    ) -> Result<Arc<dyn TimerHandle>, TimerError> {
        let timer = Arc::new(ManualTimer {
            id: id.to_string(),
            expression: expression.clone(),
            time_zone,
            callback,
            running: AtomicBool::new(start_immediately),
            fire_count: AtomicU64::new(0),
        });
        self.timers.lock().insert(id.to_string(), timer.clone());
        Ok(timer)
    }
}

/// A timer that records its configuration and fires on demand.
pub struct ManualTimer {
    id: String,
    expression: CronExpression,
    time_zone: Tz,
    callback: TimerCallback,
    running: AtomicBool,
    fire_count: AtomicU64,
}

impl ManualTimer {
    pub fn expression(&self) -> &CronExpression {
        &self.expression
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Run the callback to completion if the timer is running.
    pub async fn fire(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.fire_count.fetch_add(1, Ordering::Relaxed);
        (self.callback)().await;
        true
    }
}

impl TimerHandle for ManualTimer {
    fn id(&self) -> &str {
        &self.id
    }

    fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
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
