//! Built-in middleware.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Middleware, MiddlewareContext, Next};
use crate::error::TaskResult;

/// Logs the start and outcome of every attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, ctx: &MiddlewareContext, next: Next<'_>) -> TaskResult {
        info!(job = %ctx.job_name, attempt = ctx.attempt, "Task starting");
        let result = next.run().await;
        match &result {
            Ok(()) => info!(job = %ctx.job_name, attempt = ctx.attempt, "Task finished"),
            Err(e) => warn!(job = %ctx.job_name, attempt = ctx.attempt, error = %e, "Task failed"),
        }
        result
    }
}

/// Measures attempt duration and warns when it exceeds a threshold.
#[derive(Debug)]
pub struct TimingMiddleware {
    slow_threshold: Option<Duration>,
    last_micros: AtomicU64,
    total_micros: AtomicU64,
    samples: AtomicU64,
}

impl TimingMiddleware {
    pub fn new() -> Self {
        Self {
            slow_threshold: None,
            last_micros: AtomicU64::new(0),
            total_micros: AtomicU64::new(0),
            samples: AtomicU64::new(0),
        }
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    /// Duration of the most recent attempt.
    pub fn last_duration(&self) -> Duration {
        Duration::from_micros(self.last_micros.load(Ordering::Relaxed))
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    pub fn average_duration(&self) -> Option<Duration> {
        let samples = self.samples();
        if samples == 0 {
            return None;
        }
        Some(Duration::from_micros(
            self.total_micros.load(Ordering::Relaxed) / samples,
        ))
    }
}

impl Default for TimingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for TimingMiddleware {
    async fn handle(&self, ctx: &MiddlewareContext, next: Next<'_>) -> TaskResult {
        let started = Instant::now();
        let result = next.run().await;
        let elapsed = started.elapsed();
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);

        self.last_micros.store(micros, Ordering::Relaxed);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.samples.fetch_add(1, Ordering::Relaxed);

        if let Some(threshold) = self.slow_threshold {
            if elapsed > threshold {
                warn!(
                    job = %ctx.job_name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    threshold_ms = threshold.as_millis() as u64,
                    "Slow task attempt"
                );
            }
        }
        result
    }
}
