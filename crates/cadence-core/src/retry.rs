//! Retry policy and a standalone retry executor.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    /// Same delay before every retry.
    #[default]
    Fixed,
    /// Delay doubles with every attempt.
    Exponential,
}

/// Retry configuration carried by a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    #[serde(default)]
    pub max_retries: u32,

    /// Base delay in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    #[serde(default)]
    pub strategy: RetryStrategy,
}

fn default_delay_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay_ms: default_delay_ms(),
            strategy: RetryStrategy::Fixed,
        }
    }
}

impl RetryPolicy {
    pub fn new(strategy: RetryStrategy, max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            strategy,
        }
    }

    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self::new(RetryStrategy::Fixed, max_retries, delay)
    }

    pub fn exponential(max_retries: u32, delay: Duration) -> Self {
        Self::new(RetryStrategy::Exponential, max_retries, delay)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Delay before the retry that follows `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let millis = match self.strategy {
            RetryStrategy::Fixed => self.delay_ms,
            RetryStrategy::Exponential => {
                let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                self.delay_ms.saturating_mul(factor)
            }
        };
        Duration::from_millis(millis)
    }

    /// Total attempts, counting the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Runs an async operation under a [`RetryPolicy`].
///
/// After the final failed attempt the last error is returned to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.base_delay(), Duration::from_secs(1));
        assert_eq!(policy.strategy, RetryStrategy::Fixed);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(250));
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(5), Duration::from_millis(250));
    }

    #[test]
    fn test_exponential_delay_doubles() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_exponential_delay_saturates() {
        let policy = RetryPolicy::exponential(100, Duration::from_millis(1000));
        assert_eq!(policy.delay_for(80), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_policy_deserialize_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"strategy": "exponential"}"#).unwrap();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.delay_ms, 1000);
        assert_eq!(policy.strategy, RetryStrategy::Exponential);
    }

    #[tokio::test]
    async fn test_executor_no_retries_single_attempt() {
        let calls = AtomicU32::new(0);
        let executor = RetryExecutor::default();

        let result: Result<(), String> = executor
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("nope".to_string()) }
            })
            .await;

        assert_eq!(result.unwrap_err(), "nope");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_executor_succeeds_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(RetryPolicy::fixed(3, Duration::from_millis(10)));

        let counter = calls.clone();
        let result: Result<u32, String> = executor
            .execute(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { if n < 3 { Err(format!("attempt {}", n)) } else { Ok(n) } }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_executor_exponential_timing_and_final_error() {
        let stamps = parking_lot::Mutex::new(Vec::new());
        let executor = RetryExecutor::new(RetryPolicy::exponential(3, Duration::from_millis(100)));

        let result: Result<(), String> = executor
            .execute(|| {
                stamps.lock().push(Instant::now());
                let n = stamps.lock().len();
                async move { Err(format!("failure {}", n)) }
            })
            .await;

        assert_eq!(result.unwrap_err(), "failure 4");
        let stamps = stamps.lock();
        assert_eq!(stamps.len(), 4);
        let gaps: Vec<u128> = stamps.windows(2).map(|w| (w[1] - w[0]).as_millis()).collect();
        assert_eq!(gaps, vec![100, 200, 400]);
    }
}
