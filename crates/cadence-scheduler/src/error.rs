//! Error types for the scheduler.

use cadence_core::{HookError, ScheduleValidationError};
use thiserror::Error;

/// Errors raised by the timer facility.
#[derive(Debug, Clone, Error)]
pub enum TimerError {
    /// Timers need a tokio runtime to drive them.
    #[error("No tokio runtime available to drive timer '{0}'")]
    NoRuntime(String),
}

/// Errors raised by [`crate::Scheduler`].
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    /// A job with this name is already registered.
    #[error("Job already registered: {0}")]
    DuplicateJob(String),

    /// The scheduler is shutting down or stopped.
    #[error("Scheduler is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Schedule(#[from] ScheduleValidationError),

    /// An `onInitialize` hook rejected the job.
    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Timer(#[from] TimerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_job_display() {
        let err = SchedulerError::DuplicateJob("backup".to_string());
        assert_eq!(err.to_string(), "Job already registered: backup");
    }

    #[test]
    fn test_schedule_error_is_transparent() {
        let err: SchedulerError = ScheduleValidationError::MonthOutOfRange(13).into();
        assert_eq!(err.to_string(), "Month must be between 1 and 12, got 13");
    }

    #[test]
    fn test_timer_error_display() {
        let err: SchedulerError = TimerError::NoRuntime("nightly".to_string()).into();
        assert!(err.to_string().contains("nightly"));
    }
}
