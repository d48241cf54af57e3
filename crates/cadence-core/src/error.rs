//! Error types for the Cadence job model.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::hooks::HookEvent;

/// Result returned by a task body or a middleware chain.
pub type TaskResult = Result<(), TaskError>;

/// Failure raised by a task, a hook callback or a middleware.
///
/// Cloneable so the same failure can be handed to error hooks, stored
/// as the job's last error and published as an event.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TaskError {
    message: String,
    #[source]
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an arbitrary error, keeping it reachable through `source()`.
    pub fn from_error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for TaskError {
    fn from(error: std::io::Error) -> Self {
        Self::from_error(error)
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A lifecycle hook rejected a job event.
#[derive(Debug, Clone, Error)]
#[error("{event} hook failed for job '{job}': {source}")]
pub struct HookError {
    pub job: String,
    pub event: HookEvent,
    /// 0-based attempt the hook ran for.
    pub attempt: u32,
    /// The hook was reporting a task failure.
    pub task_failed: bool,
    #[source]
    pub source: TaskError,
}

/// Invalid schedule input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleValidationError {
    /// Expression is not a 5-field cron expression.
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    /// Day of month outside 1..=31.
    #[error("Day of month must be between 1 and 31, got {0}")]
    DayOfMonthOutOfRange(u32),

    /// Month outside 1..=12.
    #[error("Month must be between 1 and 12, got {0}")]
    MonthOutOfRange(u32),

    /// Unrecognised weekday name.
    #[error("Invalid day of week: {0}")]
    InvalidDayOfWeek(String),

    /// Time of day not in HH:MM form.
    #[error("Invalid time of day '{0}', expected HH:MM")]
    InvalidTime(String),

    /// Not an IANA time zone name.
    #[error("Unknown time zone: {0}")]
    InvalidTimeZone(String),

    /// No recurrence rule or cron expression was supplied.
    #[error("Schedule has no recurrence rule")]
    MissingRecurrence,
}

impl ScheduleValidationError {
    pub(crate) fn invalid_cron(expression: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCron {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while building or driving a job.
#[derive(Debug, Clone, Error)]
pub enum JobError {
    /// Required builder input is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleValidationError),

    #[error(transparent)]
    Hook(#[from] HookError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_from_io_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let err = TaskError::from(io);
        assert_eq!(err.message(), "missing file");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_task_error_from_str_has_no_source() {
        let err = TaskError::from("boom");
        assert_eq!(err.to_string(), "boom");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_hook_error_display() {
        let err = HookError {
            job: "backup".to_string(),
            event: HookEvent::Start,
            attempt: 0,
            task_failed: false,
            source: TaskError::new("refused"),
        };
        let msg = err.to_string();
        assert!(msg.contains("onStart"));
        assert!(msg.contains("backup"));
        assert!(msg.contains("refused"));
    }

    #[test]
    fn test_schedule_error_display() {
        let err = ScheduleValidationError::invalid_cron("bogus", "expected 5 fields, found 1");
        assert!(err.to_string().contains("bogus"));

        let err = ScheduleValidationError::DayOfMonthOutOfRange(32);
        assert!(err.to_string().contains("32"));
    }

    #[test]
    fn test_job_error_wraps_schedule_error() {
        let err: JobError = ScheduleValidationError::MissingRecurrence.into();
        assert!(matches!(err, JobError::Schedule(_)));
    }
}
