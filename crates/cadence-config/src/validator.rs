//! Configuration validation.

use std::collections::HashSet;

use cadence_core::RetryStrategy;
use cadence_core::schedule::parse_time_zone;

use crate::schema::{Config, JobConfig};

const MAX_RECOMMENDED_RETRIES: u32 = 10;
const MAX_RECOMMENDED_EXPONENTIAL_BASE_MS: u64 = 60_000;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_logging(config, &mut result);
        Self::validate_scheduler(config, &mut result);
        Self::validate_jobs(config, &mut result);

        result
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, LOG_LEVELS
                ),
            ));
        }
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        if let Err(e) = parse_time_zone(&config.scheduler.timezone) {
            result.add_error(ValidationError::new("scheduler.timezone", e.to_string()));
        }

        if config.scheduler.event_capacity == 0 {
            result.add_error(ValidationError::new(
                "scheduler.event_capacity",
                "event_capacity must be greater than 0",
            ));
        }
    }

    fn validate_jobs(config: &Config, result: &mut ValidationResult) {
        if config.jobs.is_empty() {
            result.add_warning(ValidationWarning::new("jobs", "No jobs configured"));
            return;
        }

        let mut seen = HashSet::new();
        for (index, job) in config.jobs.iter().enumerate() {
            let path = if job.name.trim().is_empty() {
                format!("jobs[{}]", index)
            } else {
                format!("jobs.{}", job.name)
            };

            if job.name.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    "Job name cannot be empty",
                ));
            } else if !seen.insert(job.name.as_str()) {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    format!("Duplicate job name '{}'", job.name),
                ));
            }

            if job.command.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.command", path),
                    "Command cannot be empty",
                ));
            }

            Self::validate_schedule(config, job, &path, result);
            Self::validate_retries(job, &path, result);

            if !job.enabled {
                result.add_warning(ValidationWarning::new(
                    format!("{}.enabled", path),
                    "Job is disabled and will not be scheduled",
                ));
            }
        }
    }

    fn validate_schedule(config: &Config, job: &JobConfig, path: &str, result: &mut ValidationResult) {
        if job.schedule.is_some() && job.recurrence.is_some() {
            result.add_warning(ValidationWarning::new(
                format!("{}.recurrence", path),
                "Both schedule and recurrence are set, recurrence is ignored",
            ));
        }

        if let Err(e) = job.schedule_descriptor(&config.scheduler.timezone) {
            result.add_error(ValidationError::new(
                format!("{}.schedule", path),
                e.to_string(),
            ));
        }
    }

    fn validate_retries(job: &JobConfig, path: &str, result: &mut ValidationResult) {
        if job.max_retries > MAX_RECOMMENDED_RETRIES {
            result.add_warning(ValidationWarning::new(
                format!("{}.max_retries", path),
                format!(
                    "max_retries is very high (>{}), a failing job will retry for a long time",
                    MAX_RECOMMENDED_RETRIES
                ),
            ));
        }

        if job.retry_strategy == RetryStrategy::Exponential
            && job.retry_delay_ms > MAX_RECOMMENDED_EXPONENTIAL_BASE_MS
        {
            result.add_warning(ValidationWarning::new(
                format!("{}.retry_delay_ms", path),
                "Exponential backoff from a base delay over one minute grows very quickly",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
