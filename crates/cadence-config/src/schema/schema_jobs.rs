//! `[[jobs]]` tables.

use std::collections::HashMap;
use std::time::Duration;

use cadence_core::{
    OverlapPolicy, RetryPolicy, RetryStrategy, ScheduleBuilder, ScheduleDescriptor,
    ScheduleValidationError,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::default_true;
use crate::error::ConfigError;

/// One scheduled shell command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,

    /// Run with `sh -c`.
    pub command: String,

    #[serde(default)]
    pub working_dir: Option<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Five-field cron expression. Takes precedence over `recurrence`.
    #[serde(default)]
    pub schedule: Option<String>,

    #[serde(default)]
    pub recurrence: Option<RecurrenceConfig>,

    /// IANA zone; falls back to `[scheduler].timezone`.
    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default)]
    pub exclude_weekends: bool,

    /// Dates as `YYYY-MM-DD` strings.
    #[serde(default)]
    pub exclude_holidays: Vec<String>,

    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default)]
    pub retry_strategy: RetryStrategy,

    /// Falls back to `[scheduler].default_overlap`.
    #[serde(default)]
    pub overlap: Option<OverlapPolicy>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl JobConfig {
    /// Minimal job with a cron schedule and defaults elsewhere.
    pub fn new(name: impl Into<String>, command: impl Into<String>, schedule: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            working_dir: None,
            env: HashMap::new(),
            schedule: Some(schedule.into()),
            recurrence: None,
            timezone: None,
            exclude_weekends: false,
            exclude_holidays: Vec::new(),
            priority: 0,
            max_retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
            retry_strategy: RetryStrategy::default(),
            overlap: None,
            enabled: true,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_strategy,
            self.max_retries,
            Duration::from_millis(self.retry_delay_ms),
        )
    }

    /// Parsed holiday dates.
    pub fn holidays(&self) -> Result<Vec<NaiveDate>, ConfigError> {
        self.exclude_holidays
            .iter()
            .map(|raw| {
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                    ConfigError::invalid_value(
                        format!("jobs.{}.exclude_holidays", self.name),
                        format!("'{}': {}", raw, e),
                    )
                })
            })
            .collect()
    }

    /// Resolve the schedule, using `default_time_zone` when the job sets none.
    pub fn schedule_descriptor(&self, default_time_zone: &str) -> Result<ScheduleDescriptor, ConfigError> {
        let mut builder = match (&self.schedule, &self.recurrence) {
            (Some(cron), _) => ScheduleBuilder::new().custom_cron(cron)?,
            (None, Some(recurrence)) => recurrence.apply(ScheduleBuilder::new())?,
            (None, None) => return Err(ScheduleValidationError::MissingRecurrence.into()),
        };

        builder = builder.in_time_zone(self.timezone.as_deref().unwrap_or(default_time_zone))?;
        if self.exclude_weekends {
            builder = builder.excluding_weekends();
        }
        let holidays = self.holidays()?;
        if !holidays.is_empty() {
            builder = builder.excluding_holidays(holidays);
        }
        Ok(builder.to_config()?)
    }
}

/// How often a `[jobs.recurrence]` repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Preset recurrence, as an alternative to a raw cron string.
///
/// ```toml
/// [jobs.recurrence]
/// every = "weekly"
/// weekday = "fri"
/// at = "17:30"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceConfig {
    pub every: RecurrenceKind,

    /// Day of month, for monthly and yearly.
    #[serde(default)]
    pub day: Option<u32>,

    /// Weekday name, for weekly.
    #[serde(default)]
    pub weekday: Option<String>,

    /// Month number, for yearly.
    #[serde(default)]
    pub month: Option<u32>,

    /// `HH:MM`, default midnight.
    #[serde(default)]
    pub at: Option<String>,
}

impl RecurrenceConfig {
    fn apply(&self, builder: ScheduleBuilder) -> Result<ScheduleBuilder, ConfigError> {
        let builder = match self.every {
            RecurrenceKind::Daily => builder.daily(),
            RecurrenceKind::Weekly => {
                let day = self.required(self.weekday.as_deref(), "weekday")?;
                builder.weekly_on(day)?
            }
            RecurrenceKind::Monthly => builder.monthly(self.required(self.day, "day")?)?,
            RecurrenceKind::Yearly => builder.yearly(
                self.required(self.day, "day")?,
                self.required(self.month, "month")?,
            )?,
        };
        match &self.at {
            Some(at) => Ok(builder.at(at)?),
            None => Ok(builder),
        }
    }

    fn required<T>(&self, value: Option<T>, field: &str) -> Result<T, ConfigError> {
        value.ok_or_else(|| {
            ConfigError::invalid_value(
                format!("recurrence.{}", field),
                format!("required when every = \"{:?}\"", self.every).to_lowercase(),
            )
        })
    }
}
