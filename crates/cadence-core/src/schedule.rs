//! Recurrence rules and the schedule descriptor they produce.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::cron::CronExpression;
use crate::error::ScheduleValidationError;

/// Parse an IANA time zone name.
pub fn parse_time_zone(name: &str) -> Result<Tz, ScheduleValidationError> {
    name.parse::<Tz>()
        .map_err(|_| ScheduleValidationError::InvalidTimeZone(name.to_string()))
}

/// Parse a weekday name (`mon`, `Monday`, ...).
pub fn parse_weekday(name: &str) -> Result<Weekday, ScheduleValidationError> {
    name.trim()
        .parse::<Weekday>()
        .map_err(|_| ScheduleValidationError::InvalidDayOfWeek(name.to_string()))
}

/// Wall-clock time used by the preset recurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ScheduleValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleValidationError::InvalidTime(format!(
                "{:02}:{:02}",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleValidationError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour = h.parse::<u32>().map_err(|_| invalid())?;
        let minute = m.parse::<u32>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

/// A recurrence rule. Only the most recent rule set on a builder is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    Daily,
    Weekly(Weekday),
    Monthly { day: u32 },
    Yearly { day: u32, month: u32 },
    Custom(CronExpression),
}

impl Recurrence {
    fn render(&self, time: TimeOfDay) -> Result<CronExpression, ScheduleValidationError> {
        let (m, h) = (time.minute(), time.hour());
        let expression = match self {
            Recurrence::Daily => format!("{} {} * * *", m, h),
            Recurrence::Weekly(day) => format!("{} {} * * {}", m, h, day.num_days_from_sunday()),
            Recurrence::Monthly { day } => format!("{} {} {} * *", m, h, day),
            Recurrence::Yearly { day, month } => format!("{} {} {} {} *", m, h, day, month),
            Recurrence::Custom(expression) => return Ok(expression.clone()),
        };
        CronExpression::parse(&expression)
    }
}

fn check_day_of_month(day: u32) -> Result<u32, ScheduleValidationError> {
    if (1..=31).contains(&day) {
        Ok(day)
    } else {
        Err(ScheduleValidationError::DayOfMonthOutOfRange(day))
    }
}

fn check_month(month: u32) -> Result<u32, ScheduleValidationError> {
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(ScheduleValidationError::MonthOutOfRange(month))
    }
}

/// Fluent builder translating recurrence rules into a [`ScheduleDescriptor`].
///
/// ```rust
/// use cadence_core::ScheduleBuilder;
///
/// let descriptor = ScheduleBuilder::new()
///     .monthly(15)?
///     .at("02:30")?
///     .in_time_zone("Europe/Berlin")?
///     .excluding_weekends()
///     .to_config()?;
/// assert_eq!(descriptor.cron().map(|c| c.as_str()), Some("30 2 15 * *"));
/// # Ok::<(), cadence_core::ScheduleValidationError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScheduleBuilder {
    recurrence: Option<Recurrence>,
    time: TimeOfDay,
    time_zone: Tz,
    exclude_weekends: bool,
    exclude_holidays: Vec<NaiveDate>,
}

impl Default for ScheduleBuilder {
    fn default() -> Self {
        Self {
            recurrence: None,
            time: TimeOfDay::default(),
            time_zone: Tz::UTC,
            exclude_weekends: false,
            exclude_holidays: Vec::new(),
        }
    }
}

impl ScheduleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn daily(mut self) -> Self {
        self.recurrence = Some(Recurrence::Daily);
        self
    }

    pub fn weekly(mut self, day: Weekday) -> Self {
        self.recurrence = Some(Recurrence::Weekly(day));
        self
    }

    /// Weekly on a named day (`"mon"`, `"Friday"`).
    pub fn weekly_on(self, day: &str) -> Result<Self, ScheduleValidationError> {
        Ok(self.weekly(parse_weekday(day)?))
    }

    pub fn monthly(mut self, day_of_month: u32) -> Result<Self, ScheduleValidationError> {
        let day = check_day_of_month(day_of_month)?;
        self.recurrence = Some(Recurrence::Monthly { day });
        Ok(self)
    }

    pub fn yearly(mut self, day_of_month: u32, month: u32) -> Result<Self, ScheduleValidationError> {
        let day = check_day_of_month(day_of_month)?;
        let month = check_month(month)?;
        self.recurrence = Some(Recurrence::Yearly { day, month });
        Ok(self)
    }

    /// Use a raw cron expression. `at` does not apply to custom rules.
    pub fn custom_cron(mut self, expression: &str) -> Result<Self, ScheduleValidationError> {
        self.recurrence = Some(Recurrence::Custom(CronExpression::parse(expression)?));
        Ok(self)
    }

    pub fn at(mut self, time: &str) -> Result<Self, ScheduleValidationError> {
        self.time = time.parse()?;
        Ok(self)
    }

    pub fn in_time_zone(mut self, time_zone: &str) -> Result<Self, ScheduleValidationError> {
        self.time_zone = parse_time_zone(time_zone)?;
        Ok(self)
    }

    pub fn excluding_weekends(mut self) -> Self {
        self.exclude_weekends = true;
        self
    }

    pub fn excluding_holidays<I>(mut self, dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.exclude_holidays = dates.into_iter().collect();
        self.exclude_holidays.sort_unstable();
        self.exclude_holidays.dedup();
        self
    }

    pub fn recurrence(&self) -> Option<&Recurrence> {
        self.recurrence.as_ref()
    }

    /// Snapshot the builder as a descriptor. `cron` is `None` when no
    /// recurrence rule was set.
    pub fn to_config(&self) -> Result<ScheduleDescriptor, ScheduleValidationError> {
        let cron = self
            .recurrence
            .as_ref()
            .map(|r| r.render(self.time))
            .transpose()?;

        Ok(ScheduleDescriptor {
            cron,
            time: self.time,
            time_zone: self.time_zone,
            exclude_weekends: self.exclude_weekends,
            exclude_holidays: self.exclude_holidays.clone(),
        })
    }
}

/// Why a fire was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Weekend(Weekday),
    Holiday(NaiveDate),
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::Weekend(day) => write!(f, "weekend ({})", day),
            Exclusion::Holiday(date) => write!(f, "holiday ({})", date),
        }
    }
}

/// Normalised schedule: a cron expression plus exclusion metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDescriptor {
    cron: Option<CronExpression>,
    #[serde(default)]
    time: TimeOfDay,
    #[serde(default = "default_time_zone")]
    time_zone: Tz,
    #[serde(default)]
    exclude_weekends: bool,
    #[serde(default)]
    exclude_holidays: Vec<NaiveDate>,
}

fn default_time_zone() -> Tz {
    Tz::UTC
}

impl ScheduleDescriptor {
    /// Descriptor for a bare cron expression in UTC with no exclusions.
    pub fn from_cron(expression: &str) -> Result<Self, ScheduleValidationError> {
        Ok(CronExpression::parse(expression)?.into())
    }

    pub fn cron(&self) -> Option<&CronExpression> {
        self.cron.as_ref()
    }

    pub fn time(&self) -> TimeOfDay {
        self.time
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn excludes_weekends(&self) -> bool {
        self.exclude_weekends
    }

    pub fn holidays(&self) -> &[NaiveDate] {
        &self.exclude_holidays
    }

    /// Same exclusions and time zone, different expression.
    pub fn with_cron(mut self, cron: CronExpression) -> Self {
        self.cron = Some(cron);
        self
    }

    pub fn with_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Check `at` against the exclusion rules, in the descriptor's zone.
    pub fn is_excluded(&self, at: DateTime<Utc>) -> Option<Exclusion> {
        let local = at.with_timezone(&self.time_zone);
        let weekday = local.weekday();
        if self.exclude_weekends && matches!(weekday, Weekday::Sat | Weekday::Sun) {
            return Some(Exclusion::Weekend(weekday));
        }
        let date = local.date_naive();
        if self.exclude_holidays.contains(&date) {
            return Some(Exclusion::Holiday(date));
        }
        None
    }

    /// Next `count` fire times after `after` that are not excluded.
    ///
    /// Stops early when the expression runs out of fire times or when a long
    /// run of candidates is excluded.
    pub fn upcoming(&self, after: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        const MAX_CANDIDATES: usize = 10_000;
        let Some(cron) = &self.cron else {
            return Vec::new();
        };
        cron.iter_after(after, self.time_zone)
            .take(MAX_CANDIDATES)
            .filter(|t| self.is_excluded(*t).is_none())
            .take(count)
            .collect()
    }
}

impl From<CronExpression> for ScheduleDescriptor {
    fn from(cron: CronExpression) -> Self {
        Self {
            cron: Some(cron),
            time: TimeOfDay::default(),
            time_zone: Tz::UTC,
            exclude_weekends: false,
            exclude_holidays: Vec::new(),
        }
    }
}

impl FromStr for ScheduleDescriptor {
    type Err = ScheduleValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cron(s)
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
