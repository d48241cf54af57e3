//! Five-field cron expressions.
//!
//! Expressions use the classic `minute hour day-of-month month day-of-week`
//! layout. Each field accepts `*`, `*/n`, a number, ranges (`a-b`) and
//! lists (`a,b`). Day-of-week numbers run from 0 (Sunday) to 7 (Sunday).
//! When both day-of-month and day-of-week are restricted (neither starts
//! with `*`), a time matches if either field matches.
//!
//! Parsing and evaluation are delegated to the `cron` crate, which expects
//! a leading seconds field, numbers Sunday as 1 and ANDs the two day
//! fields. Expressions are translated into that dialect once, at parse
//! time, and the day-field union is evaluated as two merged schedules.

use std::fmt;
use std::iter::{Map, Peekable};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::{Schedule, ScheduleIterator};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleValidationError;

/// Number of fields in a cron expression.
pub const CRON_FIELDS: usize = 5;

const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// A validated five-field cron expression.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CronExpression {
    source: String,
    schedule: Schedule,
    /// Day-of-week half of the schedule when both day fields are restricted.
    weekday_schedule: Option<Schedule>,
}

impl CronExpression {
    /// Parse and validate an expression.
    pub fn parse(expression: &str) -> Result<Self, ScheduleValidationError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != CRON_FIELDS {
            return Err(ScheduleValidationError::invalid_cron(
                expression,
                format!("expected {} fields, found {}", CRON_FIELDS, fields.len()),
            ));
        }

        let day_of_week = translate_day_of_week(fields[4])
            .map_err(|reason| ScheduleValidationError::invalid_cron(expression, reason))?;
        let build = |day_of_month: &str, day_of_week: &str| {
            let extended = format!(
                "0 {} {} {} {} {}",
                fields[0], fields[1], day_of_month, fields[3], day_of_week
            );
            Schedule::from_str(&extended)
                .map_err(|e| ScheduleValidationError::invalid_cron(expression, e.to_string()))
        };

        let (schedule, weekday_schedule) = if restricts_days(fields[2]) && restricts_days(fields[4]) {
            (build(fields[2], "*")?, Some(build("*", &day_of_week)?))
        } else {
            (build(fields[2], &day_of_week)?, None)
        };

        Ok(Self {
            source: fields.join(" "),
            schedule,
            weekday_schedule,
        })
    }

    /// Check an expression without keeping the parsed form.
    pub fn is_valid(expression: &str) -> bool {
        Self::parse(expression).is_ok()
    }

    /// The normalised expression text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// First fire time strictly after `after`, evaluated in `time_zone`.
    pub fn next_after(&self, after: DateTime<Utc>, time_zone: Tz) -> Option<DateTime<Utc>> {
        self.iter_after(after, time_zone).next()
    }

    /// Fire times after now, evaluated in `time_zone`.
    pub fn upcoming(&self, time_zone: Tz) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.fire_times(move |schedule| schedule.upcoming(time_zone))
    }

    /// Fire times strictly after `after`, evaluated in `time_zone`.
    pub fn iter_after(
        &self,
        after: DateTime<Utc>,
        time_zone: Tz,
    ) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        let after = after.with_timezone(&time_zone);
        self.fire_times(move |schedule| schedule.after(&after))
    }

    fn fire_times<'a, F>(&'a self, start: F) -> Earliest<UtcTimes<'a>>
    where
        F: Fn(&'a Schedule) -> ScheduleIterator<'a, Tz>,
    {
        let convert: fn(DateTime<Tz>) -> DateTime<Utc> = to_utc;
        Earliest {
            left: start(&self.schedule).map(convert).peekable(),
            right: self
                .weekday_schedule
                .as_ref()
                .map(|schedule| start(schedule).map(convert).peekable()),
        }
    }
}

type UtcTimes<'a> = Map<ScheduleIterator<'a, Tz>, fn(DateTime<Tz>) -> DateTime<Utc>>;

fn to_utc(at: DateTime<Tz>) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

/// Merges two ascending streams of fire times, yielding a shared time once.
struct Earliest<I: Iterator> {
    left: Peekable<I>,
    right: Option<Peekable<I>>,
}

impl<I> Iterator for Earliest<I>
where
    I: Iterator<Item = DateTime<Utc>>,
{
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(right) = self.right.as_mut() else {
            return self.left.next();
        };
        match (self.left.peek().copied(), right.peek().copied()) {
            (Some(l), Some(r)) if l < r => self.left.next(),
            (Some(l), Some(r)) if r < l => right.next(),
            (Some(_), Some(_)) => {
                right.next();
                self.left.next()
            }
            (Some(_), None) => self.left.next(),
            (None, _) => right.next(),
        }
    }
}

/// A day field restricts the schedule unless it starts with `*` or is `?`.
fn restricts_days(field: &str) -> bool {
    !(field.starts_with('*') || field == "?")
}

/// Rewrite numeric weekdays as a list of day names so that both 0 and 7
/// mean Sunday. Ranges and steps are expanded here; items that already
/// use names pass through untouched.
fn translate_day_of_week(field: &str) -> Result<String, String> {
    let mut days = [false; 7];
    let mut named = Vec::new();

    for item in field.split(',') {
        if item == "?" || item.chars().any(|c| c.is_ascii_alphabetic()) {
            named.push(item);
            continue;
        }

        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: usize = step
                    .parse()
                    .map_err(|_| format!("invalid day of week step '{}'", step))?;
                if step == 0 {
                    return Err("day of week step must be at least 1".to_string());
                }
                (range, step)
            }
            None => (item, 1),
        };

        let (first, last) = match range.split_once('-') {
            _ if range == "*" => (0, 7),
            Some((first, last)) => (parse_day(first)?, parse_day(last)?),
            None => {
                let day = parse_day(range)?;
                (day, if step > 1 { 7 } else { day })
            }
        };
        if first > last {
            return Err(format!("day of week range {}-{} is reversed", first, last));
        }
        for day in (first..=last).step_by(step) {
            days[day % 7] = true;
        }
    }

    if days.iter().all(|set| *set) {
        return Ok("*".to_string());
    }
    let mut parts: Vec<&str> = days
        .iter()
        .zip(DAY_NAMES)
        .filter_map(|(set, name)| set.then_some(name))
        .collect();
    parts.extend(named);
    Ok(parts.join(","))
}

fn parse_day(text: &str) -> Result<usize, String> {
    let day: usize = text
        .parse()
        .map_err(|_| format!("invalid day of week '{}'", text))?;
    if day > 7 {
        return Err(format!("day of week {} out of range 0-7", day));
    }
    Ok(day)
}

impl PartialEq for CronExpression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for CronExpression {}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for CronExpression {
    type Err = ScheduleValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CronExpression {
    type Error = ScheduleValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CronExpression> for String {
    fn from(expression: CronExpression) -> Self {
        expression.source
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
