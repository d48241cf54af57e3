//! `cadence validate`, `cadence next` and `cadence trigger`.

use std::error::Error;
use std::sync::Arc;

use chrono::Utc;

use cadence_config::{Config, ConfigValidator};
use cadence_scheduler::{ManualTimerFacility, NoopPublisher, RunReport, Scheduler};

use crate::register;

/// Print validation problems. Fails when there is at least one error.
pub(crate) fn validate(config: &Config) -> Result<(), Box<dyn Error>> {
    let result = ConfigValidator::validate(config);

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if !result.is_valid() {
        return Err(format!("configuration has {} error(s)", result.errors.len()).into());
    }
    println!(
        "configuration OK: {} job(s), {} warning(s)",
        config.jobs.len(),
        result.warnings.len()
    );
    Ok(())
}

/// Print the next `count` fire times of every enabled job, in the job's
/// own time zone. Excluded days are skipped.
pub(crate) fn next(config: &Config, count: usize) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    for job in config.enabled_jobs() {
        let schedule = job.schedule_descriptor(&config.scheduler.timezone)?;
        let tz = schedule.time_zone();
        let cron = schedule.cron().map(|c| c.to_string()).unwrap_or_default();

        println!("{} ({}, {})", job.name, cron, tz);
        let upcoming = schedule.upcoming(now, count);
        if upcoming.is_empty() {
            println!("  no upcoming fire times");
        }
        for at in upcoming {
            println!("  {}", at.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"));
        }
    }
    Ok(())
}

/// Run one job once, outside its schedule, and print the report.
pub(crate) async fn trigger(config: &Config, name: &str) -> Result<(), Box<dyn Error>> {
    let job_config = config
        .job(name)
        .ok_or_else(|| format!("no job named '{}' in configuration", name))?;
    let job = register::build_job(job_config, &config.scheduler)?;

    let scheduler = Scheduler::with_components(
        register::scheduler_config(&config.scheduler),
        Arc::new(ManualTimerFacility::new()),
        Arc::new(NoopPublisher),
    );
    scheduler.add_job(job).await?;

    let report = scheduler
        .trigger_job(name)
        .await
        .ok_or_else(|| format!("job '{}' was not registered", name))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    scheduler.shutdown().await;

    match report {
        RunReport::Failed { error } => Err(format!("job '{}' failed: {}", name, error).into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_config::JobConfig;

    #[test]
    fn test_validate_reports_errors() {
        let config = Config {
            jobs: vec![JobConfig::new("bad", "", "* * *")],
            ..Config::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("2 error(s)"));
    }

    #[test]
    fn test_validate_accepts_good_config() {
        let config = Config {
            jobs: vec![JobConfig::new("good", "true", "*/10 * * * *")],
            ..Config::default()
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_next_fails_on_invalid_job() {
        let config = Config {
            jobs: vec![JobConfig::new("bad", "true", "invalid-schedule")],
            ..Config::default()
        };
        assert!(next(&config, 3).is_err());
    }

    #[tokio::test]
    async fn test_trigger_unknown_job() {
        let err = trigger(&Config::default(), "ghost").await.unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_trigger_reports_failure() {
        let config = Config {
            jobs: vec![JobConfig::new("fails", "exit 7", "0 0 * * *")],
            ..Config::default()
        };
        let err = trigger(&config, "fails").await.unwrap_err();
        assert!(err.to_string().contains("exit code 7"));

        let config = Config {
            jobs: vec![JobConfig::new("works", "true", "0 0 * * *")],
            ..Config::default()
        };
        assert!(trigger(&config, "works").await.is_ok());
    }
}
