//! Turning configuration into scheduled jobs.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use cadence_config::{Config, JobConfig, SchedulerSection};
use cadence_core::{Job, JobBuilder, LoggingMiddleware, TimingMiddleware};
use cadence_scheduler::{Scheduler, SchedulerConfig};

use crate::shell::ShellTask;

/// Attempts slower than this are logged at `warn`.
const SLOW_ATTEMPT: Duration = Duration::from_secs(300);

pub(crate) fn scheduler_config(section: &SchedulerSection) -> SchedulerConfig {
    SchedulerConfig {
        event_capacity: section.event_capacity,
        shutdown_timeout_secs: section.shutdown_timeout_secs,
        default_overlap: section.default_overlap,
    }
}

/// Build a shell-command job from its `[[jobs]]` table.
pub(crate) fn build_job(job: &JobConfig, defaults: &SchedulerSection) -> Result<Job, Box<dyn Error>> {
    let schedule = job.schedule_descriptor(&defaults.timezone)?;

    let mut builder = JobBuilder::new()
        .with_name(job.name.as_str())
        .with_task(Arc::new(ShellTask::from_config(job)))
        .with_schedule(schedule)
        .with_priority(job.priority)
        .with_retry_policy(job.retry_policy())
        .use_middleware(Arc::new(LoggingMiddleware))
        .use_middleware(Arc::new(TimingMiddleware::new().with_slow_threshold(SLOW_ATTEMPT)));
    if let Some(overlap) = job.overlap {
        builder = builder.with_overlap_policy(overlap);
    }

    Ok(builder.build()?)
}

/// Register every enabled job. Jobs that fail to build or register are
/// logged and skipped. Returns the number registered.
pub(crate) async fn register_jobs(scheduler: &Scheduler, config: &Config) -> usize {
    let mut registered = 0;
    for job_config in config.enabled_jobs() {
        let job = match build_job(job_config, &config.scheduler) {
            Ok(job) => job,
            Err(e) => {
                error!(job = %job_config.name, error = %e, "Invalid job configuration, skipping");
                continue;
            }
        };
        match scheduler.add_job(job).await {
            Ok(_) => registered += 1,
            Err(e) => error!(job = %job_config.name, error = %e, "Failed to register job"),
        }
    }

    let disabled = config.jobs.len() - config.enabled_jobs().count();
    info!(registered, disabled, "Jobs registered");
    registered
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{JobStatus, OverlapPolicy, RetryStrategy, Tz};
    use cadence_scheduler::{ManualTimerFacility, NoopPublisher, RunReport};

    fn manual_scheduler() -> (Scheduler, Arc<ManualTimerFacility>) {
        let timers = Arc::new(ManualTimerFacility::new());
        let scheduler = Scheduler::with_components(
            SchedulerConfig::default(),
            timers.clone(),
            Arc::new(NoopPublisher),
        );
        (scheduler, timers)
    }

    #[test]
    fn test_scheduler_config_from_section() {
        let section = SchedulerSection {
            event_capacity: 8,
            shutdown_timeout_secs: 3,
            default_overlap: OverlapPolicy::Queue,
            ..SchedulerSection::default()
        };
        let config = scheduler_config(&section);
        assert_eq!(config.event_capacity, 8);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(3));
        assert_eq!(config.default_overlap, OverlapPolicy::Queue);
    }

    #[test]
    fn test_build_job_applies_settings() {
        let mut config = JobConfig::new("rotate-logs", "logrotate /etc/logrotate.conf", "15 3 * * *");
        config.priority = 4;
        config.max_retries = 2;
        config.retry_strategy = RetryStrategy::Exponential;
        config.overlap = Some(OverlapPolicy::Allow);
        let defaults = SchedulerSection {
            timezone: "Europe/Madrid".to_string(),
            ..SchedulerSection::default()
        };

        let job = build_job(&config, &defaults).unwrap();
        assert_eq!(job.name(), "rotate-logs");
        assert_eq!(job.priority(), 4);
        assert_eq!(job.retry_policy().max_retries, 2);
        assert_eq!(job.retry_policy().strategy, RetryStrategy::Exponential);
        assert_eq!(job.overlap_policy(), Some(OverlapPolicy::Allow));
        assert_eq!(job.schedule().time_zone(), Tz::Europe__Madrid);
        assert_eq!(job.middleware_count(), 2);
        assert_eq!(job.status(), JobStatus::Idle);
    }

    #[test]
    fn test_build_job_rejects_bad_schedule() {
        let config = JobConfig::new("broken", "true", "0 25 * * *");
        assert!(build_job(&config, &SchedulerSection::default()).is_err());
    }

    #[tokio::test]
    async fn test_register_jobs_skips_disabled_and_invalid() {
        let mut disabled = JobConfig::new("disabled", "true", "* * * * *");
        disabled.enabled = false;
        let config = Config {
            jobs: vec![
                JobConfig::new("ok", "true", "* * * * *"),
                JobConfig::new("bad", "true", "not a cron"),
                disabled,
            ],
            ..Config::default()
        };
        let (scheduler, _timers) = manual_scheduler();

        assert_eq!(register_jobs(&scheduler, &config).await, 1);
        assert_eq!(scheduler.job_names(), vec!["ok"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_registered_shell_job_runs_on_fire() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let config = Config {
            jobs: vec![JobConfig::new(
                "touch",
                format!("touch '{}'", marker.display()),
                "0 0 * * *",
            )],
            ..Config::default()
        };
        let (scheduler, timers) = manual_scheduler();
        register_jobs(&scheduler, &config).await;

        assert!(timers.fire("touch").await);
        assert!(marker.exists());
        assert_eq!(
            scheduler.trigger_job("touch").await,
            Some(RunReport::Completed)
        );
    }
}
