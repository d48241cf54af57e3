    use super::*;
    use cadence_core::{JobBuilder, ScheduleBuilder, TaskError, hook_fn, task_fn};
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU32;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<SchedulerEvent>>,
    }

    impl EventPublisher for Recording {
        fn publish(&self, event: SchedulerEvent) {
            self.events.lock().push(event);
        }
    }

    impl Recording {
        fn names(&self) -> Vec<&'static str> {
            self.events.lock().iter().map(|e| e.name()).collect()
        }
    }

    fn runner(job: Job, overlap: OverlapPolicy) -> (Arc<JobRunner>, Arc<Recording>) {
        let events = Arc::new(Recording::default());
        let runner = JobRunner::new(Arc::new(job), events.clone(), overlap, CancellationToken::new());
        (Arc::new(runner), events)
    }

    fn job_with(task: Arc<dyn cadence_core::Task>) -> JobBuilder {
        JobBuilder::new()
            .with_name("runner-job")
            .with_task(task)
            .with_schedule("*/5 * * * *")
    }

    /// Task that blocks on its first call until released.
    fn gated_task(
        started: Arc<Notify>,
        release: Arc<Notify>,
        active: Arc<AtomicU32>,
        max_active: Arc<AtomicU32>,
    ) -> Arc<dyn cadence_core::Task> {
        task_fn(move || {
            let (started, release) = (started.clone(), release.clone());
            let (active, max_active) = (active.clone(), max_active.clone());
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                started.notify_one();
                release.notified().await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_success_publishes_task_success() {
        let job = job_with(task_fn(|| async { Ok(()) })).build().unwrap();
        let (runner, events) = runner(job, OverlapPolicy::Skip);

        assert_eq!(runner.fire().await, RunReport::Completed);
        assert_eq!(events.names(), vec!["taskSuccess"]);
        assert!(!runner.is_in_flight());
    }

    #[tokio::test]
    async fn test_failure_publishes_task_error() {
        let job = job_with(task_fn(|| async { Err(TaskError::new("exit code 3")) }))
            .build()
            .unwrap();
        let (runner, events) = runner(job, OverlapPolicy::Skip);

        let report = runner.fire().await;
        assert_eq!(
            report,
            RunReport::Failed {
                error: "exit code 3".to_string()
            }
        );
        assert_eq!(
            events.events.lock().as_slice(),
            &[SchedulerEvent::TaskFailed {
                name: "runner-job".to_string(),
                error: "exit code 3".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_skip_policy_drops_overlapping_fire() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let active = Arc::new(AtomicU32::new(0));
        let max_active = Arc::new(AtomicU32::new(0));
        let job = job_with(gated_task(started.clone(), release.clone(), active, max_active))
            .build()
            .unwrap();
        let (runner, events) = runner(job, OverlapPolicy::Skip);

        let first = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.fire().await })
        };
        started.notified().await;
        assert!(runner.is_in_flight());

        let second = runner.fire().await;
        assert_eq!(
            second,
            RunReport::Skipped {
                reason: SkipReason::AlreadyRunning
            }
        );

        release.notify_one();
        assert_eq!(first.await.unwrap(), RunReport::Completed);
        assert!(!runner.is_in_flight());
        assert_eq!(events.names(), vec!["taskSkipped", "taskSuccess"]);
    }

    #[tokio::test]
    async fn test_queue_policy_serialises_runs() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let active = Arc::new(AtomicU32::new(0));
        let max_active = Arc::new(AtomicU32::new(0));
        let job = job_with(gated_task(
            started.clone(),
            release.clone(),
            active.clone(),
            max_active.clone(),
        ))
        .build()
        .unwrap();
        let (runner, events) = runner(job, OverlapPolicy::Queue);

        let first = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.fire().await })
        };
        started.notified().await;
        let second = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.fire().await })
        };

        release.notify_one();
        started.notified().await;
        release.notify_one();

        assert_eq!(first.await.unwrap(), RunReport::Completed);
        assert_eq!(second.await.unwrap(), RunReport::Completed);
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert_eq!(events.names(), vec!["taskSuccess", "taskSuccess"]);
    }

    #[tokio::test]
    async fn test_allow_policy_runs_concurrently() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let active = Arc::new(AtomicU32::new(0));
        let max_active = Arc::new(AtomicU32::new(0));
        let job = job_with(gated_task(
            started.clone(),
            release.clone(),
            active.clone(),
            max_active.clone(),
        ))
        .build()
        .unwrap();
        let (runner, _events) = runner(job, OverlapPolicy::Allow);

        let spawn_fire = || {
            let runner = runner.clone();
            tokio::spawn(async move { runner.fire().await })
        };
        let first = spawn_fire();
        started.notified().await;
        let second = spawn_fire();
        started.notified().await;

        assert_eq!(max_active.load(Ordering::SeqCst), 2);
        release.notify_one();
        release.notify_one();
        assert!(first.await.unwrap().is_completed());
        assert!(second.await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_excluded_fire_is_skipped() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let today = Utc::now().date_naive();
        let job = JobBuilder::new()
            .with_name("holiday-job")
            .with_task_fn(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .with_schedule(ScheduleBuilder::new().daily().excluding_holidays([today]))
            .build()
            .unwrap();
        let (runner, events) = runner(job, OverlapPolicy::Skip);

        let report = runner.fire().await;
        assert!(matches!(
            report,
            RunReport::Skipped {
                reason: SkipReason::Excluded(_)
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(events.names(), vec!["taskSkipped"]);
    }

    #[tokio::test]
    async fn test_cancelled_runner_skips() {
        let job = job_with(task_fn(|| async { Ok(()) })).build().unwrap();
        let events = Arc::new(Recording::default());
        let token = CancellationToken::new();
        let runner = JobRunner::new(Arc::new(job), events.clone(), OverlapPolicy::Skip, token.clone());

        token.cancel();
        assert_eq!(
            runner.fire().await,
            RunReport::Skipped {
                reason: SkipReason::ShuttingDown
            }
        );
    }

    #[tokio::test]
    async fn test_hook_failure_runs_error_hooks_and_publishes() {
        let error_hook_calls = Arc::new(AtomicU32::new(0));
        let counter = error_hook_calls.clone();
        let job = job_with(task_fn(|| async { Ok(()) }))
            .with_hook(
                HookEvent::Start,
                hook_fn(|_| async { Err(TaskError::new("lock held")) }),
            )
            .with_hook(
                HookEvent::Error,
                hook_fn(move |ctx| {
                    let counter = counter.clone();
                    async move {
                        assert!(ctx.error.is_some());
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )
            .build()
            .unwrap();
        let (runner, events) = runner(job, OverlapPolicy::Skip);

        let report = runner.fire().await;
        assert!(matches!(report, RunReport::Failed { ref error } if error.contains("lock held")));
        assert_eq!(error_hook_calls.load(Ordering::SeqCst), 1);
        assert_eq!(events.names(), vec!["taskError"]);
        assert_eq!(runner.job().status(), cadence_core::JobStatus::Error);
    }

    fn recording_error_hook(attempts: Arc<Mutex<Vec<u32>>>) -> Arc<dyn cadence_core::Hook> {
        hook_fn(move |ctx| {
            let attempts = attempts.clone();
            async move {
                attempts.lock().push(ctx.attempt);
                Ok(())
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_hooks_see_failing_attempt() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let job = job_with(task_fn(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(TaskError::new("first attempt fails"))
                } else {
                    Ok(())
                }
            }
        }))
        .with_max_retries(1)
        .with_retry_delay(std::time::Duration::from_millis(5))
        .with_hook(
            HookEvent::Start,
            hook_fn(|ctx| async move {
                if ctx.attempt == 1 {
                    Err(TaskError::new("lease expired"))
                } else {
                    Ok(())
                }
            }),
        )
        .with_hook(HookEvent::Error, recording_error_hook(attempts.clone()))
        .build()
        .unwrap();
        let (runner, events) = runner(job, OverlapPolicy::Skip);

        let report = runner.fire().await;
        assert!(matches!(report, RunReport::Failed { ref error } if error.contains("lease expired")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*attempts.lock(), vec![1]);
        assert_eq!(events.names(), vec!["taskError"]);
    }

    #[tokio::test]
    async fn test_cycle_end_failure_after_success_runs_error_hooks() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let job = job_with(task_fn(|| async { Ok(()) }))
            .with_hook(
                HookEvent::CycleEnd,
                hook_fn(|_| async { Err(TaskError::new("audit sink down")) }),
            )
            .with_hook(HookEvent::Error, recording_error_hook(attempts.clone()))
            .build()
            .unwrap();
        let (runner, events) = runner(job, OverlapPolicy::Skip);

        let report = runner.fire().await;
        assert!(matches!(report, RunReport::Failed { ref error } if error.contains("audit sink down")));
        assert_eq!(*attempts.lock(), vec![0]);
        assert_eq!(events.names(), vec!["taskError"]);
        assert_eq!(runner.job().status(), cadence_core::JobStatus::Error);
    }

    #[test]
    fn test_report_serialises() {
        let json = serde_json::to_value(RunReport::Failed {
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["result"], "failed");
        assert_eq!(json["error"], "boom");
    }
