//! `cadence run`: schedule every configured job until a shutdown signal.

use std::error::Error;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use cadence_config::Config;
use cadence_scheduler::{Scheduler, SchedulerEvent};

use crate::register;

pub(crate) async fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let scheduler = Arc::new(Scheduler::new(register::scheduler_config(&config.scheduler)));

    if let Some(events) = scheduler.subscribe() {
        tokio::spawn(log_events(events));
    }

    let registered = register::register_jobs(&scheduler, &config).await;
    if registered == 0 {
        warn!("No jobs scheduled");
    }
    for name in scheduler.job_names() {
        if let Some(next) = scheduler.next_fire_time(&name) {
            info!(job = %name, next = %next, "Next fire");
        }
    }

    info!("Cadence running, press Ctrl+C to stop");
    wait_for_shutdown_signal().await?;

    if !scheduler.shutdown().await {
        warn!(in_flight = scheduler.in_flight(), "Exiting with runs still in flight");
    }
    Ok(())
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<SchedulerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let payload = serde_json::to_string(&event).unwrap_or_default();
                match &event {
                    SchedulerEvent::TaskFailed { .. } => {
                        warn!(event = event.name(), job = event.job_name(), %payload, "Scheduler event")
                    }
                    _ => info!(event = event.name(), job = event.job_name(), %payload, "Scheduler event"),
                }
            }
            Err(RecvError::Lagged(missed)) => warn!(missed, "Event log fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Received SIGINT");
        }
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C");
    Ok(())
}
