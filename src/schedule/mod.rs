//! Timed triggers for full revalidations.
//!
//! Two kinds of triggers reconcile with an empty invalidated set:
//! - the initial revalidation, once, a fixed delay after startup
//! - one task per cron schedule, for as long as the process runs
//!
//! Each run is wrapped in [`retry_with_backoff`]. A schedule computes its
//! next fire time only after the previous run (including retries) finished,
//! so runs of the same schedule never overlap.

pub mod expr;

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::clients::DocumentSource;
use crate::controller::Controller;
use crate::retry::{RetryConfig, RetryResult, retry_with_backoff};

pub use expr::{RevalidateSchedule, ScheduleParseError};

/// Configuration for the timed triggers.
#[derive(Debug, Clone, Default)]
pub struct TriggerConfig {
    /// Delay before the initial full revalidation; `None` disables it.
    pub initial_delay: Option<Duration>,

    pub schedules: Vec<RevalidateSchedule>,

    pub retry: RetryConfig,
}

/// Spawns every configured trigger.
///
/// The returned tracker is already closed; `wait()` on it resolves once
/// every trigger has stopped after `shutdown` is cancelled.
pub fn spawn_triggers<S: DocumentSource>(
    controller: &Controller<S>,
    config: TriggerConfig,
    shutdown: CancellationToken,
) -> TaskTracker {
    let tracker = TaskTracker::new();

    if let Some(delay) = config.initial_delay {
        info!(delay_secs = delay.as_secs(), "Scheduling initial revalidation");
        tracker.spawn(run_initial(
            controller.clone(),
            delay,
            config.retry,
            shutdown.clone(),
        ));
    }

    for schedule in config.schedules {
        info!(schedule = %schedule, "Scheduling periodic revalidation");
        tracker.spawn(run_schedule(
            controller.clone(),
            schedule,
            config.retry,
            shutdown.clone(),
        ));
    }

    tracker.close();
    tracker
}

async fn run_initial<S: DocumentSource>(
    controller: Controller<S>,
    delay: Duration,
    retry: RetryConfig,
    shutdown: CancellationToken,
) {
    tokio::select! {
        _ = shutdown.cancelled() => {
            debug!("Initial revalidation cancelled");
            return;
        }
        _ = tokio::time::sleep(delay) => {}
    }

    full_revalidation(&controller, "initial", retry, &shutdown).await;
}

async fn run_schedule<S: DocumentSource>(
    controller: Controller<S>,
    schedule: RevalidateSchedule,
    retry: RetryConfig,
    shutdown: CancellationToken,
) {
    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_after(&now) else {
            warn!(schedule = %schedule, "Schedule has no upcoming fire time");
            return;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        debug!(schedule = %schedule, next = %next, "Waiting for next scheduled revalidation");

        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(schedule = %schedule, "Scheduled revalidation stopped");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        full_revalidation(&controller, schedule.expression(), retry, &shutdown).await;
    }
}

/// Runs one full revalidation with retries. Returns true on success.
pub(crate) async fn full_revalidation<S: DocumentSource>(
    controller: &Controller<S>,
    trigger: &str,
    retry: RetryConfig,
    shutdown: &CancellationToken,
) -> bool {
    info!(trigger, "Starting full revalidation");

    match retry_with_backoff(retry, shutdown, move || controller.revalidate_all()).await {
        RetryResult::Success(summary) => {
            info!(
                trigger,
                generation = %summary.generation,
                inventory = summary.inventory,
                "Full revalidation enqueued"
            );
            true
        }
        RetryResult::Exhausted {
            last_error,
            attempts,
        } => {
            error!(
                trigger,
                attempts,
                transient = last_error.is_transient(),
                error = %last_error,
                "Full revalidation failed"
            );
            false
        }
        RetryResult::Cancelled { attempts } => {
            info!(trigger, attempts, "Full revalidation cancelled by shutdown");
            false
        }
    }
}
