//! Polling worker for deployment task status

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, info};

use crate::models::task::TaskRecord;
use crate::storage::settings::PollerSettings;
use crate::tasks::tracker::{RefreshOutcome, TaskStatusTracker};

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,

    /// Initial delay before first poll
    pub initial_delay: Duration,

    /// Stop once every watched deployment has a finished deploy task
    pub stop_when_settled: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            initial_delay: Duration::ZERO,
            stop_when_settled: false,
        }
    }
}

impl From<&PollerSettings> for Options {
    fn from(settings: &PollerSettings) -> Self {
        Self {
            interval: Duration::from_secs(settings.interval_secs.max(1)),
            initial_delay: Duration::from_secs(settings.initial_delay_secs),
            stop_when_settled: false,
        }
    }
}

/// Run the poller worker.
///
/// Each round refreshes every watched deployment concurrently and hands the
/// outcomes to `on_round`. Returns the number of completed rounds.
pub async fn run<S, F, R>(
    options: &Options,
    tracker: &TaskStatusTracker,
    deployment_ids: &[String],
    sleep_fn: S,
    mut on_round: R,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> usize
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
    R: FnMut(&[(String, RefreshOutcome)]),
{
    info!(
        "Poller worker starting for {} deployment(s)...",
        deployment_ids.len()
    );

    // Initial delay
    tokio::select! {
        _ = &mut shutdown_signal => {
            info!("Poller worker shutting down...");
            return 0;
        }
        _ = sleep_fn(options.initial_delay) => {}
    }

    let mut rounds = 0;
    loop {
        debug!("Polling task status...");
        let outcomes = tracker.refresh_all(deployment_ids).await;
        rounds += 1;
        on_round(&outcomes);

        if options.stop_when_settled && settled(tracker, deployment_ids).await {
            info!("All watched deployments settled");
            return rounds;
        }

        // Check for shutdown
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Poller worker shutting down...");
                return rounds;
            }
            _ = sleep_fn(options.interval) => {
                // Continue with poll
            }
        }
    }
}

async fn settled(tracker: &TaskStatusTracker, deployment_ids: &[String]) -> bool {
    for id in deployment_ids {
        match tracker.latest(id).await {
            Some(TaskRecord { status, .. }) if status.is_terminal() => {}
            _ => return false,
        }
    }
    true
}
