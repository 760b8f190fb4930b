//! Background expiry sweep.
//!
//! Lazy eviction on lookup keeps answers correct; the sweep only bounds
//! memory (and store size) for deployments with high session churn.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::SessionCache;

/// Handle to a running sweep task. Dropping it does not stop the task;
/// call [`SweepHandle::shutdown`].
pub struct SweepHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stop the sweep and wait for the task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }

    /// Token that stops the sweep when cancelled.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Start the periodic sweep if the cache configuration enables it.
pub fn spawn_sweeper(cache: &SessionCache) -> Option<SweepHandle> {
    let config = cache.config();
    if !config.enable_sweep || config.sweep_interval.is_zero() {
        debug!("Session sweep disabled");
        return None;
    }
    Some(spawn_sweeper_every(cache.clone(), config.sweep_interval))
}

/// Start a sweep running every `interval`, regardless of configuration.
pub fn spawn_sweeper_every(cache: SessionCache, interval: Duration) -> SweepHandle {
    let cancel = CancellationToken::new();
    let stop = cancel.clone();

    info!(interval_secs = interval.as_secs_f64(), "Starting session sweep");

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    match cache.sweep_expired().await {
                        Ok(report) if report.evicted + report.purged > 0 => {
                            debug!(evicted = report.evicted, purged = report.purged, "Session sweep");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Session sweep failed"),
                    }
                }
            }
        }

        debug!("Session sweep stopped");
    });

    SweepHandle { cancel, task }
}
