//! Periodic eviction of finished jobs.

use std::time::Duration;

use dsort_core::JobStore;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Tracing target for retention worker operations.
const TRACING_TARGET: &str = "dsort_server::worker::retention";

/// Removes terminal jobs once they are older than the retention period.
///
/// Running and aborting jobs are never evicted.
#[derive(Debug, Clone)]
pub struct RetentionWorker {
    store: JobStore,
    retention: Duration,
    interval: Duration,
}

impl RetentionWorker {
    /// Creates a worker sweeping `store` every `interval`.
    pub fn new(store: JobStore, retention: Duration, interval: Duration) -> Self {
        Self {
            store,
            retention,
            interval,
        }
    }

    /// Runs one sweep and returns the number of evicted jobs.
    pub async fn sweep(&self) -> usize {
        let evicted = self.store.evict_expired(self.retention).await;
        if evicted > 0 {
            tracing::info!(target: TRACING_TARGET, evicted, "Expired sort jobs evicted");
        }
        evicted
    }

    /// Run the retention worker until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            target: TRACING_TARGET,
            retention_secs = self.retention.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Starting retention worker"
        );

        self.run_inner(cancel).await;

        tracing::info!(target: TRACING_TARGET, "Retention worker stopped");
    }

    async fn run_inner(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        "Retention worker shutdown requested"
                    );
                    break;
                }
                _ = ticker.tick() => {
                    self.sweep().await;
                }
            }
        }
    }
}
