//! Forwarding of in-process engine events into the controller.

use dsort_core::JobController;
use dsort_core::engine::{EngineEvent, EventReceiver};
use tokio_util::sync::CancellationToken;

/// Tracing target for event pump operations.
const TRACING_TARGET: &str = "dsort_server::worker::event_pump";

/// Applies [`EngineEvent`]s to the controller in arrival order.
///
/// Events the state machine refuses, such as a completion racing an abort,
/// are logged and dropped.
#[derive(Debug, Clone)]
pub struct EventPump {
    controller: JobController,
}

impl EventPump {
    /// Creates a pump feeding `controller`.
    pub fn new(controller: JobController) -> Self {
        Self { controller }
    }

    /// Applies one event, logging a rejection instead of returning it.
    pub async fn dispatch(&self, event: EngineEvent) {
        let id = event.job_id();
        if let Err(error) = self.controller.apply(event).await {
            tracing::warn!(
                target: TRACING_TARGET,
                job_id = %id,
                error = %error,
                "Engine event dropped"
            );
        }
    }

    /// Run the event pump until cancelled or every sender is gone.
    pub async fn run(&self, events: EventReceiver, cancel: CancellationToken) {
        tracing::info!(target: TRACING_TARGET, "Starting event pump");

        self.run_inner(events, cancel).await;

        tracing::info!(target: TRACING_TARGET, "Event pump stopped");
    }

    async fn run_inner(&self, mut events: EventReceiver, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(target: TRACING_TARGET, "Event pump shutdown requested");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        tracing::debug!(target: TRACING_TARGET, "Engine event channel closed");
                        break;
                    };
                    self.dispatch(event).await;
                }
            }
        }
    }
}
