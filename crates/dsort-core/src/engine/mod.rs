//! Sort execution engines.
//!
//! The controller hands started jobs to a [`SortEngine`] and forwards abort
//! requests to it. Neither call waits for the sort itself: engines report
//! progress, completion, failure and abort acknowledgment later as
//! [`EngineEvent`]s on a channel that a worker drains into the controller.

mod external;
mod simulated;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use self::external::ExternalEngine;
pub use self::simulated::{SimulatedEngine, SimulatedEngineConfig};
use crate::job::{Job, JobId, Metrics};

/// Capacity of the engine event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Asynchronous signal from an engine about one job.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// New or updated metric values.
    Progress { id: JobId, metrics: Metrics },
    /// The sort finished.
    Completed { id: JobId },
    /// The sort failed.
    Failed { id: JobId, reason: String },
    /// Every worker stopped after an abort request.
    AbortAcknowledged { id: JobId },
}

impl EngineEvent {
    /// Job the event refers to.
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Progress { id, .. }
            | Self::Completed { id }
            | Self::Failed { id, .. }
            | Self::AbortAcknowledged { id } => *id,
        }
    }
}

/// Sending half of the engine event channel.
pub type EventSender = mpsc::Sender<EngineEvent>;

/// Receiving half of the engine event channel.
pub type EventReceiver = mpsc::Receiver<EngineEvent>;

/// Creates the channel engines report through.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity)
}

/// Executes sort jobs on behalf of the controller.
///
/// Implementations must return from both methods promptly; the work they
/// trigger runs in the background and reports back through [`EngineEvent`]s.
#[async_trait]
pub trait SortEngine: Send + Sync + 'static {
    /// Short engine name used in logs.
    fn name(&self) -> &'static str;

    /// Begins executing a freshly created job.
    async fn start(&self, job: &Job);

    /// Asks the engine to stop a job. Best effort.
    async fn request_abort(&self, id: JobId);
}
