//! Sort job records and their state machine.

use std::collections::BTreeMap;
use std::str::FromStr;

use derive_more::{Display, From, Into};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};
use uuid::Uuid;

use crate::error::{Error, ErrorKind, Result};
use crate::spec::SortSpec;

/// Mapping from metric name to its latest reported value.
pub type Metrics = BTreeMap<String, serde_json::Value>;

/// Opaque, never reused identifier of a sort job.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
)]
#[serde(transparent)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a new time-ordered identifier.
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for JobId {
    type Err = Error;

    /// Ids that are not UUIDs cannot belong to any job, so parsing reports them as unknown.
    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s).map(Self).map_err(|source| {
            Error::new(ErrorKind::NotFound)
                .with_message(format!("sort job {s} does not exist"))
                .with_source(source)
        })
    }
}

/// Lifecycle state of a sort job.
///
/// ```text
/// Running  -> Aborting | Completed | Failed
/// Aborting -> Aborted  | Failed
/// ```
///
/// `Aborted`, `Completed` and `Failed` are terminal.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub enum JobState {
    /// The job is executing.
    #[default]
    #[display("running")]
    Running,
    /// An abort was requested and the engine has not yet acknowledged it.
    #[display("aborting")]
    Aborting,
    /// The engine acknowledged the abort.
    #[display("aborted")]
    Aborted,
    /// The job finished successfully.
    #[display("completed")]
    Completed,
    /// The job failed.
    #[display("failed")]
    Failed,
}

impl JobState {
    /// Returns `true` if no transition leaves this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Aborted | Self::Completed | Self::Failed)
    }

    /// Returns `true` if the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;

        matches!(
            (self, next),
            (Running, Aborting)
                | (Running, Completed)
                | (Running, Failed)
                | (Aborting, Aborted)
                | (Aborting, Failed)
        )
    }
}

/// One distributed-sort execution.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    spec: SortSpec,
    state: JobState,
    metrics: Metrics,
    error: Option<String>,
    created_at: Timestamp,
    finished_at: Option<Timestamp>,
}

impl Job {
    /// Creates a running job with empty metrics.
    ///
    /// A shuffle without an explicit seed is seeded from the creation time.
    pub fn new(id: JobId, spec: SortSpec) -> Self {
        let created_at = Timestamp::now();
        Self {
            id,
            spec: spec.seeded_at(created_at),
            state: JobState::Running,
            metrics: Metrics::new(),
            error: None,
            created_at,
            finished_at: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn spec(&self) -> &SortSpec {
        &self.spec
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Failure reason recorded when the job entered `Failed`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Set once, when the job enters a terminal state.
    pub fn finished_at(&self) -> Option<Timestamp> {
        self.finished_at
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Applies a state change if the state machine allows it.
    pub(crate) fn transition(&mut self, next: JobState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::invalid_transition(self.state, next));
        }

        self.state = next;
        if next.is_terminal() {
            self.finished_at = Some(Timestamp::now());
        }

        Ok(())
    }

    /// Moves the job to `Failed` and records why.
    pub(crate) fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(JobState::Failed)?;
        self.error = Some(reason.into());
        Ok(())
    }

    /// Merges `partial` into the metrics, last write wins per key.
    pub(crate) fn merge_metrics(&mut self, partial: Metrics) -> Result<()> {
        if self.is_terminal() {
            return Err(Error::invalid_state(self.state, "record metrics for"));
        }

        self.metrics.extend(partial);
        Ok(())
    }

    /// Returns the metrics view served to clients.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            id: self.id,
            state: self.state,
            metrics: self.metrics.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }

    /// Returns a compact description of the job.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id,
            state: self.state,
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }

    /// Returns `true` if the job is terminal and finished no later than `cutoff`.
    pub(crate) fn finished_before(&self, cutoff: Timestamp) -> bool {
        self.is_terminal() && self.finished_at.is_some_and(|at| at <= cutoff)
    }
}

/// Point-in-time copy of a job's metrics and state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct MetricsSnapshot {
    /// Job identifier.
    pub id: JobId,
    /// Current lifecycle state.
    pub state: JobState,
    /// Latest value of every reported metric.
    pub metrics: Metrics,
    /// Failure reason, for failed jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the job was started.
    pub created_at: Timestamp,
    /// When the job reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
}

/// Compact job description used by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct JobSummary {
    /// Job identifier.
    pub id: JobId,
    /// Current lifecycle state.
    pub state: JobState,
    /// When the job was started.
    pub created_at: Timestamp,
    /// When the job reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
}
