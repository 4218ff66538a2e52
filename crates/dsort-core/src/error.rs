//! Job lifecycle error definitions.

use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;

use crate::job::{JobId, JobState};

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors produced by the job store and controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The sort specification is malformed or incomplete.
    InvalidSpec,
    /// The operation referenced an unknown job.
    NotFound,
    /// The requested state change is not allowed by the job state machine.
    InvalidTransition,
    /// The job's current state forbids the operation.
    InvalidState,
    /// Identifier allocation or storage capacity failed.
    ResourceExhausted,
}

impl ErrorKind {
    /// Returns `true` if the caller may retry the operation after a backoff.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ResourceExhausted)
    }
}

/// A structured error type for job lifecycle operations.
#[derive(Debug, Error)]
#[error("{kind}{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new invalid specification error.
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSpec).with_message(message)
    }

    /// Creates a new not found error for the given job.
    pub fn not_found(id: JobId) -> Self {
        Self::new(ErrorKind::NotFound).with_message(format!("sort job {id} does not exist"))
    }

    /// Creates a new invalid transition error.
    pub fn invalid_transition(from: JobState, to: JobState) -> Self {
        Self::new(ErrorKind::InvalidTransition)
            .with_message(format!("cannot transition from {from} to {to}"))
    }

    /// Creates a new invalid state error.
    pub fn invalid_state(state: JobState, operation: &str) -> Self {
        Self::new(ErrorKind::InvalidState)
            .with_message(format!("cannot {operation} a job in state {state}"))
    }

    /// Creates a new resource exhausted error.
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceExhausted).with_message(message)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns the error message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let error = Error::invalid_spec("missing shard selection");
        assert_eq!(error.to_string(), "invalid_spec: missing shard selection");
        assert_eq!(error.kind_str(), "invalid_spec");
    }

    #[test]
    fn display_without_message() {
        let error = Error::new(ErrorKind::InvalidState);
        assert_eq!(error.to_string(), "invalid_state");
    }

    #[test]
    fn only_resource_exhaustion_is_retryable() {
        assert!(ErrorKind::ResourceExhausted.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
        assert!(!ErrorKind::InvalidSpec.is_retryable());
    }
}
