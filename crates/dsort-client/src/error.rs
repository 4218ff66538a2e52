//! Client error types.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error returned by [`Client`] operations.
///
/// [`Client`]: crate::Client
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be sent or the response not read.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// A response body could not be decoded.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The gateway answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api { status: StatusCode, body: String },
    /// The configuration or a success response was unusable.
    #[error("Invalid {0}")]
    Invalid(String),
}

/// JSON error object returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable error name, e.g. `not_found`.
    pub name: String,
    /// Human-readable description.
    pub message: String,
    /// Resource the error refers to.
    #[serde(default)]
    pub resource: Option<String>,
    /// Additional context.
    #[serde(default)]
    pub context: Option<String>,
}

impl Error {
    /// Returns the HTTP status of an [`Error::Api`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Reqwest(err) => err.status(),
            _ => None,
        }
    }

    /// Decodes the gateway's error object of an [`Error::Api`].
    pub fn api_error(&self) -> Option<ApiErrorBody> {
        match self {
            Self::Api { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }

    /// Returns `true` if the gateway does not know the addressed job.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}
