//! Conversion of job lifecycle errors into HTTP errors.

use dsort_core::{Error as CoreError, ErrorKind as CoreErrorKind};

use super::http_error::{Error as HttpError, ErrorKind as HttpErrorKind};

/// Tracing target for lifecycle error conversion.
const TRACING_TARGET: &str = "dsort_server::handler::error";

impl From<CoreError> for HttpError<'static> {
    fn from(error: CoreError) -> Self {
        let kind = match error.kind() {
            CoreErrorKind::InvalidSpec | CoreErrorKind::InvalidTransition => {
                HttpErrorKind::BadRequest
            }
            CoreErrorKind::NotFound => HttpErrorKind::NotFound,
            CoreErrorKind::InvalidState => HttpErrorKind::Conflict,
            CoreErrorKind::ResourceExhausted => HttpErrorKind::ServiceUnavailable,
        };

        if kind == HttpErrorKind::ServiceUnavailable {
            tracing::warn!(target: TRACING_TARGET, error = %error, "Sort job capacity exhausted");
        }

        let converted = kind.into_error().with_resource("sort_job");
        match error.message {
            Some(message) => converted.with_message(message),
            None => converted,
        }
    }
}
