//! JSON extractor and response with descriptive rejections.

use aide::generate::GenContext;
use aide::openapi::{Operation, Response as ApiResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Json as AxumJson, Request};
use axum::response::{IntoResponse, Response};
use derive_more::{Deref, DerefMut, From};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::sanitize_error_message;
use crate::handler::{Error, ErrorKind};

/// Maximum allowed JSON payload size in bytes (1MB).
pub const MAX_JSON_PAYLOAD_SIZE: usize = 1024 * 1024;

/// JSON extractor and response.
///
/// Behaves like [`axum::Json`] but rejects with an [`Error`] that names the
/// failing field or syntax problem.
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Creates a new [`Json`] wrapper around the provided value.
    #[inline]
    pub fn new(inner: T) -> Self {
        Self(inner)
    }

    /// Returns the inner value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extractor = <AxumJson<T> as FromRequest<S>>::from_request(req, state).await;
        extractor.map(|x| Self::new(x.0)).map_err(Into::into)
    }
}

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    #[inline]
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}

impl From<JsonRejection> for Error<'static> {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => ErrorKind::BadRequest
                .with_message("Invalid request data format")
                .with_context(format!(
                    "JSON deserialization failed: {}",
                    sanitize_error_message(&err.body_text(), 3, 200)
                )),
            JsonRejection::JsonSyntaxError(err) => ErrorKind::BadRequest
                .with_message("Invalid JSON syntax in request body")
                .with_context(format!(
                    "JSON parsing failed: {}",
                    sanitize_error_message(&err.body_text(), 3, 200)
                )),
            JsonRejection::MissingJsonContentType(_) => ErrorKind::BadRequest
                .with_message("Invalid content type")
                .with_context("Content-Type must be 'application/json'"),
            JsonRejection::BytesRejection(err) => {
                let message = err.body_text();
                if message.contains("length limit") {
                    ErrorKind::BadRequest
                        .with_message("Request body too large")
                        .with_context(format!(
                            "Request body exceeds the maximum of {MAX_JSON_PAYLOAD_SIZE} bytes"
                        ))
                } else {
                    ErrorKind::BadRequest
                        .with_message("Failed to read request body")
                        .with_context(sanitize_error_message(&message, 3, 200))
                }
            }
            other => ErrorKind::InternalServerError
                .with_message("Request processing failed")
                .with_context(sanitize_error_message(&other.body_text(), 3, 200)),
        }
    }
}

impl<T> aide::OperationInput for Json<T>
where
    T: schemars::JsonSchema,
{
    fn operation_input(ctx: &mut GenContext, operation: &mut Operation) {
        AxumJson::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut GenContext,
        operation: &mut Operation,
    ) -> Vec<(Option<u16>, ApiResponse)> {
        AxumJson::<T>::inferred_early_responses(ctx, operation)
    }
}

impl<T> aide::OperationOutput for Json<T>
where
    T: schemars::JsonSchema + Serialize,
{
    type Inner = T;

    fn operation_response(ctx: &mut GenContext, operation: &mut Operation) -> Option<ApiResponse> {
        AxumJson::<T>::operation_response(ctx, operation)
    }

    fn inferred_responses(
        ctx: &mut GenContext,
        operation: &mut Operation,
    ) -> Vec<(Option<u16>, ApiResponse)> {
        AxumJson::<T>::inferred_responses(ctx, operation)
    }
}
