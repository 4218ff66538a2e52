//! Path parameter extractor with descriptive rejections.

use aide::generate::GenContext;
use aide::openapi::{Operation, Response as ApiResponse};
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequestParts, Path as AxumPath};
use axum::http::request::Parts;
use derive_more::{Deref, DerefMut, From};
use serde::de::DeserializeOwned;

use super::sanitize_error_message;
use crate::handler::{Error, ErrorKind};

/// Path parameter extractor.
///
/// Behaves like [`axum::extract::Path`] but rejects with an [`Error`].
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct Path<T>(pub T);

impl<T> Path<T> {
    /// Returns the inner path parameters.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let extractor =
            <AxumPath<T> as FromRequestParts<S>>::from_request_parts(parts, state).await;
        extractor.map(|x| Self(x.0)).map_err(Into::into)
    }
}

impl From<PathRejection> for Error<'static> {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(err) => ErrorKind::BadRequest
                .with_message("Invalid path parameter format")
                .with_context(sanitize_error_message(&err.body_text(), 2, 150)),
            PathRejection::MissingPathParams(err) => ErrorKind::MissingPathParam
                .with_message("Required path parameter missing")
                .with_context(sanitize_error_message(&err.body_text(), 2, 150)),
            _ => ErrorKind::InternalServerError
                .with_message("Path processing failed")
                .with_context("Unexpected error during path parameter extraction"),
        }
    }
}

impl<T> aide::OperationInput for Path<T>
where
    T: schemars::JsonSchema,
{
    fn operation_input(ctx: &mut GenContext, operation: &mut Operation) {
        AxumPath::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut GenContext,
        operation: &mut Operation,
    ) -> Vec<(Option<u16>, ApiResponse)> {
        AxumPath::<T>::inferred_early_responses(ctx, operation)
    }
}
