//! JSON extractor that runs `validator` checks after deserialization.

use std::borrow::Cow;
use std::collections::HashMap;

use aide::generate::GenContext;
use aide::openapi::{Operation, Response as ApiResponse};
use axum::extract::{FromRequest, Request};
use derive_more::{Deref, DerefMut, From};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors};

use super::Json;
use crate::TRACING_TARGET_VALIDATION;
use crate::handler::{Error, ErrorKind};

/// JSON extractor that also validates the body with [`Validate`].
///
/// Validation failures are reported as `400` with one sentence per failing
/// field.
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct ValidateJson<T>(pub T);

impl<T> ValidateJson<T> {
    /// Returns the inner validated value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T, S> FromRequest<S> for ValidateJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = <Json<T> as FromRequest<S>>::from_request(req, state).await?;
        data.validate()?;
        Ok(Self(data))
    }
}

fn bound(params: &HashMap<Cow<'static, str>, Value>, name: &str) -> Option<f64> {
    params.get(name).and_then(Value::as_f64)
}

/// Formats length and range failures from their `min`/`max` parameters.
fn format_bounds_error(
    field: &str,
    params: &HashMap<Cow<'static, str>, Value>,
    unit: &str,
) -> String {
    match (bound(params, "min"), bound(params, "max")) {
        (Some(min), Some(max)) => {
            format!("Field '{field}' must be between {min} and {max}{unit}")
        }
        (Some(min), None) => format!("Field '{field}' must be at least {min}{unit}"),
        (None, Some(max)) => format!("Field '{field}' must be at most {max}{unit}"),
        (None, None) => format!("Field '{field}' is out of its valid range"),
    }
}

fn format_validation_error(field: &str, error: &ValidationError) -> String {
    if let Some(custom_message) = &error.message {
        return format!("Field '{field}': {custom_message}");
    }

    match error.code.as_ref() {
        "required" => format!("Field '{field}' is required"),
        "length" => format_bounds_error(field, &error.params, " in length"),
        "range" => format_bounds_error(field, &error.params, ""),
        code => format!("Field '{field}' failed validation: {code}"),
    }
}

impl From<ValidationErrors> for Error<'static> {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, field_errors)| {
                field_errors
                    .iter()
                    .map(move |error| format_validation_error(field, error))
            })
            .collect();
        messages.sort();

        let message = match messages.as_slice() {
            [] => "Validation failed".to_owned(),
            _ => messages.join(". "),
        };

        tracing::debug!(
            target: TRACING_TARGET_VALIDATION,
            errors = ?errors.field_errors(),
            "Request validation failed"
        );

        ErrorKind::BadRequest
            .with_message(message)
            .with_resource("request")
    }
}

impl<T> aide::OperationInput for ValidateJson<T>
where
    T: schemars::JsonSchema,
{
    fn operation_input(ctx: &mut GenContext, operation: &mut Operation) {
        Json::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut GenContext,
        operation: &mut Operation,
    ) -> Vec<(Option<u16>, ApiResponse)> {
        Json::<T>::inferred_early_responses(ctx, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::FailSort;

    #[test]
    fn empty_reason_is_rejected() {
        let errors = FailSort {
            reason: String::new(),
        }
        .validate()
        .unwrap_err();

        let error = Error::from(errors);
        assert_eq!(error.kind(), ErrorKind::BadRequest);
        assert_eq!(
            error.message(),
            Some("Field 'reason' must be between 1 and 4096 in length")
        );
    }
}
