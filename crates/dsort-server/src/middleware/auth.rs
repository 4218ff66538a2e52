use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::TRACING_TARGET_AUTHENTICATION;
use crate::extract::BearerToken;
use crate::handler::{Error, ErrorKind};
use crate::service::ApiToken;

/// Requires `Authorization: Bearer <token>` matching the configured token.
///
/// Passes every request through when no token is configured.
///
/// ```rust,ignore
/// use axum::middleware::from_fn_with_state;
/// use dsort_server::middleware::require_api_token;
///
/// let guard = from_fn_with_state(state.clone(), require_api_token);
/// ```
pub async fn require_api_token(
    State(api_token): State<Option<ApiToken>>,
    bearer: Result<BearerToken, Error<'static>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = api_token else {
        return next.run(request).await;
    };

    match bearer {
        Ok(token) if expected.matches(token.as_str()) => next.run(request).await,
        Ok(_) => {
            tracing::warn!(
                target: TRACING_TARGET_AUTHENTICATION,
                path = %request.uri().path(),
                "Rejected request with invalid bearer token"
            );
            ErrorKind::Unauthorized.into_response()
        }
        Err(rejection) => rejection.into_response(),
    }
}
