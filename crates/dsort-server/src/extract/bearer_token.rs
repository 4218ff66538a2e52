//! Bearer token extraction from the `Authorization` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use axum_extra::typed_header::TypedHeaderRejectionReason;

use crate::TRACING_TARGET_AUTHENTICATION;
use crate::handler::{Error, ErrorKind};

/// Raw bearer token sent by the client.
///
/// Rejects with `missing_auth_token` when the header is absent and with
/// `malformed_auth_token` when it is not a bearer credential.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        type AuthHeader = TypedHeader<Authorization<Bearer>>;

        match AuthHeader::from_request_parts(parts, state).await {
            Ok(TypedHeader(header)) => Ok(Self(header.token().to_owned())),
            Err(rejection) => {
                tracing::debug!(
                    target: TRACING_TARGET_AUTHENTICATION,
                    reason = %rejection,
                    "Authorization header rejected"
                );

                let kind = match rejection.reason() {
                    TypedHeaderRejectionReason::Missing => ErrorKind::MissingAuthToken,
                    _ => ErrorKind::MalformedAuthToken,
                };

                Err(kind.with_resource("authorization"))
            }
        }
    }
}
