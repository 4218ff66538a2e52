//! Recovery from handler panics and request timeouts.

use std::any::Any;
use std::future::ready;
use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::response::{IntoResponse, Response};
#[cfg(feature = "config")]
use clap::Args;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::catch_panic::CatchPanicLayer;

use crate::handler::{Error, ErrorKind};
use crate::{TRACING_TARGET_RECOVERY_ERROR, TRACING_TARGET_RECOVERY_PANIC};

type ResponseFut = BoxFuture<'static, Response>;
type Panic = Box<dyn Any + Send + 'static>;

/// Largest accepted request timeout in seconds.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Configuration for recovery middleware behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct RecoveryConfig {
    /// Maximum duration in seconds to wait for a request to complete.
    /// Requests exceeding this duration receive a 408 response.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_TIMEOUT", default_value = "30")
    )]
    pub request_timeout: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            request_timeout: 30,
        }
    }
}

impl RecoveryConfig {
    /// Creates a new configuration with the specified request timeout in seconds.
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self {
            request_timeout: secs,
        }
    }

    /// Checks that the timeout lies between 1 and [`MAX_REQUEST_TIMEOUT_SECS`] seconds.
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout == 0 || self.request_timeout > MAX_REQUEST_TIMEOUT_SECS {
            return Err(format!(
                "Request timeout {} seconds is invalid. Must be between 1 and {MAX_REQUEST_TIMEOUT_SECS} seconds.",
                self.request_timeout
            ));
        }

        Ok(())
    }

    /// Returns the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Extension trait for `axum::`[`Router`] to apply recovery middleware.
pub trait RouterRecoveryExt<S> {
    /// Layers timeout enforcement and panic recovery.
    ///
    /// Timeouts answer `408`, panics and other middleware errors answer `500`.
    fn with_recovery(self, config: &RecoveryConfig) -> Self;
}

impl<S> RouterRecoveryExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_recovery(self, config: &RecoveryConfig) -> Self {
        let middlewares = ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .layer(CatchPanicLayer::custom(catch_panic))
            .layer(TimeoutLayer::new(config.request_timeout()));

        self.layer(middlewares)
    }
}

fn handle_error(err: tower::BoxError) -> ResponseFut {
    use tower::timeout::error::Elapsed;

    let error = if err.is::<Elapsed>() {
        tracing::warn!(
            target: TRACING_TARGET_RECOVERY_ERROR,
            error = %err,
            "Request timeout exceeded"
        );

        ErrorKind::RequestTimeout
            .with_message("Request timeout")
            .with_context("The request took too long to process and was terminated")
    } else {
        tracing::error!(
            target: TRACING_TARGET_RECOVERY_ERROR,
            error = %err,
            "Unknown middleware error"
        );

        ErrorKind::InternalServerError
            .with_message("An unexpected error occurred")
            .with_context(err.to_string())
    };

    ready(error.into_response()).boxed()
}

fn catch_panic(err: Panic) -> Response {
    if let Some(error) = err.downcast_ref::<Error>() {
        tracing::error!(
            target: TRACING_TARGET_RECOVERY_PANIC,
            error = %error,
            "Service panic"
        );
        return error.clone().into_response();
    }

    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic type");

    tracing::error!(
        target: TRACING_TARGET_RECOVERY_PANIC,
        message = %message,
        "Service panic"
    );

    Error::new(ErrorKind::InternalServerError)
        .with_message("An unexpected panic occurred")
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum_test::TestServer;

    use super::*;

    async fn panics() -> &'static str {
        panic!("handler exploded")
    }

    async fn sleeps() -> &'static str {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "late"
    }

    fn server() -> TestServer {
        let router = Router::new()
            .route("/panic", get(panics))
            .route("/slow", get(sleeps))
            .with_recovery(&RecoveryConfig::with_timeout_secs(1));
        TestServer::new(router).unwrap()
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let response = server().get("/panic").expect_failure().await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn timeout_bounds_are_enforced() {
        assert!(RecoveryConfig::default().validate().is_ok());
        assert!(RecoveryConfig::with_timeout_secs(MAX_REQUEST_TIMEOUT_SECS).validate().is_ok());
        assert!(RecoveryConfig::with_timeout_secs(0).validate().is_err());
        assert!(RecoveryConfig::with_timeout_secs(MAX_REQUEST_TIMEOUT_SECS + 1).validate().is_err());
    }

    #[tokio::test]
    async fn slow_requests_time_out() {
        let response = server().get("/slow").expect_failure().await;
        response.assert_status(StatusCode::REQUEST_TIMEOUT);
    }
}
