//! Middleware configuration for the HTTP server.

use clap::Args;
use dsort_server::middleware::{CorsConfig, OpenApiConfig, RecoveryConfig};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// CORS, OpenAPI and recovery settings.
#[derive(Debug, Clone, Default, Args, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// CORS (Cross-Origin Resource Sharing) configuration.
    #[clap(flatten)]
    pub cors: CorsConfig,

    /// Paths of the OpenAPI document and the Scalar UI.
    #[clap(flatten)]
    pub openapi: OpenApiConfig,

    /// Request timeout and panic recovery.
    #[clap(flatten)]
    pub recovery: RecoveryConfig,
}

impl MiddlewareConfig {
    /// Logs middleware configuration at info level.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            origins = ?self.cors.allowed_origins,
            credentials = self.cors.allow_credentials,
            openapi_path = %self.openapi.open_api_json,
            scalar_path = %self.openapi.scalar_ui,
            request_timeout_secs = self.recovery.request_timeout,
            "Middleware configuration"
        );
    }
}
