//! Middleware for `axum::Router` and HTTP request processing.
//!
//! ```rust,no_run
//! use axum::Router;
//! use dsort_server::middleware::{
//!     CorsConfig, RecoveryConfig, RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt,
//! };
//!
//! let app: Router = Router::new()
//!     .with_security(&CorsConfig::default())
//!     .with_observability()
//!     .with_recovery(&RecoveryConfig::default());
//! ```

mod auth;
mod observability;
pub mod open_api;
mod recovery;
pub mod security;

pub use auth::require_api_token;
pub use observability::RouterObservabilityExt;
pub use open_api::{OpenApiConfig, RouterOpenApiExt};
pub use recovery::{MAX_REQUEST_TIMEOUT_SECS, RecoveryConfig, RouterRecoveryExt};
pub use security::{CorsConfig, RouterSecurityExt};
