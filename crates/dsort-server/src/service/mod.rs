//! Application state and dependency injection.

mod config;

use std::sync::Arc;

use dsort_core::engine::EventSender;
use dsort_core::{JobController, JobStore, ServiceHealth};
use tokio_util::sync::CancellationToken;

pub use crate::service::config::{EngineKind, ServiceConfig, ServiceConfigBuilder};

/// Static bearer token guarding the sort and internal routes.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(Arc<str>);

impl ApiToken {
    /// Wraps `token`.
    pub fn new(token: &str) -> Self {
        Self(Arc::from(token))
    }

    /// Returns `true` if `candidate` equals the token.
    ///
    /// Compares every byte regardless of where the first mismatch is.
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let candidate = candidate.as_bytes();

        expected.len() == candidate.len()
            && expected
                .iter()
                .zip(candidate)
                .fold(0u8, |diff, (a, b)| diff | (a ^ b))
                == 0
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(..)")
    }
}

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    controller: JobController,
    api_token: Option<ApiToken>,
}

impl ServiceState {
    /// Creates state over an existing controller.
    pub fn new(controller: JobController, api_token: Option<ApiToken>) -> Self {
        Self {
            controller,
            api_token,
        }
    }

    /// Initializes application state from configuration.
    ///
    /// Engines created here report through `events`; see
    /// [`ServiceConfig::create_engine`].
    pub fn from_config(
        config: &ServiceConfig,
        events: EventSender,
        shutdown: CancellationToken,
    ) -> Self {
        let store = JobStore::new(config.max_jobs);
        let engine = config.create_engine(events, shutdown);
        let api_token = config.api_token().map(ApiToken::new);

        Self::new(JobController::new(store, engine), api_token)
    }

    /// Returns the job lifecycle controller.
    pub fn controller(&self) -> &JobController {
        &self.controller
    }

    /// Returns the configured bearer token, if any.
    pub fn api_token(&self) -> Option<&ApiToken> {
        self.api_token.as_ref()
    }

    /// Reports store occupancy; a full store is degraded.
    pub async fn health(&self) -> ServiceHealth {
        let store = self.controller.store();
        let jobs = store.len().await;
        let capacity = store.capacity();

        let health = if jobs >= capacity {
            ServiceHealth::degraded("job store is at capacity")
        } else {
            ServiceHealth::healthy()
        };

        health
            .with_metric("jobs", jobs)
            .with_metric("capacity", capacity)
            .with_metric("engine", self.controller.engine_name())
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(controller: JobController);
impl_di!(api_token: Option<ApiToken>);

#[cfg(test)]
mod tests {
    use dsort_core::ServiceStatus;
    use dsort_core::engine::event_channel;

    use super::*;

    #[test]
    fn token_comparison() {
        let token = ApiToken::new("s3cret");
        assert!(token.matches("s3cret"));
        assert!(!token.matches("s3cres"));
        assert!(!token.matches("s3cret-longer"));
        assert!(!token.matches(""));
    }

    #[tokio::test]
    async fn health_reports_store_occupancy() {
        let (events, _receiver) = event_channel(8);
        let config = ServiceConfig::default();
        let state = ServiceState::from_config(&config, events, CancellationToken::new());

        let health = state.health().await;
        assert_eq!(health.status, ServiceStatus::Healthy);
        assert_eq!(health.metrics["jobs"], 0);
        assert_eq!(health.metrics["capacity"], 10_000);
        assert_eq!(health.metrics["engine"], "external");
    }
}
