//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! Sort and engine signal routes sit behind [`require_api_token`]; the
//! health route is public. Unknown paths answer with `404`.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler
//! [`require_api_token`]: crate::middleware::require_api_token

mod error;
mod monitors;
mod request;
mod response;
mod signals;
mod sorts;

use aide::axum::ApiRouter;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::request::{FailSort, SortPathParams};
pub use crate::handler::response::{ErrorResponse, MonitorStatus};
use crate::middleware::require_api_token;
use crate::service::ServiceState;

#[inline]
async fn handler() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns an [`ApiRouter`] with all routes guarded by the bearer token.
fn private_routes() -> ApiRouter<ServiceState> {
    ApiRouter::new()
        .merge(sorts::routes())
        .merge(signals::routes())
}

/// Returns an [`ApiRouter`] with all public routes.
fn public_routes() -> ApiRouter<ServiceState> {
    ApiRouter::new().merge(monitors::routes())
}

/// Returns an [`ApiRouter`] with all routes.
pub fn routes(state: ServiceState) -> ApiRouter<ServiceState> {
    let require_api_token = from_fn_with_state(state, require_api_token);

    let private_router = private_routes().route_layer(require_api_token);

    ApiRouter::new()
        .merge(private_router)
        .merge(public_routes())
        .fallback(handler)
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use dsort_core::engine::ExternalEngine;
    use dsort_core::{JobController, JobState, JobStore, JobSummary, MetricsSnapshot};
    use serde_json::json;

    use crate::handler::{ErrorResponse, MonitorStatus, routes};
    use crate::middleware::{OpenApiConfig, RouterOpenApiExt};
    use crate::service::{ApiToken, ServiceState};

    const TOKEN: &str = "test-token";

    fn create_state(api_token: Option<&str>, max_jobs: usize) -> ServiceState {
        let controller = JobController::new(JobStore::new(max_jobs), Arc::new(ExternalEngine));
        ServiceState::new(controller, api_token.map(ApiToken::new))
    }

    /// Returns a new [`TestServer`] with all routes over `state`.
    pub fn create_test_server_with_state(state: ServiceState) -> anyhow::Result<TestServer> {
        let app = routes(state.clone())
            .with_open_api(&OpenApiConfig::default())
            .with_state(state);
        let server = TestServer::new(app)?;
        Ok(server)
    }

    /// Returns a new [`TestServer`] without a bearer token.
    pub fn create_test_server() -> anyhow::Result<TestServer> {
        create_test_server_with_state(create_state(None, 16))
    }

    async fn start_content_sort(server: &TestServer) -> String {
        let response = server
            .post("/sort/start")
            .json(&json!({ "shards": ["shard-0", "shard-1"], "algorithm": "content" }))
            .await;
        response.assert_status_ok();
        response.text()
    }

    #[tokio::test]
    async fn handlers() -> anyhow::Result<()> {
        let server = create_test_server()?;
        assert!(server.is_running());
        Ok(())
    }

    #[tokio::test]
    async fn abort_lifecycle_over_http() -> anyhow::Result<()> {
        let server = create_test_server()?;
        let id = start_content_sort(&server).await;

        let snapshot: MetricsSnapshot = server.get(&format!("/sort/metrics/{id}")).await.json();
        assert_eq!(snapshot.state, JobState::Running);
        assert!(snapshot.metrics.is_empty());

        server
            .post(&format!("/internal/sort/{id}/progress"))
            .json(&json!({ "bytesSorted": 100 }))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .delete(&format!("/sort/abort/{id}"))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let snapshot: MetricsSnapshot = server.get(&format!("/sort/metrics/{id}")).await.json();
        assert_eq!(snapshot.state, JobState::Aborting);

        server
            .post(&format!("/internal/sort/{id}/abort-ack"))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let snapshot: MetricsSnapshot = server.get(&format!("/sort/metrics/{id}")).await.json();
        assert_eq!(snapshot.state, JobState::Aborted);
        assert_eq!(snapshot.metrics["bytesSorted"], json!(100));
        assert!(snapshot.finished_at.is_some());

        server
            .delete(&format!("/sort/abort/{id}"))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let again: MetricsSnapshot = server.get(&format!("/sort/metrics/{id}")).await.json();
        assert_eq!(again, snapshot);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_spec_is_rejected() -> anyhow::Result<()> {
        let server = create_test_server()?;

        let response = server
            .post("/sort/start")
            .json(&json!({ "shards": ["a"] }))
            .await;
        response.assert_status_bad_request();

        let unbounded = server
            .post("/sort/start")
            .json(&json!({
                "input_format": "s-{0..18446744073709551615}",
                "algorithm": "alphanumeric",
            }))
            .await;
        unbounded.assert_status_bad_request();

        let listed: Vec<JobSummary> = server.get("/sort/list").await.json();
        assert!(listed.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids_are_not_found() -> anyhow::Result<()> {
        let server = create_test_server()?;

        let malformed = server.get("/sort/metrics/not-a-uuid").await;
        malformed.assert_status_not_found();
        let body: serde_json::Value = malformed.json();
        assert_eq!(body["name"], ErrorResponse::NOT_FOUND.name.as_ref());

        server
            .delete("/sort/abort/0190f3c2-8a4e-7b4c-9d2e-3f5a6b7c8d9e")
            .await
            .assert_status_not_found();

        server
            .post("/internal/sort/not-a-uuid/complete")
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[tokio::test]
    async fn completed_job_rejects_progress() -> anyhow::Result<()> {
        let server = create_test_server()?;
        let id = start_content_sort(&server).await;

        server
            .post(&format!("/internal/sort/{id}/complete"))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .post(&format!("/internal/sort/{id}/progress"))
            .json(&json!({ "late": 1 }))
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .post(&format!("/internal/sort/{id}/abort-ack"))
            .await
            .assert_status_bad_request();
        Ok(())
    }

    #[tokio::test]
    async fn failure_reason_is_reported() -> anyhow::Result<()> {
        let server = create_test_server()?;
        let id = start_content_sort(&server).await;

        server
            .post(&format!("/internal/sort/{id}/fail"))
            .json(&json!({ "reason": "" }))
            .await
            .assert_status_bad_request();

        server
            .post(&format!("/internal/sort/{id}/fail"))
            .json(&json!({ "reason": "target t2 crashed" }))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let snapshot: MetricsSnapshot = server.get(&format!("/sort/metrics/{id}")).await.json();
        assert_eq!(snapshot.state, JobState::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("target t2 crashed"));
        Ok(())
    }

    #[tokio::test]
    async fn list_returns_jobs_in_creation_order() -> anyhow::Result<()> {
        let server = create_test_server()?;
        let first = start_content_sort(&server).await;
        let second = start_content_sort(&server).await;

        let listed: Vec<JobSummary> = server.get("/sort/list").await.json();
        let ids: Vec<String> = listed.iter().map(|job| job.id.to_string()).collect();
        assert_eq!(ids, vec![first, second]);
        Ok(())
    }

    #[tokio::test]
    async fn full_store_is_unavailable() -> anyhow::Result<()> {
        let server = create_test_server_with_state(create_state(None, 1))?;
        start_content_sort(&server).await;

        server
            .post("/sort/start")
            .json(&json!({ "shards": ["a"], "algorithm": "alphanumeric" }))
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let health = server.get("/health").await;
        health.assert_status_ok();
        let status: MonitorStatus = health.json();
        assert_eq!(status.health.metrics["jobs"], 1);
        Ok(())
    }

    #[tokio::test]
    async fn sort_routes_require_configured_token() -> anyhow::Result<()> {
        let server = create_test_server_with_state(create_state(Some(TOKEN), 16))?;

        server.get("/sort/list").await.assert_status_unauthorized();
        server
            .get("/sort/list")
            .authorization_bearer("wrong")
            .await
            .assert_status_unauthorized();
        server
            .post("/internal/sort/0190f3c2-8a4e-7b4c-9d2e-3f5a6b7c8d9e/complete")
            .await
            .assert_status_unauthorized();

        server
            .get("/sort/list")
            .authorization_bearer(TOKEN)
            .await
            .assert_status_ok();
        server.get("/health").await.assert_status_ok();
        Ok(())
    }

    #[tokio::test]
    async fn unknown_path_falls_back_to_not_found() -> anyhow::Result<()> {
        let server = create_test_server()?;
        server.get("/does/not/exist").await.assert_status_not_found();
        Ok(())
    }

    #[tokio::test]
    async fn openapi_document_lists_sort_routes() -> anyhow::Result<()> {
        let server = create_test_server()?;

        let document: serde_json::Value = server.get("/api/openapi.json").await.json();
        assert!(document["paths"]["/sort/start"]["post"].is_object());
        assert!(document["paths"]["/sort/metrics/{sort_uuid}"]["get"].is_object());
        Ok(())
    }
}
