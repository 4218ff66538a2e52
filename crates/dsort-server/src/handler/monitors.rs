//! Health monitoring handlers.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;

use crate::extract::Json;
use crate::handler::Result;
use crate::handler::response::MonitorStatus;
use crate::service::ServiceState;

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "dsort_server::handler::monitors";

#[tracing::instrument(skip_all)]
async fn health_status(
    State(state): State<ServiceState>,
) -> Result<(StatusCode, Json<MonitorStatus>)> {
    let health = state.health().await;
    let status_code = if health.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::debug!(
        target: TRACING_TARGET,
        status = ?health.status,
        "Health status check requested"
    );

    Ok((status_code, Json(MonitorStatus::new(health))))
}

fn health_status_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get system health status")
        .description(
            "Reports job store occupancy and the active engine. A full store is \
             reported as degraded but still answers `200`.",
        )
        .response::<200, Json<MonitorStatus>>()
        .response::<503, Json<MonitorStatus>>()
}

/// Returns an [`ApiRouter`] with all monitor routes.
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/health", get_with(health_status, health_status_docs))
        .with_path_items(|item| item.tag("Monitors"))
}
