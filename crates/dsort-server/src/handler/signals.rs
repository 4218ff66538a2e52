//! Internal routes through which an out-of-process engine reports back.
//!
//! Each route maps onto one controller signal and answers `204` once the
//! signal was applied. State machine violations surface as `400`, reports
//! for finished jobs as `409`.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;
use dsort_core::{JobController, Metrics};

use crate::extract::{Json, Path, ValidateJson};
use crate::handler::Result;
use crate::handler::request::{FailSort, SortPathParams};
use crate::handler::response::ErrorResponse;
use crate::service::ServiceState;

/// Tracing target for engine signal operations.
const TRACING_TARGET: &str = "dsort_server::handler::signals";

/// Merges reported metrics into the job.
#[tracing::instrument(skip_all, fields(sort_uuid = %path_params.sort_uuid))]
async fn report_progress(
    State(controller): State<JobController>,
    Path(path_params): Path<SortPathParams>,
    Json(metrics): Json<Metrics>,
) -> Result<StatusCode> {
    let id = path_params.job_id()?;
    let metric_count = metrics.len();
    controller.report_progress(id, metrics).await?;

    tracing::trace!(target: TRACING_TARGET, job_id = %id, metric_count, "Progress reported");
    Ok(StatusCode::NO_CONTENT)
}

fn report_progress_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Report progress")
        .description("Merges the given metric values into the running or aborting job.")
        .response::<204, ()>()
        .response::<400, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
        .response::<409, Json<ErrorResponse>>()
}

/// Marks a running job as completed.
#[tracing::instrument(skip_all, fields(sort_uuid = %path_params.sort_uuid))]
async fn complete_sort(
    State(controller): State<JobController>,
    Path(path_params): Path<SortPathParams>,
) -> Result<StatusCode> {
    let id = path_params.job_id()?;
    controller.complete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn complete_sort_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Complete sort")
        .description("Moves a running job to `Completed`.")
        .response::<204, ()>()
        .response::<400, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Marks a running or aborting job as failed.
#[tracing::instrument(skip_all, fields(sort_uuid = %path_params.sort_uuid))]
async fn fail_sort(
    State(controller): State<JobController>,
    Path(path_params): Path<SortPathParams>,
    ValidateJson(request): ValidateJson<FailSort>,
) -> Result<StatusCode> {
    let id = path_params.job_id()?;
    controller.fail(id, request.reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn fail_sort_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Fail sort")
        .description("Moves a running or aborting job to `Failed` and records the reason.")
        .response::<204, ()>()
        .response::<400, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Confirms that every worker of an aborting job stopped.
#[tracing::instrument(skip_all, fields(sort_uuid = %path_params.sort_uuid))]
async fn acknowledge_abort(
    State(controller): State<JobController>,
    Path(path_params): Path<SortPathParams>,
) -> Result<StatusCode> {
    let id = path_params.job_id()?;
    controller.acknowledge_abort(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn acknowledge_abort_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Acknowledge abort")
        .description("Moves an aborting job to `Aborted`.")
        .response::<204, ()>()
        .response::<400, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Returns an [`ApiRouter`] with all engine signal routes.
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route(
            "/internal/sort/{sort_uuid}/progress",
            post_with(report_progress, report_progress_docs),
        )
        .api_route(
            "/internal/sort/{sort_uuid}/complete",
            post_with(complete_sort, complete_sort_docs),
        )
        .api_route(
            "/internal/sort/{sort_uuid}/fail",
            post_with(fail_sort, fail_sort_docs),
        )
        .api_route(
            "/internal/sort/{sort_uuid}/abort-ack",
            post_with(acknowledge_abort, acknowledge_abort_docs),
        )
        .with_path_items(|item| item.tag("Engine Signals"))
}
