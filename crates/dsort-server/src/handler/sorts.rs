//! Public sort job handlers: start, abort, metrics and listing.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;
use dsort_core::spec::SortSpecRequest;
use dsort_core::{JobController, JobSummary, MetricsSnapshot};

use crate::extract::{Json, Path, ValidateJson};
use crate::handler::Result;
use crate::handler::request::SortPathParams;
use crate::handler::response::ErrorResponse;
use crate::service::ServiceState;

/// Tracing target for sort job operations.
const TRACING_TARGET: &str = "dsort_server::handler::sorts";

/// Starts a sort job and answers with its id as plain text.
#[tracing::instrument(skip_all)]
async fn start_sort(
    State(controller): State<JobController>,
    ValidateJson(request): ValidateJson<SortSpecRequest>,
) -> Result<(StatusCode, String)> {
    tracing::debug!(target: TRACING_TARGET, "Starting sort job");

    let id = controller.start_job(request).await?;

    tracing::info!(target: TRACING_TARGET, job_id = %id, "Sort job accepted");
    Ok((StatusCode::OK, id.to_string()))
}

fn start_sort_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Start sort")
        .description(
            "Validates the sort specification, creates a running job and returns its id \
             as plain text. Either `shards` or `input_format` selects the input.",
        )
        .response::<200, String>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
        .response::<503, Json<ErrorResponse>>()
}

/// Requests that a sort job stop.
#[tracing::instrument(skip_all, fields(sort_uuid = %path_params.sort_uuid))]
async fn abort_sort(
    State(controller): State<JobController>,
    Path(path_params): Path<SortPathParams>,
) -> Result<StatusCode> {
    let id = path_params.job_id()?;
    controller.abort_job(id).await?;

    tracing::debug!(target: TRACING_TARGET, job_id = %id, "Sort job abort requested");
    Ok(StatusCode::NO_CONTENT)
}

fn abort_sort_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Abort sort")
        .description(
            "Asks the engine to stop the job. Aborting a job that is already aborting \
             or finished succeeds without changing it.",
        )
        .response::<204, ()>()
        .response::<401, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Returns the metrics and state of a sort job.
#[tracing::instrument(skip_all, fields(sort_uuid = %path_params.sort_uuid))]
async fn sort_metrics(
    State(controller): State<JobController>,
    Path(path_params): Path<SortPathParams>,
) -> Result<(StatusCode, Json<MetricsSnapshot>)> {
    let id = path_params.job_id()?;
    let snapshot = controller.get_metrics(id).await?;

    tracing::debug!(
        target: TRACING_TARGET,
        job_id = %id,
        state = %snapshot.state,
        metric_count = snapshot.metrics.len(),
        "Sort metrics read"
    );

    Ok((StatusCode::OK, Json(snapshot)))
}

fn sort_metrics_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get sort metrics")
        .description("Returns the latest metrics, state and timestamps of the job.")
        .response::<200, Json<MetricsSnapshot>>()
        .response::<401, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Lists every retained sort job.
#[tracing::instrument(skip_all)]
async fn list_sorts(
    State(controller): State<JobController>,
) -> Result<(StatusCode, Json<Vec<JobSummary>>)> {
    let jobs = controller.list_jobs().await;

    tracing::debug!(target: TRACING_TARGET, job_count = jobs.len(), "Sort jobs listed");
    Ok((StatusCode::OK, Json(jobs)))
}

fn list_sorts_docs(op: TransformOperation) -> TransformOperation {
    op.summary("List sorts")
        .description("Returns every retained job, oldest first.")
        .response::<200, Json<Vec<JobSummary>>>()
        .response::<401, Json<ErrorResponse>>()
}

/// Returns an [`ApiRouter`] with all public sort routes.
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/sort/start", post_with(start_sort, start_sort_docs))
        .api_route(
            "/sort/abort/{sort_uuid}",
            delete_with(abort_sort, abort_sort_docs),
        )
        .api_route(
            "/sort/metrics/{sort_uuid}",
            get_with(sort_metrics, sort_metrics_docs),
        )
        .api_route("/sort/list", get_with(list_sorts, list_sorts_docs))
        .with_path_items(|item| item.tag("Sort"))
}
