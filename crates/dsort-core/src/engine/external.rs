use async_trait::async_trait;

use super::SortEngine;
use crate::TRACING_TARGET_ENGINE;
use crate::job::{Job, JobId};

/// Engine running outside this process.
///
/// Start and abort requests are only logged; the out-of-process engine picks
/// jobs up on its own and reports back through the internal signal routes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExternalEngine;

#[async_trait]
impl SortEngine for ExternalEngine {
    fn name(&self) -> &'static str {
        "external"
    }

    async fn start(&self, job: &Job) {
        tracing::info!(
            target: TRACING_TARGET_ENGINE,
            job_id = %job.id(),
            shards = job.spec().input().len(),
            algorithm = %job.spec().algorithm().kind(),
            "Sort job awaiting external engine"
        );
    }

    async fn request_abort(&self, id: JobId) {
        tracing::info!(
            target: TRACING_TARGET_ENGINE,
            job_id = %id,
            "Abort requested from external engine"
        );
    }
}
