//! Job lifecycle controller.
//!
//! The controller is the only entry point the gateway uses. It validates
//! start requests, drives the state machine through the [`JobStore`] and
//! forwards work to the [`SortEngine`] without ever waiting on it.

use std::sync::Arc;

use crate::TRACING_TARGET_CONTROLLER;
use crate::engine::{EngineEvent, SortEngine};
use crate::error::{ErrorKind, Result};
use crate::job::{JobId, JobState, JobSummary, Metrics, MetricsSnapshot};
use crate::spec::{SortSpec, SortSpecRequest};
use crate::store::JobStore;

/// Enforces the job state machine and exposes the sort operations.
#[derive(Clone)]
pub struct JobController {
    store: JobStore,
    engine: Arc<dyn SortEngine>,
}

impl std::fmt::Debug for JobController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobController")
            .field("store", &self.store)
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl JobController {
    /// Creates a controller over `store` that runs jobs on `engine`.
    pub fn new(store: JobStore, engine: Arc<dyn SortEngine>) -> Self {
        Self { store, engine }
    }

    /// Returns the underlying job store.
    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Returns the name of the engine jobs run on.
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Validates `request`, creates a running job and hands it to the engine.
    ///
    /// No job is created when the specification is invalid.
    pub async fn start_job(&self, request: SortSpecRequest) -> Result<JobId> {
        let spec = SortSpec::try_from(request).inspect_err(|error| {
            tracing::debug!(
                target: TRACING_TARGET_CONTROLLER,
                error = %error,
                "Rejected sort specification"
            );
        })?;

        let shards = spec.input().len();
        let algorithm = spec.algorithm().kind();
        let id = self.store.create(spec).await?;
        let job = self.store.get(id).await?;
        self.engine.start(&job).await;

        tracing::info!(
            target: TRACING_TARGET_CONTROLLER,
            job_id = %id,
            shards,
            algorithm = %algorithm,
            engine = self.engine.name(),
            "Sort job started"
        );

        Ok(id)
    }

    /// Requests that a job stop.
    ///
    /// Aborting a job that is already aborting or terminal succeeds without
    /// changing anything. Otherwise the job moves to `Aborting` and the engine
    /// is asked to stop; `Aborted` follows once the engine acknowledges.
    pub async fn abort_job(&self, id: JobId) -> Result<()> {
        match self.store.transition(id, JobState::Aborting).await {
            Ok(()) => {}
            // Only `Aborting` or a terminal state refuse this transition.
            Err(error) if error.kind() == ErrorKind::InvalidTransition => {
                tracing::debug!(
                    target: TRACING_TARGET_CONTROLLER,
                    job_id = %id,
                    "Abort ignored, job already stopping or finished"
                );
                return Ok(());
            }
            Err(error) => return Err(error),
        }

        self.engine.request_abort(id).await;
        tracing::info!(target: TRACING_TARGET_CONTROLLER, job_id = %id, "Sort job aborting");
        Ok(())
    }

    /// Returns the job's current metrics, state and timestamps.
    pub async fn get_metrics(&self, id: JobId) -> Result<MetricsSnapshot> {
        let job = self.store.get(id).await?;
        Ok(job.snapshot())
    }

    /// Lists every retained job, oldest first.
    pub async fn list_jobs(&self) -> Vec<JobSummary> {
        self.store.list().await
    }

    /// Records metrics reported by the engine.
    pub async fn report_progress(&self, id: JobId, metrics: Metrics) -> Result<()> {
        self.store.update_metrics(id, metrics).await
    }

    /// Marks a running job as completed.
    pub async fn complete(&self, id: JobId) -> Result<()> {
        self.store.transition(id, JobState::Completed).await?;
        tracing::info!(target: TRACING_TARGET_CONTROLLER, job_id = %id, "Sort job completed");
        Ok(())
    }

    /// Marks a running or aborting job as failed.
    pub async fn fail(&self, id: JobId, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        self.store.record_failure(id, reason.clone()).await?;
        tracing::warn!(
            target: TRACING_TARGET_CONTROLLER,
            job_id = %id,
            reason = %reason,
            "Sort job failed"
        );
        Ok(())
    }

    /// Marks an aborting job as aborted.
    pub async fn acknowledge_abort(&self, id: JobId) -> Result<()> {
        self.store.transition(id, JobState::Aborted).await?;
        tracing::info!(target: TRACING_TARGET_CONTROLLER, job_id = %id, "Sort job aborted");
        Ok(())
    }

    /// Applies an engine event through the matching signal.
    pub async fn apply(&self, event: EngineEvent) -> Result<()> {
        match event {
            EngineEvent::Progress { id, metrics } => self.report_progress(id, metrics).await,
            EngineEvent::Completed { id } => self.complete(id).await,
            EngineEvent::Failed { id, reason } => self.fail(id, reason).await,
            EngineEvent::AbortAcknowledged { id } => self.acknowledge_abort(id).await,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex;

    use super::*;
    use crate::job::Job;

    /// Engine double that records what the controller asked of it.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingEngine {
        pub started: Mutex<Vec<JobId>>,
        pub aborted: Mutex<Vec<JobId>>,
    }

    #[async_trait]
    impl SortEngine for RecordingEngine {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn start(&self, job: &Job) {
            self.started.lock().await.push(job.id());
        }

        async fn request_abort(&self, id: JobId) {
            self.aborted.lock().await.push(id);
        }
    }

    fn controller() -> (JobController, Arc<RecordingEngine>) {
        let engine = Arc::new(RecordingEngine::default());
        let controller = JobController::new(JobStore::default(), engine.clone());
        (controller, engine)
    }

    fn content_request() -> SortSpecRequest {
        SortSpecRequest::with_shards(["a", "b"], "content")
    }

    #[tokio::test]
    async fn started_job_is_running_with_empty_metrics() {
        let (controller, engine) = controller();
        let id = controller.start_job(content_request()).await.unwrap();

        let snapshot = controller.get_metrics(id).await.unwrap();
        assert_eq!(snapshot.state, JobState::Running);
        assert!(snapshot.metrics.is_empty());
        assert_eq!(*engine.started.lock().await, vec![id]);
    }

    #[tokio::test]
    async fn invalid_spec_creates_no_job() {
        let (controller, engine) = controller();

        let error = controller
            .start_job(SortSpecRequest::default())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InvalidSpec);
        assert!(controller.store().is_empty().await);
        assert!(engine.started.lock().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_fail_with_not_found() {
        let (controller, _) = controller();
        let id = JobId::new_v7();

        let errors = [
            controller.abort_job(id).await.unwrap_err(),
            controller.get_metrics(id).await.unwrap_err(),
            controller.report_progress(id, Metrics::new()).await.unwrap_err(),
            controller.complete(id).await.unwrap_err(),
            controller.fail(id, "boom").await.unwrap_err(),
            controller.acknowledge_abort(id).await.unwrap_err(),
        ];

        for error in errors {
            assert_eq!(error.kind(), ErrorKind::NotFound);
        }
    }

    #[tokio::test]
    async fn abort_lifecycle_scenario() {
        let (controller, engine) = controller();
        let id = controller.start_job(content_request()).await.unwrap();

        let snapshot = controller.get_metrics(id).await.unwrap();
        assert_eq!(snapshot.metrics, Metrics::new());
        assert_eq!(snapshot.state, JobState::Running);

        controller
            .report_progress(id, Metrics::from([("bytesSorted".into(), json!(100))]))
            .await
            .unwrap();

        controller.abort_job(id).await.unwrap();
        assert_eq!(controller.get_metrics(id).await.unwrap().state, JobState::Aborting);
        assert_eq!(*engine.aborted.lock().await, vec![id]);

        controller.acknowledge_abort(id).await.unwrap();
        let snapshot = controller.get_metrics(id).await.unwrap();
        assert_eq!(snapshot.state, JobState::Aborted);
        assert_eq!(snapshot.metrics["bytesSorted"], json!(100));
        assert!(snapshot.finished_at.is_some());

        controller.abort_job(id).await.unwrap();
        let again = controller.get_metrics(id).await.unwrap();
        assert_eq!(again, snapshot);
        assert_eq!(engine.aborted.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn abort_is_idempotent_while_aborting() {
        let (controller, engine) = controller();
        let id = controller.start_job(content_request()).await.unwrap();

        controller.abort_job(id).await.unwrap();
        controller.abort_job(id).await.unwrap();

        assert_eq!(controller.get_metrics(id).await.unwrap().state, JobState::Aborting);
        assert_eq!(engine.aborted.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn abort_of_completed_job_is_a_no_op() {
        let (controller, engine) = controller();
        let id = controller.start_job(content_request()).await.unwrap();
        controller.complete(id).await.unwrap();

        controller.abort_job(id).await.unwrap();
        assert_eq!(controller.get_metrics(id).await.unwrap().state, JobState::Completed);
        assert!(engine.aborted.lock().await.is_empty());
    }

    #[tokio::test]
    async fn failure_during_abort_is_recorded() {
        let (controller, _) = controller();
        let id = controller.start_job(content_request()).await.unwrap();
        controller.abort_job(id).await.unwrap();

        controller.fail(id, "target t2 crashed").await.unwrap();
        let snapshot = controller.get_metrics(id).await.unwrap();
        assert_eq!(snapshot.state, JobState::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("target t2 crashed"));
    }

    #[tokio::test]
    async fn terminal_jobs_reject_signals() {
        let (controller, _) = controller();
        let id = controller.start_job(content_request()).await.unwrap();
        controller.complete(id).await.unwrap();

        let progress = controller.report_progress(id, Metrics::new()).await.unwrap_err();
        assert_eq!(progress.kind(), ErrorKind::InvalidState);

        let ack = controller.acknowledge_abort(id).await.unwrap_err();
        assert_eq!(ack.kind(), ErrorKind::InvalidTransition);

        let fail = controller.fail(id, "late").await.unwrap_err();
        assert_eq!(fail.kind(), ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn engine_events_drive_the_state_machine() {
        let (controller, _) = controller();
        let id = controller.start_job(content_request()).await.unwrap();

        controller
            .apply(EngineEvent::Progress {
                id,
                metrics: Metrics::from([("extraction.shards".into(), json!(2))]),
            })
            .await
            .unwrap();
        controller.apply(EngineEvent::Completed { id }).await.unwrap();

        let snapshot = controller.get_metrics(id).await.unwrap();
        assert_eq!(snapshot.state, JobState::Completed);
        assert_eq!(snapshot.metrics["extraction.shards"], json!(2));
    }
}
