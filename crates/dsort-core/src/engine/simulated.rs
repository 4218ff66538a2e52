use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::{EngineEvent, EventSender, SortEngine};
use crate::TRACING_TARGET_ENGINE;
use crate::job::{Job, JobId, Metrics};

/// Upper bound on progress reports per phase.
const MAX_STEPS_PER_PHASE: u64 = 20;

/// Tuning of the [`SimulatedEngine`].
#[derive(Debug, Clone, Copy)]
pub struct SimulatedEngineConfig {
    /// Pause between two progress reports.
    pub step: Duration,
    /// Assumed size of every input shard in bytes.
    pub shard_size: u64,
    /// Assumed number of records in every input shard.
    pub records_per_shard: u64,
}

impl Default for SimulatedEngineConfig {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(50),
            shard_size: 1024 * 1024,
            records_per_shard: 100,
        }
    }
}

/// Work derived from a job's specification.
#[derive(Debug, Clone, Copy)]
struct Plan {
    input_shards: u64,
    input_bytes: u64,
    records: u64,
    output_shards: u64,
}

impl Plan {
    fn new(job: &Job, config: &SimulatedEngineConfig) -> Self {
        let spec = job.spec();
        let input_shards = spec.input().len();
        let input_bytes = input_shards.saturating_mul(config.shard_size);
        let output_shards = match spec.output_shard_size() {
            Some(size) => input_bytes.div_ceil(size.get()).max(1),
            None => input_shards,
        };

        Self {
            input_shards,
            input_bytes,
            records: input_shards.saturating_mul(config.records_per_shard),
            output_shards,
        }
    }
}

/// In-process engine that walks a job through the extraction, sorting and
/// creation phases on timers, reporting metrics as it goes.
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    config: SimulatedEngineConfig,
    events: EventSender,
    running: Arc<RwLock<HashMap<JobId, CancellationToken>>>,
    shutdown: CancellationToken,
}

impl SimulatedEngine {
    /// Creates an engine reporting through `events`.
    pub fn new(events: EventSender, config: SimulatedEngineConfig) -> Self {
        Self {
            config,
            events,
            running: Arc::new(RwLock::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Stops every running job without acknowledging anything once `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Number of jobs currently executing.
    pub async fn running_jobs(&self) -> usize {
        self.running.read().await.len()
    }

    async fn emit(&self, event: EngineEvent) {
        let id = event.job_id();
        if self.events.send(event).await.is_err() {
            tracing::debug!(
                target: TRACING_TARGET_ENGINE,
                job_id = %id,
                "Engine event dropped, receiver closed"
            );
        }
    }

    async fn progress(&self, id: JobId, metrics: Metrics) {
        self.emit(EngineEvent::Progress { id, metrics }).await;
    }

    /// Waits one step; returns `false` if the job was cancelled meanwhile.
    async fn step(&self, token: &CancellationToken) -> bool {
        tokio::select! {
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(self.config.step) => true,
        }
    }

    /// Runs `units` of work in at most [`MAX_STEPS_PER_PHASE`] steps and reports
    /// `report(processed)` after each one.
    async fn phase(
        &self,
        id: JobId,
        name: &str,
        units: u64,
        report: impl Fn(u64) -> Metrics,
        token: &CancellationToken,
    ) -> bool {
        let started = Instant::now();
        let steps = units.clamp(1, MAX_STEPS_PER_PHASE);

        for step in 1..=steps {
            if !self.step(token).await {
                return false;
            }
            self.progress(id, report(units * step / steps)).await;
        }

        let elapsed = started.elapsed().as_millis() as u64;
        self.progress(id, Metrics::from([(format!("{name}.elapsed_ms"), json!(elapsed))]))
            .await;
        true
    }

    async fn run_phases(&self, id: JobId, plan: Plan, token: &CancellationToken) -> bool {
        let shard_size = self.config.shard_size;
        let extracted = self
            .phase(
                id,
                "extraction",
                plan.input_shards,
                |shards| {
                    Metrics::from([
                        ("extraction.shards".to_owned(), json!(shards)),
                        (
                            "extraction.bytes".to_owned(),
                            json!(shards.saturating_mul(shard_size).min(plan.input_bytes)),
                        ),
                    ])
                },
                token,
            )
            .await;
        if !extracted {
            return false;
        }

        let sorted = self
            .phase(
                id,
                "sorting",
                plan.records,
                |records| Metrics::from([("sorting.records".to_owned(), json!(records))]),
                token,
            )
            .await;
        if !sorted {
            return false;
        }

        self.phase(
            id,
            "creation",
            plan.output_shards,
            |shards| Metrics::from([("creation.shards".to_owned(), json!(shards))]),
            token,
        )
        .await
    }

    async fn execute(self, id: JobId, plan: Plan, token: CancellationToken) {
        self.run_phases(id, plan, &token).await;

        // Removal and the cancellation check happen under the write lock so an
        // abort either cancels this token first or finds no running entry.
        let cancelled = {
            let mut running = self.running.write().await;
            running.remove(&id);
            token.is_cancelled()
        };

        if self.shutdown.is_cancelled() {
            return;
        }

        let event = if cancelled {
            EngineEvent::AbortAcknowledged { id }
        } else {
            EngineEvent::Completed { id }
        };

        tracing::debug!(
            target: TRACING_TARGET_ENGINE,
            job_id = %id,
            aborted = cancelled,
            "Simulated sort finished"
        );
        self.emit(event).await;
    }
}

#[async_trait]
impl SortEngine for SimulatedEngine {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn start(&self, job: &Job) {
        let id = job.id();
        let plan = Plan::new(job, &self.config);
        let token = self.shutdown.child_token();
        self.running.write().await.insert(id, token.clone());

        tracing::debug!(
            target: TRACING_TARGET_ENGINE,
            job_id = %id,
            input_shards = plan.input_shards,
            output_shards = plan.output_shards,
            "Simulated sort started"
        );

        tokio::spawn(self.clone().execute(id, plan, token));
    }

    async fn request_abort(&self, id: JobId) {
        let cancelled = match self.running.read().await.get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        };

        if !cancelled {
            self.emit(EngineEvent::AbortAcknowledged { id }).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::event_channel;
    use crate::spec::tests::content_spec;

    fn fast_engine() -> (SimulatedEngine, crate::engine::EventReceiver) {
        let (sender, receiver) = event_channel(1024);
        let config = SimulatedEngineConfig {
            step: Duration::from_millis(1),
            ..Default::default()
        };
        (SimulatedEngine::new(sender, config), receiver)
    }

    #[tokio::test]
    async fn job_runs_to_completion() {
        let (engine, mut events) = fast_engine();
        let job = Job::new(JobId::new_v7(), content_spec());
        engine.start(&job).await;

        let mut metrics = Metrics::new();
        loop {
            match events.recv().await.unwrap() {
                EngineEvent::Progress { metrics: partial, .. } => metrics.extend(partial),
                EngineEvent::Completed { id } => {
                    assert_eq!(id, job.id());
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(metrics["extraction.shards"], json!(2));
        assert_eq!(metrics["sorting.records"], json!(200));
        assert_eq!(metrics["creation.shards"], json!(2));
        assert!(metrics.contains_key("creation.elapsed_ms"));
        assert_eq!(engine.running_jobs().await, 0);
    }

    #[tokio::test]
    async fn abort_is_acknowledged() {
        let (sender, mut events) = event_channel(1024);
        let config = SimulatedEngineConfig {
            step: Duration::from_secs(60),
            ..Default::default()
        };
        let engine = SimulatedEngine::new(sender, config);
        let job = Job::new(JobId::new_v7(), content_spec());

        engine.start(&job).await;
        engine.request_abort(job.id()).await;

        let event = events.recv().await.unwrap();
        assert_eq!(event, EngineEvent::AbortAcknowledged { id: job.id() });
    }

    #[tokio::test]
    async fn abort_of_unknown_job_is_acknowledged_immediately() {
        let (engine, mut events) = fast_engine();
        let id = JobId::new_v7();

        engine.request_abort(id).await;
        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::AbortAcknowledged { id }
        );
    }
}
