//! In-memory job store.
//!
//! Every job record sits behind its own lock. The index lock is only held to
//! look up, insert or remove entries, never while a record is being mutated,
//! so operations on different jobs do not wait on each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use tokio::sync::RwLock;

use crate::TRACING_TARGET_STORE;
use crate::error::{Error, Result};
use crate::job::{Job, JobId, JobState, JobSummary, Metrics};
use crate::spec::SortSpec;

/// Default maximum number of records the store retains.
pub const DEFAULT_MAX_JOBS: usize = 10_000;

/// Attempts made to draw an unused identifier before giving up.
const MAX_ID_ATTEMPTS: usize = 8;

type JobEntry = Arc<RwLock<Job>>;

/// Authoritative mapping from job id to job record.
#[derive(Debug, Clone)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, JobEntry>>>,
    max_jobs: usize,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_JOBS)
    }
}

impl JobStore {
    /// Creates an empty store that holds at most `max_jobs` records.
    pub fn new(max_jobs: usize) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            max_jobs,
        }
    }

    /// Maximum number of records the store holds.
    pub fn capacity(&self) -> usize {
        self.max_jobs
    }

    /// Inserts a running job with empty metrics and returns its fresh id.
    pub async fn create(&self, spec: SortSpec) -> Result<JobId> {
        let mut jobs = self.jobs.write().await;

        if jobs.len() >= self.max_jobs {
            tracing::warn!(
                target: TRACING_TARGET_STORE,
                capacity = self.max_jobs,
                "Job store is at capacity"
            );
            return Err(Error::resource_exhausted(format!(
                "job store is at capacity ({} jobs)",
                self.max_jobs
            )));
        }

        let id = (0..MAX_ID_ATTEMPTS)
            .map(|_| JobId::new_v7())
            .find(|id| !jobs.contains_key(id))
            .ok_or_else(|| Error::resource_exhausted("failed to allocate a unique job id"))?;

        jobs.insert(id, Arc::new(RwLock::new(Job::new(id, spec))));
        tracing::debug!(target: TRACING_TARGET_STORE, job_id = %id, "Job created");

        Ok(id)
    }

    async fn entry(&self, id: JobId) -> Result<JobEntry> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(id))
    }

    /// Returns a consistent copy of the job.
    pub async fn get(&self, id: JobId) -> Result<Job> {
        let entry = self.entry(id).await?;
        let job = entry.read().await.clone();
        Ok(job)
    }

    /// Merges `partial` into the job's metrics, last write wins per key.
    pub async fn update_metrics(&self, id: JobId, partial: Metrics) -> Result<()> {
        let entry = self.entry(id).await?;
        let mut job = entry.write().await;
        job.merge_metrics(partial)
    }

    /// Applies a state change if the state machine allows it.
    pub async fn transition(&self, id: JobId, next: JobState) -> Result<()> {
        let entry = self.entry(id).await?;
        let mut job = entry.write().await;
        let previous = job.state();
        job.transition(next)?;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            job_id = %id,
            from = %previous,
            to = %next,
            "Job transitioned"
        );
        Ok(())
    }

    /// Moves the job to `Failed` and records the reason in one step.
    pub async fn record_failure(&self, id: JobId, reason: impl Into<String>) -> Result<()> {
        let entry = self.entry(id).await?;
        let mut job = entry.write().await;
        let previous = job.state();
        job.fail(reason)?;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            job_id = %id,
            from = %previous,
            "Job failed"
        );
        Ok(())
    }

    /// Removes a terminal job.
    pub async fn evict(&self, id: JobId) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs.get(&id).ok_or_else(|| Error::not_found(id))?;

        let state = entry.read().await.state();
        if !state.is_terminal() {
            return Err(Error::invalid_state(state, "evict"));
        }

        jobs.remove(&id);
        tracing::debug!(target: TRACING_TARGET_STORE, job_id = %id, "Job evicted");
        Ok(())
    }

    /// Evicts every terminal job that finished more than `retention` ago.
    pub async fn evict_expired(&self, retention: Duration) -> usize {
        let cutoff = Timestamp::now()
            .checked_sub(retention)
            .unwrap_or(Timestamp::MIN);

        let mut expired = Vec::new();
        for (id, entry) in self.entries().await {
            if entry.read().await.finished_before(cutoff) {
                expired.push(id);
            }
        }

        if expired.is_empty() {
            return 0;
        }

        let mut jobs = self.jobs.write().await;
        let evicted = expired
            .iter()
            .filter(|id| jobs.remove(*id).is_some())
            .count();

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            evicted,
            remaining = jobs.len(),
            "Expired jobs evicted"
        );
        evicted
    }

    /// Lists every job, oldest first.
    pub async fn list(&self) -> Vec<JobSummary> {
        let mut summaries = Vec::new();
        for (_, entry) in self.entries().await {
            summaries.push(entry.read().await.summary());
        }

        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        summaries
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn entries(&self) -> Vec<(JobId, JobEntry)> {
        self.jobs
            .read()
            .await
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(entry)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;
    use crate::spec::tests::content_spec;

    fn metrics(pairs: &[(&str, serde_json::Value)]) -> Metrics {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect()
    }

    #[tokio::test]
    async fn create_returns_fresh_running_jobs() {
        let store = JobStore::default();
        let mut ids = HashSet::new();

        for _ in 0..100 {
            let id = store.create(content_spec()).await.unwrap();
            assert!(ids.insert(id));

            let job = store.get(id).await.unwrap();
            assert_eq!(job.state(), JobState::Running);
            assert!(job.metrics().is_empty());
        }

        assert_eq!(store.len().await, 100);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = JobStore::default();
        let id = JobId::new_v7();

        let errors = [
            store.get(id).await.unwrap_err(),
            store.update_metrics(id, Metrics::new()).await.unwrap_err(),
            store.transition(id, JobState::Aborting).await.unwrap_err(),
            store.record_failure(id, "boom").await.unwrap_err(),
            store.evict(id).await.unwrap_err(),
        ];

        for error in errors {
            assert_eq!(error.kind(), ErrorKind::NotFound);
        }
    }

    #[tokio::test]
    async fn capacity_exhaustion_is_reported() {
        let store = JobStore::new(2);
        store.create(content_spec()).await.unwrap();
        store.create(content_spec()).await.unwrap();

        let error = store.create(content_spec()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ResourceExhausted);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn terminal_jobs_reject_progress_and_transitions() {
        let store = JobStore::default();
        let id = store.create(content_spec()).await.unwrap();
        store.transition(id, JobState::Completed).await.unwrap();

        let error = store
            .update_metrics(id, metrics(&[("bytes", json!(1))]))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);

        for next in [JobState::Running, JobState::Aborting, JobState::Failed] {
            let error = store.transition(id, next).await.unwrap_err();
            assert_eq!(error.kind(), ErrorKind::InvalidTransition);
        }
    }

    #[tokio::test]
    async fn evict_requires_terminal_state() {
        let store = JobStore::default();
        let id = store.create(content_spec()).await.unwrap();

        let error = store.evict(id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);

        store.transition(id, JobState::Aborting).await.unwrap();
        let error = store.evict(id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);

        store.transition(id, JobState::Aborted).await.unwrap();
        store.evict(id).await.unwrap();
        assert_eq!(store.get(id).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn evict_expired_only_removes_old_terminal_jobs() {
        let store = JobStore::default();
        let running = store.create(content_spec()).await.unwrap();
        let finished = store.create(content_spec()).await.unwrap();
        store.transition(finished, JobState::Completed).await.unwrap();

        assert_eq!(store.evict_expired(Duration::from_secs(3600)).await, 0);
        assert_eq!(store.evict_expired(Duration::ZERO).await, 1);

        assert!(store.get(running).await.is_ok());
        assert!(store.get(finished).await.is_err());
    }

    #[tokio::test]
    async fn record_failure_keeps_reason() {
        let store = JobStore::default();
        let id = store.create(content_spec()).await.unwrap();
        store.transition(id, JobState::Aborting).await.unwrap();
        store.record_failure(id, "target lost").await.unwrap();

        let job = store.get(id).await.unwrap();
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.error(), Some("target lost"));
        assert!(job.finished_at().is_some());
    }

    #[tokio::test]
    async fn list_is_ordered_by_creation() {
        let store = JobStore::default();
        let first = store.create(content_spec()).await.unwrap();
        let second = store.create(content_spec()).await.unwrap();

        let ids: Vec<_> = store.list().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_disjoint_updates_are_not_lost() {
        let store = JobStore::default();
        let id = store.create(content_spec()).await.unwrap();

        let tasks: Vec<_> = (0..64)
            .map(|worker| {
                let store = store.clone();
                tokio::spawn(async move {
                    let key = format!("target.{worker}.bytes");
                    store
                        .update_metrics(id, metrics(&[(key.as_str(), json!(worker))]))
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let job = store.get(id).await.unwrap();
        assert_eq!(job.metrics().len(), 64);
        assert_eq!(job.metrics()["target.63.bytes"], json!(63));
    }
}
