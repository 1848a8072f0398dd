//! Durable job queue store
//!
//! Jobs persist as two JSON arrays, each under its own storage key: the
//! active queue (insertion order) and the failed-jobs list. Every operation
//! is a full read, an in-memory transform and a full write-back, performed
//! while holding one async mutex so concurrent callers never lose updates.

use std::sync::Arc;

use fieldsync_common::time::{Clock, SystemClock};
use fieldsync_domain::{FieldSyncError, Job, JobId, JobStatus, Result, SyncConfig};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::ports::KeyValueStorage;

/// Durable active queue plus failed-jobs list over a [`KeyValueStorage`]
///
/// Shared by the orchestrator, the drainer and the service facade behind an
/// `Arc`; all of them go through the same write lock.
pub struct JobQueueStore {
    storage: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    queue_key: String,
    failed_key: String,
    write_lock: Mutex<()>,
}

impl JobQueueStore {
    /// Create a store over `storage` using the keys from `config`
    pub fn new(storage: Arc<dyn KeyValueStorage>, config: &SyncConfig) -> Self {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    /// Create a store that stamps `created_at` / `last_attempt` from `clock`
    pub fn with_clock(
        storage: Arc<dyn KeyValueStorage>,
        config: &SyncConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            clock,
            queue_key: config.queue_key.clone(),
            failed_key: config.failed_key.clone(),
            write_lock: Mutex::new(()),
        }
    }

    /// All active jobs in insertion order
    pub async fn load(&self) -> Result<Vec<Job>> {
        let _guard = self.write_lock.lock().await;
        self.read_jobs(&self.queue_key).await
    }

    /// All jobs that exhausted their retries, oldest failure first
    ///
    /// An id present in both collections was caught between the two writes
    /// of a move. The active copy wins: the failed copy is dropped and the
    /// cleaned list is written back.
    pub async fn load_failed(&self) -> Result<Vec<Job>> {
        let _guard = self.write_lock.lock().await;
        let active = self.read_jobs(&self.queue_key).await?;
        let mut failed = self.read_jobs(&self.failed_key).await?;

        let before = failed.len();
        failed.retain(|f| !active.iter().any(|a| a.id == f.id));
        if failed.len() != before {
            warn!(dropped = before - failed.len(), "Failed list held jobs still queued; dropping them");
            self.write_jobs(&self.failed_key, &failed).await?;
        }
        Ok(failed)
    }

    /// Look a job up in the active queue, then in the failed list
    pub async fn get(&self, id: &JobId) -> Result<Option<Job>> {
        let _guard = self.write_lock.lock().await;
        let active = self.read_jobs(&self.queue_key).await?;
        if let Some(job) = active.into_iter().find(|j| &j.id == id) {
            return Ok(Some(job));
        }
        let failed = self.read_jobs(&self.failed_key).await?;
        Ok(failed.into_iter().find(|j| &j.id == id))
    }

    /// Append a new queued job
    #[instrument(skip(self, payload))]
    pub async fn add(&self, label: &str, payload: serde_json::Value) -> Result<Job> {
        let _guard = self.write_lock.lock().await;
        let mut jobs = self.read_jobs(&self.queue_key).await?;

        let job = Job::new(label, payload, self.clock.millis_since_epoch());
        jobs.push(job.clone());
        self.write_jobs(&self.queue_key, &jobs).await?;

        info!(job_id = %job.id, label, queue_len = jobs.len(), "Job queued");
        Ok(job)
    }

    /// Record a job straight into the failed list without queueing it
    #[instrument(skip(self, payload))]
    pub async fn add_failed(&self, label: &str, payload: serde_json::Value) -> Result<Job> {
        let _guard = self.write_lock.lock().await;
        let mut failed = self.read_jobs(&self.failed_key).await?;

        let now = self.clock.millis_since_epoch();
        let mut job = Job::new(label, payload, now);
        job.last_attempt = now;
        job.mark_failed();
        failed.push(job.clone());
        self.write_jobs(&self.failed_key, &failed).await?;

        info!(job_id = %job.id, label, "Job recorded as failed");
        Ok(job)
    }

    /// Set the status of an active job
    ///
    /// `Done` removes the job instead; a finished job is never persisted.
    /// `Failed` moves the job to the failed list, where retry and delete can
    /// reach it. Returns the updated job, or `None` when the id is not queued.
    pub async fn set_status(&self, id: &JobId, status: JobStatus) -> Result<Option<Job>> {
        match status {
            JobStatus::Done => return self.remove_inner(id).await,
            JobStatus::Failed => return self.move_to_failed(id).await,
            JobStatus::Queued | JobStatus::InProgress => {}
        }

        let _guard = self.write_lock.lock().await;
        let mut jobs = self.read_jobs(&self.queue_key).await?;
        let Some(job) = jobs.iter_mut().find(|j| &j.id == id) else {
            return Ok(None);
        };
        job.status = status;
        let updated = job.clone();
        self.write_jobs(&self.queue_key, &jobs).await?;

        debug!(job_id = %id, status = %status, "Job status updated");
        Ok(Some(updated))
    }

    /// Count one failed attempt: bumps `attempt_count`, stamps `last_attempt`
    /// and puts the job back to `queued`
    pub async fn increment_attempt(&self, id: &JobId) -> Result<Option<Job>> {
        let _guard = self.write_lock.lock().await;
        let mut jobs = self.read_jobs(&self.queue_key).await?;
        let Some(job) = jobs.iter_mut().find(|j| &j.id == id) else {
            return Ok(None);
        };
        job.record_failed_attempt(self.clock.millis_since_epoch());
        let updated = job.clone();
        self.write_jobs(&self.queue_key, &jobs).await?;

        debug!(job_id = %id, attempt = updated.attempt_count, "Job attempt recorded");
        Ok(Some(updated))
    }

    /// Remove an active job; returns whether it was present
    pub async fn remove(&self, id: &JobId) -> Result<bool> {
        Ok(self.remove_inner(id).await?.is_some())
    }

    /// Move an active job to the failed list (status `failed`)
    #[instrument(skip(self, id), fields(job_id = %id))]
    pub async fn move_to_failed(&self, id: &JobId) -> Result<Option<Job>> {
        let _guard = self.write_lock.lock().await;
        let mut jobs = self.read_jobs(&self.queue_key).await?;
        let Some(pos) = jobs.iter().position(|j| &j.id == id) else {
            return Ok(None);
        };

        let mut job = jobs.remove(pos);
        job.mark_failed();

        let mut failed = self.read_jobs(&self.failed_key).await?;
        failed.retain(|j| &j.id != id);
        failed.push(job.clone());

        // Failed list first: a crash in between leaves a duplicate, never a loss
        self.write_jobs(&self.failed_key, &failed).await?;
        self.write_jobs(&self.queue_key, &jobs).await?;

        info!(label = %job.label, attempts = job.attempt_count, "Job moved to failed list");
        Ok(Some(job))
    }

    /// Reset jobs for a user retry: `attempt_count = 0`, `status = queued`
    ///
    /// Jobs in the failed list move back to the end of the active queue; ids
    /// still present in the active queue are reset in place. Unknown ids are
    /// skipped. Returns the requeued jobs.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn requeue(&self, ids: &[JobId]) -> Result<Vec<Job>> {
        let _guard = self.write_lock.lock().await;
        let mut active = self.read_jobs(&self.queue_key).await?;
        let mut failed = self.read_jobs(&self.failed_key).await?;
        let mut requeued = Vec::new();

        for id in ids {
            if let Some(job) = active.iter_mut().find(|j| &j.id == id) {
                job.reset_for_retry();
                requeued.push(job.clone());
                failed.retain(|j| &j.id != id);
            } else if let Some(pos) = failed.iter().position(|j| &j.id == id) {
                let mut job = failed.remove(pos);
                job.reset_for_retry();
                requeued.push(job.clone());
                active.push(job);
            }
        }

        // Active queue first: a crash in between leaves a duplicate, never a loss
        self.write_jobs(&self.queue_key, &active).await?;
        self.write_jobs(&self.failed_key, &failed).await?;

        info!(requeued = requeued.len(), "Jobs requeued for retry");
        Ok(requeued)
    }

    /// Permanently delete jobs from both collections; returns how many
    /// records were removed
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn purge(&self, ids: &[JobId]) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut active = self.read_jobs(&self.queue_key).await?;
        let mut failed = self.read_jobs(&self.failed_key).await?;
        let before = active.len() + failed.len();

        active.retain(|j| !ids.contains(&j.id));
        failed.retain(|j| !ids.contains(&j.id));
        let removed = before - active.len() - failed.len();

        self.write_jobs(&self.queue_key, &active).await?;
        self.write_jobs(&self.failed_key, &failed).await?;

        info!(removed, "Jobs purged");
        Ok(removed)
    }

    async fn remove_inner(&self, id: &JobId) -> Result<Option<Job>> {
        let _guard = self.write_lock.lock().await;
        let mut jobs = self.read_jobs(&self.queue_key).await?;
        let Some(pos) = jobs.iter().position(|j| &j.id == id) else {
            return Ok(None);
        };
        let job = jobs.remove(pos);
        self.write_jobs(&self.queue_key, &jobs).await?;

        debug!(job_id = %id, label = %job.label, "Job removed");
        Ok(Some(job))
    }

    async fn read_jobs(&self, key: &str) -> Result<Vec<Job>> {
        match self.storage.get_item(key).await? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw).map_err(|e| {
                FieldSyncError::Serialization(format!("Corrupt job list under '{}': {}", key, e))
            }),
            _ => Ok(Vec::new()),
        }
    }

    async fn write_jobs(&self, key: &str, jobs: &[Job]) -> Result<()> {
        if jobs.is_empty() {
            return self.storage.remove_item(key).await;
        }
        let raw = serde_json::to_string(jobs)?;
        self.storage.set_item(key, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fieldsync_common::testing::MockClock;
    use serde_json::json;

    use super::*;
    use crate::sync::testing::InMemoryStorage;

    fn store_with(storage: Arc<InMemoryStorage>, clock: MockClock) -> JobQueueStore {
        JobQueueStore::with_clock(storage, &SyncConfig::default(), Arc::new(clock))
    }

    /// Validates `add` followed by `load` for a fresh store.
    ///
    /// Assertions:
    /// - Confirms jobs come back in insertion order.
    /// - Confirms `created_at` comes from the injected clock.
    #[tokio::test]
    async fn test_add_and_load_preserves_order() {
        let clock = MockClock::at_millis(1_000);
        let store = store_with(Arc::new(InMemoryStorage::new()), clock.clone());

        let a = store.add("uploadImage", json!({"n": 1})).await.unwrap();
        clock.advance(Duration::from_millis(5));
        let b = store.add("uploadImage", json!({"n": 2})).await.unwrap();

        let jobs = store.load().await.unwrap();
        assert_eq!(jobs.iter().map(|j| j.id.clone()).collect::<Vec<_>>(), vec![a.id, b.id]);
        assert_eq!(jobs[0].created_at, 1_000);
        assert_eq!(jobs[1].created_at, 1_005);
        assert!(jobs.iter().all(|j| j.status == JobStatus::Queued && j.attempt_count == 0));
    }

    #[tokio::test]
    async fn test_remove_deletes_key_when_empty() {
        let storage = Arc::new(InMemoryStorage::new());
        let store = store_with(storage.clone(), MockClock::new());

        let job = store.add("deletePdf", json!({})).await.unwrap();
        assert!(storage.contains("sync_job_queue"));

        assert!(store.remove(&job.id).await.unwrap());
        assert!(!store.remove(&job.id).await.unwrap());
        assert!(store.load().await.unwrap().is_empty());
        assert!(!storage.contains("sync_job_queue"));
    }

    #[tokio::test]
    async fn test_set_status_done_removes_job() {
        let store = store_with(Arc::new(InMemoryStorage::new()), MockClock::new());
        let job = store.add("x", json!(null)).await.unwrap();

        let updated = store.set_status(&job.id, JobStatus::InProgress).await.unwrap().unwrap();
        assert_eq!(updated.status, JobStatus::InProgress);

        store.set_status(&job.id, JobStatus::Done).await.unwrap();
        assert!(store.get(&job.id).await.unwrap().is_none());
        assert!(store.set_status(&job.id, JobStatus::Queued).await.unwrap().is_none());
    }

    /// Validates that marking a job failed routes it to the failed list.
    ///
    /// Assertions:
    /// - Ensures the job leaves the active queue.
    /// - Ensures it is listed by `load_failed` with status `failed`.
    /// - Ensures a user retry can bring it back.
    #[tokio::test]
    async fn test_set_status_failed_moves_job() {
        let store = store_with(Arc::new(InMemoryStorage::new()), MockClock::new());
        let job = store.add("uploadImage", json!({"uri": "a"})).await.unwrap();

        let failed = store.set_status(&job.id, JobStatus::Failed).await.unwrap().unwrap();

        assert_eq!(failed.status, JobStatus::Failed);
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(store.load_failed().await.unwrap(), vec![failed]);
        assert_eq!(store.requeue(&[job.id]).await.unwrap().len(), 1);
    }

    /// Validates recovery from a move interrupted between its two writes.
    ///
    /// Assertions:
    /// - Ensures a job stored in both lists is reported only as active.
    /// - Ensures the failed key is rewritten without it.
    #[tokio::test]
    async fn test_load_failed_drops_jobs_still_queued() {
        let storage = Arc::new(InMemoryStorage::new());
        let store = store_with(storage.clone(), MockClock::new());
        let stranded = store.add("uploadImage", json!({"n": 1})).await.unwrap();
        let settled = store.add("uploadImage", json!({"n": 2})).await.unwrap();
        store.move_to_failed(&settled.id).await.unwrap();

        let mut copy = stranded.clone();
        copy.status = JobStatus::Failed;
        let mut failed = store.load_failed().await.unwrap();
        failed.push(copy);
        storage.set_item("sync_failed_jobs", &serde_json::to_string(&failed).unwrap()).await.unwrap();

        let failed = store.load_failed().await.unwrap();

        assert_eq!(failed.iter().map(|j| j.id.clone()).collect::<Vec<_>>(), vec![settled.id]);
        let raw = storage.get_item("sync_failed_jobs").await.unwrap().unwrap();
        assert!(!raw.contains(stranded.id.as_str()));
        assert_eq!(store.load().await.unwrap(), vec![stranded]);
    }

    #[tokio::test]
    async fn test_increment_attempt_stamps_clock() {
        let clock = MockClock::at_millis(10_000);
        let store = store_with(Arc::new(InMemoryStorage::new()), clock.clone());
        let job = store.add("fetchShops", json!({})).await.unwrap();
        store.set_status(&job.id, JobStatus::InProgress).await.unwrap();

        clock.advance(Duration::from_millis(700));
        let updated = store.increment_attempt(&job.id).await.unwrap().unwrap();

        assert_eq!(updated.attempt_count, 1);
        assert_eq!(updated.last_attempt, 10_700);
        assert_eq!(updated.status, JobStatus::Queued);
    }

    /// Validates the dead-letter move and the user retry path.
    ///
    /// Assertions:
    /// - Ensures a failed job leaves the active queue and lands in the failed
    ///   list with status `failed`.
    /// - Ensures `requeue` resets attempts and moves it back.
    #[tokio::test]
    async fn test_move_to_failed_then_requeue() {
        let store = store_with(Arc::new(InMemoryStorage::new()), MockClock::new());
        let job = store.add("uploadImage", json!({"uri": "a"})).await.unwrap();
        for _ in 0..3 {
            store.increment_attempt(&job.id).await.unwrap();
        }

        let failed = store.move_to_failed(&job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(store.load_failed().await.unwrap(), vec![failed.clone()]);
        assert_eq!(store.get(&job.id).await.unwrap(), Some(failed));

        let requeued = store.requeue(&[job.id.clone(), JobId::from("missing")]).await.unwrap();
        assert_eq!(requeued.len(), 1);
        assert_eq!(requeued[0].attempt_count, 0);
        assert_eq!(requeued[0].status, JobStatus::Queued);
        assert!(store.load_failed().await.unwrap().is_empty());
        assert_eq!(store.load().await.unwrap(), requeued);
    }

    #[tokio::test]
    async fn test_purge_removes_from_both_lists() {
        let store = store_with(Arc::new(InMemoryStorage::new()), MockClock::new());
        let queued = store.add("a", json!(1)).await.unwrap();
        let doomed = store.add("b", json!(2)).await.unwrap();
        store.move_to_failed(&doomed.id).await.unwrap();
        let keep = store.add("c", json!(3)).await.unwrap();

        let removed = store.purge(&[queued.id.clone(), doomed.id.clone()]).await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.load().await.unwrap(), vec![keep]);
        assert!(store.load_failed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_failed_skips_queue() {
        let store = store_with(Arc::new(InMemoryStorage::new()), MockClock::at_millis(42));
        let job = store.add_failed("deleteImage", json!({"id": 1})).await.unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.last_attempt, 42);
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(store.load_failed().await.unwrap().len(), 1);
    }

    /// Validates that concurrent writers never drop each other's updates.
    ///
    /// Assertions:
    /// - Confirms all 50 concurrently added jobs are persisted.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_are_serialized() {
        let storage = Arc::new(InMemoryStorage::new().with_latency(Duration::from_millis(1)));
        let store = Arc::new(store_with(storage, MockClock::new()));

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add("uploadImage", json!({ "n": i })).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load().await.unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_a_serialization_error() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.set_item("sync_job_queue", "{not json").await.unwrap();
        let store = store_with(storage, MockClock::new());

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, FieldSyncError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let storage = Arc::new(InMemoryStorage::new());
        let store = store_with(storage.clone(), MockClock::new());
        storage.set_failing(true);

        let err = store.add("x", json!(null)).await.unwrap_err();
        assert!(err.is_storage());
    }
}
