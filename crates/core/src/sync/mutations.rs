//! Two-phase mutation tracker
//!
//! Each optimistic local mutation is tracked under a caller-chosen key and
//! moves `Pending -> Confirmed | Failed`. A mutation that had to be queued is
//! linked to its job id and is confirmed only when that job completes.
//!
//! Settled records stay readable for a while so the UI can show the outcome.
//! Only the most recently settled [`SETTLED_RETAINED`] are kept.

use std::collections::HashMap;

use fieldsync_domain::{JobId, MutationState};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Settled mutations kept after the oldest are evicted
pub const SETTLED_RETAINED: usize = 128;

/// Tracked state of one mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub key: String,
    pub label: String,
    pub state: MutationState,
    /// Job carrying the mutation when the inline attempt did not succeed
    pub job_id: Option<JobId>,
}

#[derive(Debug, Default)]
struct TrackerState {
    records: HashMap<String, MutationRecord>,
    by_job: HashMap<JobId, String>,
    /// Last begin or transition of each key, on a monotonic counter
    touched: HashMap<String, u64>,
    tick: u64,
}

impl TrackerState {
    fn touch(&mut self, key: &str) {
        self.tick += 1;
        self.touched.insert(key.to_string(), self.tick);
    }

    fn transition(&mut self, key: &str, next: MutationState) -> Option<MutationState> {
        let record = self.records.get_mut(key)?;
        if !record.state.can_transition_to(next) {
            warn!(key, from = %record.state, to = %next, "Ignoring illegal mutation transition");
            return None;
        }
        record.state = next;
        debug!(key, state = %next, "Mutation state changed");
        self.touch(key);
        Some(next)
    }

    /// A record is settled once nothing can move it again: confirmed, or
    /// failed with no job left to retry
    fn is_settled(&self, record: &MutationRecord) -> bool {
        match record.state {
            MutationState::Pending => false,
            MutationState::Confirmed => true,
            MutationState::Failed => !record
                .job_id
                .as_ref()
                .is_some_and(|job_id| self.by_job.contains_key(job_id)),
        }
    }

    fn prune_settled(&mut self) {
        let mut settled: Vec<(u64, String)> = self
            .records
            .values()
            .filter(|record| self.is_settled(record))
            .map(|record| (self.touched.get(&record.key).copied().unwrap_or(0), record.key.clone()))
            .collect();
        if settled.len() <= SETTLED_RETAINED {
            return;
        }
        settled.sort_unstable();
        let evict = settled.len() - SETTLED_RETAINED;
        for (_, key) in settled.into_iter().take(evict) {
            if let Some(record) = self.records.remove(&key) {
                if let Some(job_id) = record.job_id {
                    self.by_job.remove(&job_id);
                }
            }
            self.touched.remove(&key);
        }
        debug!(evicted = evict, "Pruned settled mutations");
    }
}

/// Keyed registry of optimistic mutations and the jobs carrying them
#[derive(Debug, Default)]
pub struct MutationTracker {
    inner: Mutex<TrackerState>,
}

impl MutationTracker {
    /// Empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a mutation as `Pending`
    ///
    /// A key that is reused starts over; any previous job link is dropped.
    /// Evicts the oldest settled records beyond [`SETTLED_RETAINED`].
    pub fn begin(&self, key: &str, label: &str) {
        let mut inner = self.inner.lock();
        if let Some(previous) = inner.records.remove(key) {
            if let Some(job_id) = previous.job_id {
                inner.by_job.remove(&job_id);
            }
        }
        inner.records.insert(
            key.to_string(),
            MutationRecord {
                key: key.to_string(),
                label: label.to_string(),
                state: MutationState::Pending,
                job_id: None,
            },
        );
        inner.touch(key);
        inner.prune_settled();
    }

    /// Attach the job that now carries the mutation
    pub fn link_job(&self, key: &str, job_id: &JobId) {
        let mut inner = self.inner.lock();
        let Some(record) = inner.records.get_mut(key) else {
            return;
        };
        record.job_id = Some(job_id.clone());
        inner.by_job.insert(job_id.clone(), key.to_string());
    }

    /// The inline attempt succeeded
    pub fn confirm(&self, key: &str) -> Option<MutationState> {
        self.inner.lock().transition(key, MutationState::Confirmed)
    }

    /// The mutation was rejected outright
    pub fn fail(&self, key: &str) -> Option<MutationState> {
        self.inner.lock().transition(key, MutationState::Failed)
    }

    /// The carrying job completed remotely
    pub fn confirm_job(&self, job_id: &JobId) -> Option<MutationState> {
        let mut inner = self.inner.lock();
        let key = inner.by_job.remove(job_id)?;
        inner.transition(&key, MutationState::Confirmed)
    }

    /// The carrying job was moved to the failed list
    pub fn fail_job(&self, job_id: &JobId) -> Option<MutationState> {
        let mut inner = self.inner.lock();
        let key = inner.by_job.get(job_id)?.clone();
        inner.transition(&key, MutationState::Failed)
    }

    /// A user retry put the carrying job back in the queue
    pub fn reopen_job(&self, job_id: &JobId) -> Option<MutationState> {
        let mut inner = self.inner.lock();
        let key = inner.by_job.get(job_id)?.clone();
        inner.transition(&key, MutationState::Pending)
    }

    /// The carrying job was deleted; the mutation can no longer be confirmed
    pub fn abandon_job(&self, job_id: &JobId) -> Option<MutationState> {
        let mut inner = self.inner.lock();
        let key = inner.by_job.remove(job_id)?;
        let state = inner.records.get(&key).map(|r| r.state)?;
        if state == MutationState::Pending {
            inner.transition(&key, MutationState::Failed)
        } else {
            Some(state)
        }
    }

    /// Current state, or `None` for an unknown or evicted key
    pub fn state(&self, key: &str) -> Option<MutationState> {
        self.inner.lock().records.get(key).map(|r| r.state)
    }

    /// Full record for `key`
    pub fn record(&self, key: &str) -> Option<MutationRecord> {
        self.inner.lock().records.get(key).cloned()
    }

    /// Keys of mutations still awaiting confirmation
    pub fn pending_keys(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut keys: Vec<String> = inner
            .records
            .values()
            .filter(|r| r.state == MutationState::Pending)
            .map(|r| r.key.clone())
            .collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_confirmation() {
        let tracker = MutationTracker::new();
        tracker.begin("shop-3/status", "updateStatus");
        assert_eq!(tracker.state("shop-3/status"), Some(MutationState::Pending));

        tracker.confirm("shop-3/status");
        assert_eq!(tracker.state("shop-3/status"), Some(MutationState::Confirmed));

        // Confirmed is final
        assert_eq!(tracker.fail("shop-3/status"), None);
        assert_eq!(tracker.state("shop-3/status"), Some(MutationState::Confirmed));
    }

    /// Validates the queued path: fail, user retry, then job completion.
    ///
    /// Assertions:
    /// - Ensures the job link drives every transition.
    /// - Ensures the mutation ends `Confirmed`.
    #[test]
    fn test_job_driven_lifecycle() {
        let tracker = MutationTracker::new();
        let job_id = JobId::from("job-1");
        tracker.begin("image-9", "uploadImage");
        tracker.link_job("image-9", &job_id);

        assert_eq!(tracker.fail_job(&job_id), Some(MutationState::Failed));
        assert_eq!(tracker.reopen_job(&job_id), Some(MutationState::Pending));
        assert_eq!(tracker.pending_keys(), vec!["image-9".to_string()]);
        assert_eq!(tracker.confirm_job(&job_id), Some(MutationState::Confirmed));

        assert!(tracker.pending_keys().is_empty());
        assert_eq!(tracker.confirm_job(&job_id), None);
    }

    #[test]
    fn test_abandoned_job_fails_pending_mutation() {
        let tracker = MutationTracker::new();
        let job_id = JobId::from("job-2");
        tracker.begin("pdf-1", "uploadPdf");
        tracker.link_job("pdf-1", &job_id);

        assert_eq!(tracker.abandon_job(&job_id), Some(MutationState::Failed));
        assert_eq!(tracker.record("pdf-1").unwrap().job_id, Some(job_id));
    }

    #[test]
    fn test_reused_key_starts_over() {
        let tracker = MutationTracker::new();
        let old_job = JobId::from("old");
        tracker.begin("k", "deleteImage");
        tracker.link_job("k", &old_job);
        tracker.fail("k");

        tracker.begin("k", "deleteImage");
        assert_eq!(tracker.state("k"), Some(MutationState::Pending));
        assert_eq!(tracker.confirm_job(&old_job), None);
    }

    /// Validates that settled records are bounded while live ones survive.
    ///
    /// Assertions:
    /// - Ensures the oldest confirmed records are evicted first.
    /// - Ensures pending and retryable failed records are never evicted.
    #[test]
    fn test_settled_records_are_pruned() {
        let tracker = MutationTracker::new();
        tracker.begin("live", "updateStatus");
        let retryable = JobId::from("job-r");
        tracker.begin("retryable", "uploadImage");
        tracker.link_job("retryable", &retryable);
        tracker.fail_job(&retryable);

        for i in 0..SETTLED_RETAINED + 10 {
            let key = format!("done-{i}");
            tracker.begin(&key, "updateStatus");
            tracker.confirm(&key);
        }
        tracker.begin("trigger", "updateStatus");

        assert_eq!(tracker.state("done-0"), None);
        assert_eq!(tracker.state("done-9"), None);
        assert_eq!(tracker.state("done-10"), Some(MutationState::Confirmed));
        let last = format!("done-{}", SETTLED_RETAINED + 9);
        assert_eq!(tracker.state(&last), Some(MutationState::Confirmed));

        assert_eq!(tracker.state("live"), Some(MutationState::Pending));
        assert_eq!(tracker.state("retryable"), Some(MutationState::Failed));
        assert_eq!(tracker.reopen_job(&retryable), Some(MutationState::Pending));
    }

    #[test]
    fn test_unknown_job_is_ignored() {
        let tracker = MutationTracker::new();
        assert_eq!(tracker.confirm_job(&JobId::from("nope")), None);
        assert_eq!(tracker.state("nope"), None);
    }
}
