//! Sync health state
//!
//! Process-wide flags and lists describing current sync activity and failure
//! status. Activity is reference-counted per label so nested or concurrent
//! operations sharing a label keep `is_syncing` up until the last one ends.
//! Every change publishes a fresh [`SyncHealthSnapshot`] on a watch channel.
//!
//! Only the orchestrator, the drain loop and the service facade mutate this
//! state; observers get snapshots and subscriptions.

use std::collections::HashMap;
use std::time::Instant;

use fieldsync_domain::{Job, JobId, SyncHealthSnapshot};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug)]
struct ActiveOperation {
    count: usize,
    started_at: Instant,
}

#[derive(Debug, Default)]
struct HealthState {
    active: HashMap<String, ActiveOperation>,
    sync_failed: bool,
    sync_acknowledged: bool,
    failed_jobs: Vec<Job>,
}

impl HealthState {
    fn snapshot(&self) -> SyncHealthSnapshot {
        let mut active_labels: Vec<String> = self.active.keys().cloned().collect();
        active_labels.sort_unstable();
        SyncHealthSnapshot {
            is_syncing: !self.active.is_empty(),
            active_labels,
            sync_failed: self.sync_failed,
            sync_acknowledged: self.sync_acknowledged,
            failed_jobs: self.failed_jobs.clone(),
        }
    }
}

/// Sync activity, failure flags and failed jobs, observable as snapshots
pub struct SyncHealth {
    state: Mutex<HealthState>,
    tx: watch::Sender<SyncHealthSnapshot>,
}

impl SyncHealth {
    /// Idle, unfailed state with no failed jobs
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SyncHealthSnapshot::default());
        Self { state: Mutex::new(HealthState::default()), tx }
    }

    /// Current state as an owned copy
    pub fn snapshot(&self) -> SyncHealthSnapshot {
        self.state.lock().snapshot()
    }

    /// Receive every state change; the receiver starts at the current state
    pub fn subscribe(&self) -> watch::Receiver<SyncHealthSnapshot> {
        self.tx.subscribe()
    }

    /// Whether any labelled operation is active
    pub fn is_syncing(&self) -> bool {
        !self.state.lock().active.is_empty()
    }

    /// Outstanding starts for `label`
    pub fn active_count(&self, label: &str) -> usize {
        self.state.lock().active.get(label).map_or(0, |op| op.count)
    }

    /// When the outermost still-active operation under `label` started
    pub fn active_since(&self, label: &str) -> Option<Instant> {
        self.state.lock().active.get(label).map(|op| op.started_at)
    }

    /// Jobs awaiting a retry or delete decision, oldest first
    pub fn failed_jobs(&self) -> Vec<Job> {
        self.state.lock().failed_jobs.clone()
    }

    pub(crate) fn start_sync(&self, label: &str) {
        self.update(|state| {
            let op = state
                .active
                .entry(label.to_string())
                .or_insert_with(|| ActiveOperation { count: 0, started_at: Instant::now() });
            op.count += 1;
            debug!(label, outstanding = op.count, "Sync operation started");
        });
    }

    pub(crate) fn end_sync(&self, label: &str) {
        self.update(|state| {
            let Some(op) = state.active.get_mut(label) else {
                warn!(label, "end_sync called for a label that is not active");
                return;
            };
            op.count -= 1;
            if op.count == 0 {
                let elapsed_ms = op.started_at.elapsed().as_millis() as u64;
                state.active.remove(label);
                debug!(label, elapsed_ms, "Sync operation finished");
            }
        });
    }

    /// A wrapped operation failed: raise the flag and re-arm the warning
    pub(crate) fn mark_sync_failed(&self) {
        self.update(|state| {
            state.sync_failed = true;
            state.sync_acknowledged = false;
        });
    }

    /// The user dismissed the sync-failed warning
    pub(crate) fn acknowledge(&self) {
        self.update(|state| state.sync_acknowledged = true);
    }

    pub(crate) fn set_failed_jobs(&self, jobs: Vec<Job>) {
        self.update(|state| state.failed_jobs = jobs);
    }

    /// Append a failed job, replacing an older entry with the same id
    pub(crate) fn push_failed_job(&self, job: Job) {
        self.update(|state| {
            state.failed_jobs.retain(|j| j.id != job.id);
            state.failed_jobs.push(job);
        });
    }

    pub(crate) fn remove_failed_jobs(&self, ids: &[JobId]) {
        self.update(|state| state.failed_jobs.retain(|j| !ids.contains(&j.id)));
    }

    fn update(&self, f: impl FnOnce(&mut HealthState)) {
        let mut state = self.state.lock();
        f(&mut state);
        // Published under the lock so snapshots land in mutation order
        self.tx.send_replace(state.snapshot());
    }
}

impl Default for SyncHealth {
    fn default() -> Self {
        Self::new()
    }
}
