//! Sync health snapshot
//!
//! A read-only copy of the process-wide sync health state, handed to UI
//! observers. Only the sync core produces new snapshots.

use serde::{Deserialize, Serialize};

use super::job::Job;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncHealthSnapshot {
    /// At least one named operation is active
    pub is_syncing: bool,
    /// Labels of the active operations, sorted
    pub active_labels: Vec<String>,
    /// A wrapped operation failed since the flag was last cleared
    pub sync_failed: bool,
    /// The user dismissed the sync-failed warning
    pub sync_acknowledged: bool,
    /// Jobs that exhausted their retries, oldest first
    pub failed_jobs: Vec<Job>,
}

impl SyncHealthSnapshot {
    /// The dismissable "sync failed" banner should be visible
    pub fn shows_sync_failed_banner(&self) -> bool {
        self.sync_failed && !self.sync_acknowledged
    }

    /// The persistent failed-jobs banner should be visible
    pub fn shows_failed_jobs_banner(&self) -> bool {
        !self.failed_jobs.is_empty()
    }
}
