//! Durable job record
//!
//! A job is one deferred unit of work: a local mutation waiting to be applied
//! against the remote store. The persisted shape is a JSON object with the
//! camelCase fields `id`, `label`, `payload`, `attemptCount`, `lastAttempt`,
//! `createdAt` and `status`; restarts and other processes parse that shape.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique job identifier, assigned at enqueue time
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Job processing status
///
/// `Done` never reaches storage: a successful job is removed instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Done,
    Failed,
}

crate::impl_domain_status_conversions!(JobStatus {
    Queued => "queued",
    InProgress => "in_progress",
    Done => "done",
    Failed => "failed",
});

impl JobStatus {
    /// Jobs the drain loop should pick up. `InProgress` leftovers come from a
    /// pass that was interrupted before it could write the outcome.
    pub fn is_drainable(self) -> bool {
        matches!(self, Self::Queued | Self::InProgress)
    }
}

/// One durable unit of deferred work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    /// Selects the executor
    pub label: String,
    /// Opaque executor input
    pub payload: serde_json::Value,
    /// Failed drain attempts since the last reset
    pub attempt_count: u32,
    /// Milliseconds since epoch of the latest attempt, 0 if never attempted
    pub last_attempt: u64,
    /// Milliseconds since epoch of enqueue
    pub created_at: u64,
    pub status: JobStatus,
}

impl Job {
    /// Create a queued job with a fresh id
    pub fn new(label: impl Into<String>, payload: serde_json::Value, created_at: u64) -> Self {
        Self {
            id: JobId::new(),
            label: label.into(),
            payload,
            attempt_count: 0,
            last_attempt: 0,
            created_at,
            status: JobStatus::Queued,
        }
    }

    /// Mark the job as picked up by a drain pass
    pub fn mark_in_progress(&mut self) {
        self.status = JobStatus::InProgress;
    }

    /// Record one failed attempt at `now` and return the job to the queue
    pub fn record_failed_attempt(&mut self, now: u64) {
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.last_attempt = now;
        self.status = JobStatus::Queued;
    }

    /// True once the attempt budget is spent
    pub fn has_exhausted(&self, max_attempts: u32) -> bool {
        self.attempt_count >= max_attempts
    }

    pub fn mark_failed(&mut self) {
        self.status = JobStatus::Failed;
    }

    /// Reset after a user-initiated retry
    pub fn reset_for_retry(&mut self) {
        self.attempt_count = 0;
        self.status = JobStatus::Queued;
    }
}
