//! Job lifecycle notifications
//!
//! Broadcasts what happened to each job and feeds the mutation tracker, so
//! confirmation of an optimistic mutation is driven by job completion rather
//! than by whoever happens to re-read the queue.

use std::sync::Arc;

use fieldsync_domain::constants::EVENT_CHANNEL_CAPACITY;
use fieldsync_domain::{Job, JobId};
use tokio::sync::broadcast;
use tracing::debug;

use super::mutations::MutationTracker;

/// What happened to a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// The executor succeeded and the job left the queue
    Completed { job_id: JobId, label: String },
    /// The attempt failed and the job stays queued for another pass
    Requeued { job_id: JobId, label: String, attempt: u32 },
    /// The job moved to the failed list
    Failed { job_id: JobId, label: String, reason: String },
    /// A user retry put the job back in the queue
    Retried { job_id: JobId },
    /// A user deleted the job
    Deleted { job_id: JobId },
}

/// Publishes [`JobEvent`]s and keeps linked mutations in step
///
/// Every event is applied to the [`MutationTracker`] before it is broadcast,
/// so a subscriber never sees a completion whose mutation is still pending.
pub struct JobNotifier {
    tx: broadcast::Sender<JobEvent>,
    mutations: Arc<MutationTracker>,
}

impl JobNotifier {
    /// Notifier feeding `mutations`
    pub fn new(mutations: Arc<MutationTracker>) -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx, mutations }
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    /// The job succeeded and left the queue
    pub fn notify_job_complete(&self, job: &Job) {
        self.mutations.confirm_job(&job.id);
        self.publish(JobEvent::Completed { job_id: job.id.clone(), label: job.label.clone() });
    }

    /// The attempt failed and the job stays queued
    pub fn notify_requeued(&self, job: &Job) {
        self.publish(JobEvent::Requeued {
            job_id: job.id.clone(),
            label: job.label.clone(),
            attempt: job.attempt_count,
        });
    }

    /// The job moved to the failed list
    pub fn notify_job_failed(&self, job: &Job, reason: impl Into<String>) {
        self.mutations.fail_job(&job.id);
        self.publish(JobEvent::Failed {
            job_id: job.id.clone(),
            label: job.label.clone(),
            reason: reason.into(),
        });
    }

    /// A user retry put the job back in the queue
    pub fn notify_retried(&self, job_id: &JobId) {
        self.mutations.reopen_job(job_id);
        self.publish(JobEvent::Retried { job_id: job_id.clone() });
    }

    /// A user deleted the job
    pub fn notify_deleted(&self, job_id: &JobId) {
        self.mutations.abandon_job(job_id);
        self.publish(JobEvent::Deleted { job_id: job_id.clone() });
    }

    fn publish(&self, event: JobEvent) {
        // No subscribers is fine
        if let Ok(receivers) = self.tx.send(event) {
            debug!(receivers, "Job event published");
        }
    }
}
