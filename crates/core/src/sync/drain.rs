//! Queue drain loop
//!
//! Walks the active queue in insertion order and applies each job through its
//! executor, one job at a time so ordering-sensitive side effects land in
//! creation order.
//!
//! The loop is single-flight: a trigger that arrives while a pass is running
//! does not start a second pass over the same jobs. It is coalesced into one
//! extra pass that starts after the current one completes.
//!
//! A stop request is only honoured between jobs, so a job's queue updates
//! are never cut off halfway.

use std::sync::Arc;

use fieldsync_common::error::ErrorClassification;
use fieldsync_domain::{Job, JobStatus, Result};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::health::SyncHealth;
use super::notifier::JobNotifier;
use super::queue_store::JobQueueStore;
use super::registry::ExecutorRegistry;

/// Summary of one `drain` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Passes run, including coalesced reruns
    pub passes: u32,
    /// Jobs picked up
    pub processed: usize,
    /// Jobs applied and removed
    pub completed: usize,
    /// Jobs that failed and stay queued
    pub requeued: usize,
    /// Jobs moved to the failed list
    pub failed: usize,
    /// This call found a drain in flight and only scheduled a rerun
    pub coalesced: bool,
    /// A stop request ended the drain before the queue was exhausted
    pub interrupted: bool,
}

#[derive(Debug, Default)]
struct FlightState {
    running: bool,
    rerun: bool,
}

/// Resets the flight state if a pass bails out with an error or is dropped
struct FlightGuard<'a> {
    state: &'a Mutex<FlightState>,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock();
            state.running = false;
            state.rerun = false;
        }
    }
}

/// Sequential, single-flight processor of the active job queue
pub struct QueueDrainer {
    store: Arc<JobQueueStore>,
    registry: Arc<ExecutorRegistry>,
    health: Arc<SyncHealth>,
    notifier: Arc<JobNotifier>,
    max_attempts: u32,
    flight: Mutex<FlightState>,
}

impl QueueDrainer {
    /// Drainer failing jobs after `max_attempts` retryable failures
    pub fn new(
        store: Arc<JobQueueStore>,
        registry: Arc<ExecutorRegistry>,
        health: Arc<SyncHealth>,
        notifier: Arc<JobNotifier>,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            registry,
            health,
            notifier,
            max_attempts: max_attempts.max(1),
            flight: Mutex::new(FlightState::default()),
        }
    }

    /// Whether a drain is currently running
    pub fn is_draining(&self) -> bool {
        self.flight.lock().running
    }

    /// Drain the queue, or schedule a rerun if a drain is already running
    ///
    /// Storage errors abort the drain and are returned; executor failures are
    /// recorded on the jobs and never surface here.
    pub async fn drain(&self) -> Result<DrainReport> {
        self.drain_until(&CancellationToken::new()).await
    }

    /// Like [`drain`](Self::drain), but stops before the next job once `stop`
    /// is cancelled
    ///
    /// The job in flight when `stop` fires runs to completion and its queue
    /// updates are written; the remaining jobs stay queued for the next drain.
    #[instrument(skip(self, stop))]
    pub async fn drain_until(&self, stop: &CancellationToken) -> Result<DrainReport> {
        {
            let mut state = self.flight.lock();
            if state.running {
                state.rerun = true;
                debug!("Drain already running; coalescing into a rerun");
                return Ok(DrainReport { coalesced: true, ..DrainReport::default() });
            }
            state.running = true;
        }
        let mut flight = FlightGuard { state: &self.flight, armed: true };

        let mut report = DrainReport::default();
        loop {
            self.run_pass(&mut report, stop).await?;
            if report.interrupted {
                // The armed guard clears the flight and any pending rerun
                info!(passes = report.passes, completed = report.completed, "Drain stopped between jobs");
                return Ok(report);
            }

            let again = {
                let mut state = self.flight.lock();
                if state.rerun {
                    state.rerun = false;
                    true
                } else {
                    state.running = false;
                    false
                }
            };
            if !again {
                flight.armed = false;
                break;
            }
            debug!("Running coalesced drain pass");
        }

        info!(
            passes = report.passes,
            completed = report.completed,
            requeued = report.requeued,
            failed = report.failed,
            "Drain finished"
        );
        Ok(report)
    }

    async fn run_pass(&self, report: &mut DrainReport, stop: &CancellationToken) -> Result<()> {
        report.passes += 1;
        let jobs = self.store.load().await?;
        debug!(queued = jobs.len(), pass = report.passes, "Drain pass started");

        for job in jobs.into_iter().filter(|j| j.status.is_drainable()) {
            if stop.is_cancelled() {
                report.interrupted = true;
                break;
            }
            self.process_job(job, report).await?;
        }
        Ok(())
    }

    async fn process_job(&self, job: Job, report: &mut DrainReport) -> Result<()> {
        // Re-read through the store: the job may have been purged or retried
        // since the pass loaded its snapshot
        let Some(job) = self.store.set_status(&job.id, JobStatus::InProgress).await? else {
            debug!(job_id = %job.id, "Job left the queue before processing");
            return Ok(());
        };
        report.processed += 1;

        let Some(executor) = self.registry.get(&job.label) else {
            warn!(job_id = %job.id, label = %job.label, "No executor registered; failing job");
            self.fail_job(&job, "no executor registered for label", report).await?;
            return Ok(());
        };

        match executor.execute(&job.payload).await {
            Ok(()) => {
                self.store.remove(&job.id).await?;
                report.completed += 1;
                debug!(job_id = %job.id, label = %job.label, "Job applied");
                self.notifier.notify_job_complete(&job);
            }
            Err(err) if !err.is_retryable() => {
                warn!(
                    job_id = %job.id,
                    label = %job.label,
                    severity = %err.severity(),
                    error = %err,
                    "Job failed permanently"
                );
                self.fail_job(&job, &err.to_string(), report).await?;
            }
            Err(err) => {
                let Some(updated) = self.store.increment_attempt(&job.id).await? else {
                    return Ok(());
                };
                if updated.has_exhausted(self.max_attempts) {
                    warn!(
                        job_id = %job.id,
                        label = %job.label,
                        attempt = updated.attempt_count,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Job exhausted its attempts"
                    );
                    self.fail_job(&updated, &err.to_string(), report).await?;
                } else {
                    debug!(
                        job_id = %job.id,
                        label = %job.label,
                        attempt = updated.attempt_count,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Job attempt failed; left queued"
                    );
                    report.requeued += 1;
                    self.notifier.notify_requeued(&updated);
                }
            }
        }
        Ok(())
    }

    async fn fail_job(&self, job: &Job, reason: &str, report: &mut DrainReport) -> Result<()> {
        if let Some(failed) = self.store.move_to_failed(&job.id).await? {
            report.failed += 1;
            self.health.push_failed_job(failed.clone());
            self.notifier.notify_job_failed(&failed, reason);
        }
        Ok(())
    }
}
