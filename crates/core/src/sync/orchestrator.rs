//! Sync orchestrator
//!
//! Two entry points for callers that just mutated local state:
//! - [`SyncOrchestrator::try_now_or_queue`] attempts the remote apply inline
//!   with a few fast retries and falls back to a durable job
//! - [`SyncOrchestrator::wrap_with_sync`] instruments any async operation with
//!   sync-in-progress and sync-failed signaling

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fieldsync_common::error::ErrorClassification;
use fieldsync_domain::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
use fieldsync_domain::{Job, Result, SyncConfig};
use tracing::{debug, info, instrument, warn};

use super::health::SyncHealth;
use super::notifier::JobNotifier;
use super::queue_store::JobQueueStore;
use super::registry::ExecutorRegistry;

/// Inline attempt policy for [`SyncOrchestrator::try_now_or_queue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryOptions {
    /// Total inline attempts; values below 1 are treated as 1
    pub attempts: u32,
    /// Pause between failed attempts
    pub delay: Duration,
}

impl TryOptions {
    /// Explicit policy
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Policy from `sync.max_attempts` and `sync.retry_delay_ms`
    pub fn from_config(config: &SyncConfig) -> Self {
        Self { attempts: config.max_attempts, delay: config.retry_delay() }
    }
}

impl Default for TryOptions {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// What happened to an inline attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TryOutcome {
    /// The executor succeeded; nothing was queued
    Applied,
    /// Every attempt failed transiently; the payload is now a durable job
    Queued(Job),
    /// The executor reported a permanent failure; the job went straight to
    /// the failed list
    Failed(Job),
    /// No executor is registered for the label; nothing happened
    NoExecutor,
}

/// Marks a label active for as long as the guard lives
pub struct SyncGuard {
    health: Arc<SyncHealth>,
    label: String,
}

impl SyncGuard {
    /// Label held active by this guard
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.health.end_sync(&self.label);
    }
}

/// Runs named sync operations and inline remote attempts
///
/// Active labels are reported to [`SyncHealth`]. Inline attempts that give up
/// are persisted through [`JobQueueStore`] so the drainer can finish them.
pub struct SyncOrchestrator {
    health: Arc<SyncHealth>,
    registry: Arc<ExecutorRegistry>,
    store: Arc<JobQueueStore>,
    notifier: Arc<JobNotifier>,
}

impl SyncOrchestrator {
    /// Orchestrator over shared health, executors, queue and notifier
    pub fn new(
        health: Arc<SyncHealth>,
        registry: Arc<ExecutorRegistry>,
        store: Arc<JobQueueStore>,
        notifier: Arc<JobNotifier>,
    ) -> Self {
        Self { health, registry, store, notifier }
    }

    /// Mark `label` active. Every call must be paired with [`end_sync`].
    ///
    /// [`end_sync`]: Self::end_sync
    pub fn start_sync(&self, label: &str) {
        self.health.start_sync(label);
    }

    /// Release `label` marked by [`start_sync`](Self::start_sync)
    pub fn end_sync(&self, label: &str) {
        self.health.end_sync(label);
    }

    /// Mark `label` active until the returned guard is dropped
    pub fn begin(&self, label: &str) -> SyncGuard {
        self.health.start_sync(label);
        SyncGuard { health: Arc::clone(&self.health), label: label.to_string() }
    }

    /// Run `op` as a named sync operation
    ///
    /// Yields once after marking the label active so observers can render the
    /// syncing state before the work starts. An error raises `sync_failed`
    /// (and clears the acknowledgment) before being returned unchanged. The
    /// label is released on every exit path, including cancellation.
    pub async fn wrap_with_sync<F, Fut, T, E>(&self, label: &str, op: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Display,
    {
        let _guard = self.begin(label);
        tokio::task::yield_now().await;

        match op().await {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(label, error = %err, "Sync operation failed");
                self.health.mark_sync_failed();
                Err(err)
            }
        }
    }

    /// Apply `payload` now, or turn the failure into a durable job
    ///
    /// Attempts the executor for `label` up to `options.attempts` times,
    /// sleeping `options.delay` (or the error's `retry_after`) between
    /// failures and stopping at the first success. A permanent error stops
    /// the loop and records the job as failed. Only storage errors are returned as `Err`.
    #[instrument(skip(self, payload, options), fields(attempts = options.attempts))]
    pub async fn try_now_or_queue(
        &self,
        label: &str,
        payload: serde_json::Value,
        options: TryOptions,
    ) -> Result<TryOutcome> {
        let Some(executor) = self.registry.get(label) else {
            warn!(label, "No executor registered for label; nothing to do");
            return Ok(TryOutcome::NoExecutor);
        };

        let attempts = options.attempts.max(1);
        for attempt in 1..=attempts {
            match executor.execute(&payload).await {
                Ok(()) => {
                    debug!(label, attempt, "Inline attempt succeeded");
                    return Ok(TryOutcome::Applied);
                }
                Err(err) if !err.is_retryable() => {
                    warn!(label, attempt, error = %err, "Inline attempt failed permanently");
                    let job = self.store.add_failed(label, payload).await?;
                    self.health.push_failed_job(job.clone());
                    self.notifier.notify_job_failed(&job, err.to_string());
                    return Ok(TryOutcome::Failed(job));
                }
                Err(err) => {
                    debug!(label, attempt, max_attempts = attempts, error = %err, "Inline attempt failed");
                    // A server-requested pause overrides the configured delay
                    let delay = err.retry_after().unwrap_or(options.delay);
                    if attempt < attempts && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let job = self.store.add(label, payload).await?;
        info!(label, job_id = %job.id, "Inline attempts exhausted; job queued for drain");
        Ok(TryOutcome::Queued(job))
    }
}
