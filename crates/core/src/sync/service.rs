//! Sync service facade
//!
//! One explicitly constructed object that owns the queue store, executor
//! registry, health state, orchestrator, drain loop and notifications.
//! Create it once at startup, share it behind an `Arc`, and drop it at exit.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use fieldsync_common::time::{Clock, SystemClock};
use fieldsync_domain::{Job, JobId, MutationState, Result, SyncConfig, SyncHealthSnapshot};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::drain::{DrainReport, QueueDrainer};
use super::health::SyncHealth;
use super::mutations::MutationTracker;
use super::notifier::{JobEvent, JobNotifier};
use super::orchestrator::{SyncOrchestrator, TryOptions, TryOutcome};
use super::ports::KeyValueStorage;
use super::queue_store::JobQueueStore;
use super::reconnect::ReconnectNotifier;
use super::registry::ExecutorRegistry;

const DRAIN_LABEL: &str = "drain";

/// Entry point of the sync core
///
/// Owns one queue store, executor registry, health state and drainer. Every
/// trigger and user action goes through it.
pub struct SyncService {
    config: SyncConfig,
    store: Arc<JobQueueStore>,
    registry: Arc<ExecutorRegistry>,
    health: Arc<SyncHealth>,
    mutations: Arc<MutationTracker>,
    notifier: Arc<JobNotifier>,
    orchestrator: SyncOrchestrator,
    drainer: QueueDrainer,
    reconnect: ReconnectNotifier,
}

impl SyncService {
    /// Service stamping jobs with the system clock
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        registry: ExecutorRegistry,
        config: SyncConfig,
    ) -> Self {
        Self::with_clock(storage, registry, config, Arc::new(SystemClock))
    }

    /// Service stamping jobs with `clock`
    pub fn with_clock(
        storage: Arc<dyn KeyValueStorage>,
        registry: ExecutorRegistry,
        config: SyncConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(JobQueueStore::with_clock(storage, &config, clock));
        let registry = Arc::new(registry);
        let health = Arc::new(SyncHealth::new());
        let mutations = Arc::new(MutationTracker::new());
        let notifier = Arc::new(JobNotifier::new(Arc::clone(&mutations)));
        let orchestrator = SyncOrchestrator::new(
            Arc::clone(&health),
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&notifier),
        );
        let drainer = QueueDrainer::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&health),
            Arc::clone(&notifier),
            config.max_attempts,
        );

        info!(executors = registry.len(), max_attempts = config.max_attempts, "Sync service created");

        Self {
            config,
            store,
            registry,
            health,
            mutations,
            notifier,
            orchestrator,
            drainer,
            reconnect: ReconnectNotifier::new(),
        }
    }

    /// Effective sync settings
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Executors registered for job labels
    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    /// Inline attempts and named sync operations
    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    /// App-start trigger: restore the persisted failed jobs, then drain
    ///
    /// Failed-list entries whose job is still in the active queue are
    /// dropped; the active copy is drained instead.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<DrainReport> {
        let failed = self.store.load_failed().await?;
        info!(failed_jobs = failed.len(), "Restoring failed jobs");
        self.health.set_failed_jobs(failed);
        self.drain().await
    }

    /// Connectivity-restored trigger
    pub async fn on_reconnect(&self) -> Result<DrainReport> {
        info!("Connectivity restored; draining queue");
        self.drain().await
    }

    /// Run the drain loop as the `drain` sync operation
    pub async fn drain(&self) -> Result<DrainReport> {
        self.orchestrator.wrap_with_sync(DRAIN_LABEL, || self.drainer.drain()).await
    }

    /// Drain until `stop` is cancelled, finishing the job in flight
    pub async fn drain_until(&self, stop: &CancellationToken) -> Result<DrainReport> {
        self.orchestrator.wrap_with_sync(DRAIN_LABEL, || self.drainer.drain_until(stop)).await
    }

    /// Whether a drain pass is in flight
    pub fn is_draining(&self) -> bool {
        self.drainer.is_draining()
    }

    /// Apply an optimistic local mutation remotely and track its confirmation
    ///
    /// The mutation under `key` is `Confirmed` immediately when the inline
    /// attempt succeeds. When the payload had to be queued it stays `Pending`
    /// until the carrying job completes.
    #[instrument(skip(self, payload))]
    pub async fn apply_mutation(
        &self,
        key: &str,
        label: &str,
        payload: serde_json::Value,
    ) -> Result<TryOutcome> {
        self.mutations.begin(key, label);
        let options = TryOptions::from_config(&self.config);

        let outcome = self
            .orchestrator
            .wrap_with_sync(label, || self.orchestrator.try_now_or_queue(label, payload, options))
            .await;

        match &outcome {
            Ok(TryOutcome::Applied) => {
                self.mutations.confirm(key);
            }
            Ok(TryOutcome::Queued(job)) => self.mutations.link_job(key, &job.id),
            Ok(TryOutcome::Failed(job)) => {
                self.mutations.link_job(key, &job.id);
                self.mutations.fail(key);
            }
            Ok(TryOutcome::NoExecutor) | Err(_) => {
                self.mutations.fail(key);
            }
        }
        outcome
    }

    /// See [`SyncOrchestrator::try_now_or_queue`]
    pub async fn try_now_or_queue(
        &self,
        label: &str,
        payload: serde_json::Value,
        options: TryOptions,
    ) -> Result<TryOutcome> {
        self.orchestrator.try_now_or_queue(label, payload, options).await
    }

    /// See [`SyncOrchestrator::wrap_with_sync`]
    pub async fn wrap_with_sync<F, Fut, T, E>(&self, label: &str, op: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Display,
    {
        self.orchestrator.wrap_with_sync(label, op).await
    }

    /// Current health snapshot
    pub fn health(&self) -> SyncHealthSnapshot {
        self.health.snapshot()
    }

    /// Watch health snapshots as they change
    pub fn subscribe(&self) -> watch::Receiver<SyncHealthSnapshot> {
        self.health.subscribe()
    }

    /// Dismiss the transient sync-failed warning; the queue is untouched
    pub fn acknowledge_sync_failure(&self) {
        self.health.acknowledge();
    }

    /// Reset `jobs` to `queued` with zero attempts and drain again
    #[instrument(skip(self, jobs), fields(count = jobs.len()))]
    pub async fn retry_failed_jobs(&self, jobs: &[Job]) -> Result<DrainReport> {
        let ids: Vec<JobId> = jobs.iter().map(|j| j.id.clone()).collect();
        let requeued = self.store.requeue(&ids).await?;

        self.health.remove_failed_jobs(&ids);
        self.health.acknowledge();
        for job in &requeued {
            self.notifier.notify_retried(&job.id);
        }
        info!(requeued = requeued.len(), "Failed jobs requeued by user");

        self.drain().await
    }

    /// Permanently delete `jobs`; returns how many stored records were removed
    #[instrument(skip(self, jobs), fields(count = jobs.len()))]
    pub async fn delete_failed_jobs(&self, jobs: &[Job]) -> Result<usize> {
        let ids: Vec<JobId> = jobs.iter().map(|j| j.id.clone()).collect();
        let removed = self.store.purge(&ids).await?;

        self.health.remove_failed_jobs(&ids);
        self.health.acknowledge();
        for id in &ids {
            self.notifier.notify_deleted(id);
        }
        info!(removed, "Failed jobs deleted by user");
        Ok(removed)
    }

    /// Jobs still waiting in the active queue
    pub async fn pending_jobs(&self) -> Result<Vec<Job>> {
        self.store.load().await
    }

    /// Handle that connectivity watchers signal on reconnect
    pub fn reconnect_notifier(&self) -> ReconnectNotifier {
        self.reconnect.clone()
    }

    /// Receive job lifecycle events
    pub fn job_events(&self) -> broadcast::Receiver<JobEvent> {
        self.notifier.subscribe()
    }

    /// State of the mutation tracked under `key`
    pub fn mutation_state(&self, key: &str) -> Option<MutationState> {
        self.mutations.state(key)
    }
}
