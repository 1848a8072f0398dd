//! Background drain worker
//!
//! Runs the queue drain on every reconnect trigger and on a fixed interval,
//! for as long as the worker is started. Join handles are tracked,
//! cancellation is explicit, and `stop` waits for the loop with a timeout.
//! A drain running when `stop` is called finishes its current job and
//! leaves the rest queued.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fieldsync_core::{ExecutorRegistry, SyncService};
//! use fieldsync_domain::SyncConfig;
//! use fieldsync_infra::storage::MemoryStorage;
//! use fieldsync_infra::sync::DrainWorker;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = Arc::new(SyncService::new(
//!     Arc::new(MemoryStorage::new()),
//!     ExecutorRegistry::new(),
//!     SyncConfig::default(),
//! ));
//!
//! let mut worker = DrainWorker::new(Arc::clone(&service));
//! worker.start()?;
//! // ... application runs, connectivity changes call service.reconnect_notifier().notify() ...
//! worker.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use fieldsync_core::SyncService;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::errors::WorkerError;

/// Drain worker with explicit lifecycle management
pub struct DrainWorker {
    service: Arc<SyncService>,
    interval: Duration,
    join_timeout: Duration,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl DrainWorker {
    /// Worker using the drain interval and join timeout from the service
    /// configuration
    pub fn new(service: Arc<SyncService>) -> Self {
        let interval = service.config().drain_interval();
        let join_timeout = service.config().join_timeout();
        Self {
            service,
            interval,
            join_timeout,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_join_timeout(mut self, join_timeout: Duration) -> Self {
        self.join_timeout = join_timeout;
        self
    }

    /// Spawn the background loop
    ///
    /// The reconnect subscription is taken before this returns, so a trigger
    /// published right after `start` is not missed. The first interval drain
    /// runs one full interval after start.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<(), WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let service = Arc::clone(&self.service);
        let reconnect = service.reconnect_notifier().subscribe();
        let interval = self.interval.max(Duration::from_millis(1));
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::process_loop(service, reconnect, interval, cancel).await;
        });

        self.task_handle = Some(handle);
        info!(interval_secs = self.interval.as_secs(), "Drain worker started");
        Ok(())
    }

    /// Cancel the loop and wait for it to finish
    ///
    /// An executor call in flight is awaited up to the join timeout.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), WorkerError> {
        let Some(handle) = self.task_handle.take() else {
            return Err(WorkerError::NotRunning);
        };

        info!("Stopping drain worker");
        self.cancellation.cancel();

        let result = match tokio::time::timeout(self.join_timeout, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!("Drain worker task panicked: {}", e);
                Err(WorkerError::Panicked(e.to_string()))
            }
            Err(_) => {
                warn!("Drain worker task did not complete within timeout");
                Err(WorkerError::JoinTimeout(self.join_timeout))
            }
        };

        self.cancellation = CancellationToken::new();
        if result.is_ok() {
            info!("Drain worker stopped");
        }
        result
    }

    /// Returns true when the background loop is active
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    async fn process_loop(
        service: Arc<SyncService>,
        mut reconnect: tokio::sync::broadcast::Receiver<()>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reconnect_open = true;

        loop {
            let trigger = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Drain worker loop cancelled");
                    break;
                }
                received = reconnect.recv(), if reconnect_open => match received {
                    Ok(()) => "reconnect",
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Reconnect triggers collapsed");
                        "reconnect"
                    }
                    Err(RecvError::Closed) => {
                        warn!("Reconnect channel closed; interval drains only");
                        reconnect_open = false;
                        continue;
                    }
                },
                _ = ticker.tick() => "interval",
            };

            match service.drain_until(&cancel).await {
                Ok(report) if report.coalesced => {
                    debug!(trigger, "Drain already in flight; rerun scheduled");
                }
                Ok(report) if report.interrupted => {
                    debug!(trigger, completed = report.completed, "Drain stopped by shutdown");
                }
                Ok(report) => {
                    debug!(
                        trigger,
                        completed = report.completed,
                        requeued = report.requeued,
                        failed = report.failed,
                        "Background drain finished"
                    );
                }
                Err(e) => {
                    error!(trigger, error = %e, "Background drain failed");
                }
            }
        }
    }
}

impl Drop for DrainWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("DrainWorker dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
