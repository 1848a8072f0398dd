//! In-crate test doubles

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fieldsync_domain::{FieldSyncError, Result};
use parking_lot::Mutex;

use super::errors::ExecutorError;
use super::ports::{JobExecutor, KeyValueStorage};

/// Map-backed storage with a failure switch and optional latency
#[derive(Default)]
pub struct InMemoryStorage {
    items: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
    latency: Option<Duration>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.lock().contains_key(key)
    }

    async fn gate(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FieldSyncError::Storage("simulated storage failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorage for InMemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.gate().await?;
        Ok(self.items.lock().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.gate().await?;
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.gate().await?;
        self.items.lock().remove(key);
        Ok(())
    }
}

/// Executor that fails the first `failures` calls, then succeeds
pub struct FlakyExecutor {
    failures: usize,
    permanent: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FlakyExecutor {
    pub fn failing(failures: usize) -> Arc<Self> {
        Arc::new(Self { failures, permanent: false, delay: None, calls: AtomicUsize::new(0) })
    }

    pub fn always_failing() -> Arc<Self> {
        Self::failing(usize::MAX)
    }

    pub fn permanent() -> Arc<Self> {
        Arc::new(Self {
            failures: usize::MAX,
            permanent: true,
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::failing(0)
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self { failures: 0, permanent: false, delay: Some(delay), calls: AtomicUsize::new(0) })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobExecutor for FlakyExecutor {
    async fn execute(&self, _payload: &serde_json::Value) -> std::result::Result<(), ExecutorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if call < self.failures {
            if self.permanent {
                return Err(ExecutorError::permanent("rejected"));
            }
            return Err(ExecutorError::transient("network unreachable"));
        }
        Ok(())
    }
}
