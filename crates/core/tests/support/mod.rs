//! Shared doubles for the core integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fieldsync_core::{ExecutorError, JobExecutor, KeyValueStorage};
use fieldsync_domain::{FieldSyncError, Result, SyncConfig};
use parking_lot::Mutex;

/// Storage double that records writes and can be switched to fail
#[derive(Default)]
pub struct RecordingStorage {
    items: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FieldSyncError::Storage("disk unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorage for RecordingStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.items.lock().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.items.lock().remove(key);
        Ok(())
    }
}

/// Executor that fails transiently a fixed number of times, then succeeds
pub struct ScriptedExecutor {
    failures_left: AtomicUsize,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedExecutor {
    pub fn failing(times: usize) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicUsize::new(times),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        })
    }

    pub fn offline() -> Arc<Self> {
        Self::failing(usize::MAX)
    }

    pub fn online() -> Arc<Self> {
        Self::failing(0)
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self { failures_left: AtomicUsize::new(0), calls: AtomicUsize::new(0), delay })
    }

    /// Let every following call succeed
    pub fn go_online(&self) {
        self.failures_left.store(0, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobExecutor for ScriptedExecutor {
    async fn execute(&self, _payload: &serde_json::Value) -> std::result::Result<(), ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.failures_left.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(ExecutorError::transient("network unreachable"));
        }
        Ok(())
    }
}

/// Sync settings with no inline retry delay
pub fn fast_config() -> SyncConfig {
    SyncConfig { retry_delay_ms: 0, ..SyncConfig::default() }
}
