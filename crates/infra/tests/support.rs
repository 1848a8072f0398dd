#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use fieldsync_core::{ExecutorError, ExecutorRegistry, JobExecutor, SyncService};
use fieldsync_domain::{StorageBackend, StorageConfig, SyncConfig};
use fieldsync_infra::storage::build_storage;

/// Executor whose remote side can be switched on and off
#[derive(Default)]
pub struct SwitchableExecutor {
    online: AtomicBool,
    calls: AtomicUsize,
}

impl SwitchableExecutor {
    pub fn offline() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobExecutor for SwitchableExecutor {
    async fn execute(&self, _payload: &serde_json::Value) -> Result<(), ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ExecutorError::transient("network unreachable"))
        }
    }
}

/// Sync service over a real storage backend rooted in a temp directory
pub struct TestService {
    pub service: Arc<SyncService>,
    pub executor: Arc<SwitchableExecutor>,
    pub storage: StorageConfig,
    _temp_dir: TempDir,
}

impl TestService {
    pub fn new(backend: StorageBackend, label: &str) -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let path = match backend {
            StorageBackend::Sqlite => temp_dir.path().join("queue.db"),
            _ => temp_dir.path().join("blobs"),
        };
        let storage = StorageConfig { backend, path };
        let executor = SwitchableExecutor::offline();
        let service = build_service(&storage, label, Arc::clone(&executor));

        Self { service, executor, storage, _temp_dir: temp_dir }
    }

    /// A second service over the same storage, as after an app restart
    pub fn restart(&self, label: &str) -> Arc<SyncService> {
        build_service(&self.storage, label, Arc::clone(&self.executor))
    }
}

fn build_service(
    storage: &StorageConfig,
    label: &str,
    executor: Arc<SwitchableExecutor>,
) -> Arc<SyncService> {
    let kv = build_storage(storage).expect("storage should open");
    let registry = ExecutorRegistry::new().with(label, executor);
    Arc::new(SyncService::new(kv, registry, SyncConfig { retry_delay_ms: 0, ..SyncConfig::default() }))
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
