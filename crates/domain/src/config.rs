//! Configuration structures
//!
//! Every section has a `Default` so a partial file (or an empty one) yields a
//! working configuration. Loading lives in the infra crate.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DRAIN_INTERVAL_SECS, DEFAULT_JOIN_TIMEOUT_SECS, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS, DEFAULT_STORAGE_DIR, FAILED_JOBS_STORAGE_KEY,
    QUEUE_STORAGE_KEY,
};
use crate::errors::{FieldSyncError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Check cross-field constraints the type system can't express
    ///
    /// # Errors
    /// Returns `FieldSyncError::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.sync.max_attempts == 0 {
            return Err(FieldSyncError::Config("sync.max_attempts must be at least 1".to_string()));
        }
        if self.sync.queue_key.trim().is_empty() {
            return Err(FieldSyncError::Config("sync.queue_key must not be empty".to_string()));
        }
        if self.sync.failed_key.trim().is_empty() {
            return Err(FieldSyncError::Config("sync.failed_key must not be empty".to_string()));
        }
        if self.sync.queue_key == self.sync.failed_key {
            return Err(FieldSyncError::Config(format!(
                "sync.queue_key and sync.failed_key must differ (both are '{}')",
                self.sync.queue_key
            )));
        }
        Ok(())
    }
}

/// Which key-value backend persists the queue blobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per key under `path`
    #[default]
    File,
    /// A single SQLite database at `path`
    Sqlite,
    /// Process memory only; nothing survives a restart
    Memory,
}

crate::impl_domain_status_conversions!(StorageBackend {
    File => "file",
    Sqlite => "sqlite",
    Memory => "memory",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for `file`, database file for `sqlite`, ignored for `memory`
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { backend: StorageBackend::File, path: PathBuf::from(DEFAULT_STORAGE_DIR) }
    }
}

/// Retry and drain policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Attempts before a job is moved to the failed list. Shared by the
    /// inline attempt loop and the drain loop.
    pub max_attempts: u32,
    /// Delay between inline attempts
    pub retry_delay_ms: u64,
    /// Period of the background drain pass
    pub drain_interval_secs: u64,
    /// Storage key of the active queue blob
    pub queue_key: String,
    /// Storage key of the failed-jobs blob
    pub failed_key: String,
    /// How long `DrainWorker::stop` waits for the loop to exit
    pub join_timeout_secs: u64,
}

impl SyncConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.drain_interval_secs)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            drain_interval_secs: DEFAULT_DRAIN_INTERVAL_SECS,
            queue_key: QUEUE_STORAGE_KEY.to_string(),
            failed_key: FAILED_JOBS_STORAGE_KEY.to_string(),
            join_timeout_secs: DEFAULT_JOIN_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), json: false }
    }
}
