//! Application constants
//!
//! Centralized location for the domain-level defaults used by the sync core
//! and its adapters.

// Retry policy
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

// Drain worker
pub const DEFAULT_DRAIN_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_JOIN_TIMEOUT_SECS: u64 = 5;

// Persisted storage keys
pub const QUEUE_STORAGE_KEY: &str = "sync_job_queue";
pub const FAILED_JOBS_STORAGE_KEY: &str = "sync_failed_jobs";

// Storage defaults
pub const DEFAULT_STORAGE_DIR: &str = "fieldsync-data";
pub const SQLITE_TABLE_NAME: &str = "kv_store";

// Logging defaults
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Broadcast capacity for job events and reconnect triggers
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
