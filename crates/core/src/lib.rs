//! # FieldSync Core
//!
//! Offline synchronization core - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for key-value storage and job executors
//! - The durable job queue store
//! - The sync orchestrator, queue drain loop and sync health state
//! - Job notifications and the two-phase mutation tracker
//! - The `SyncService` facade that wires them together
//!
//! ## Architecture Principles
//! - Only depends on `fieldsync-common` and `fieldsync-domain`
//! - No filesystem, database or network code
//! - All external dependencies via traits

pub mod sync;

// Re-export specific items to avoid ambiguity
pub use sync::drain::{DrainReport, QueueDrainer};
pub use sync::errors::ExecutorError;
pub use sync::health::SyncHealth;
pub use sync::mutations::{MutationRecord, MutationTracker};
pub use sync::notifier::{JobEvent, JobNotifier};
pub use sync::orchestrator::{SyncGuard, SyncOrchestrator, TryOptions, TryOutcome};
pub use sync::ports::{executor_fn, JobExecutor, KeyValueStorage};
pub use sync::queue_store::JobQueueStore;
pub use sync::reconnect::ReconnectNotifier;
pub use sync::registry::ExecutorRegistry;
pub use sync::service::SyncService;
