//! # FieldSync Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - Key-value storage adapters (JSON files, SQLite, memory)
//! - Configuration loading from environment and files
//! - Tracing initialisation
//! - Connectivity monitoring and the background drain worker
//!
//! ## Architecture
//! - Implements traits defined in `fieldsync-core`
//! - Contains all "impure" code (filesystem, database, background tasks)

pub mod config;
pub mod errors;
pub mod observability;
pub mod storage;
pub mod sync;

// Re-export commonly used items
pub use errors::InfraError;
pub use observability::init_tracing;
pub use storage::{build_storage, FileStorage, MemoryStorage, SqliteStorage};
pub use sync::{ConnectivityMonitor, DrainWorker, NetworkStatus, WorkerError};
