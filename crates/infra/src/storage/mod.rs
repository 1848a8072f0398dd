//! Key-value storage adapters for the job queue
//!
//! - [`FileStorage`]: one JSON file per key, atomic replace
//! - [`SqliteStorage`]: `kv_store` table behind an r2d2 pool
//! - [`MemoryStorage`]: process memory with a failure switch

pub mod file;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use fieldsync_core::KeyValueStorage;
use fieldsync_domain::{Result, StorageBackend, StorageConfig};
use tracing::info;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Build the backend selected by `config`
///
/// # Errors
/// Returns `FieldSyncError::Storage` if the SQLite database cannot be opened.
pub fn build_storage(config: &StorageConfig) -> Result<Arc<dyn KeyValueStorage>> {
    info!(backend = %config.backend, path = %config.path.display(), "Opening queue storage");
    let storage: Arc<dyn KeyValueStorage> = match config.backend {
        StorageBackend::File => Arc::new(FileStorage::new(&config.path)),
        StorageBackend::Sqlite => Arc::new(SqliteStorage::open(&config.path)?),
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
    };
    Ok(storage)
}
