//! SQLite key-value storage
//!
//! Blobs live in a single `kv_store` table behind an r2d2 pool. rusqlite is
//! blocking, so every call hops onto the blocking thread pool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use fieldsync_core::KeyValueStorage;
use fieldsync_domain::constants::SQLITE_TABLE_NAME;
use fieldsync_domain::Result;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use tokio::task;
use tracing::{debug, info};

use crate::errors::InfraError;

const DEFAULT_POOL_SIZE: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type SqlitePool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Open (or create) the database at `path` and ensure the table exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_pool_size(path, DEFAULT_POOL_SIZE)
    }

    pub fn open_with_pool_size(path: impl AsRef<Path>, pool_size: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(InfraError::from)?;
        }
        let manager = SqliteConnectionManager::file(&path)
            .with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
        let storage = Self::build(manager, pool_size.max(1), Some(path))?;

        info!(
            db_path = ?storage.path,
            max_connections = storage.pool.max_size(),
            "sqlite storage initialised"
        );
        Ok(storage)
    }

    /// Private in-memory database; a single connection so every call sees
    /// the same data
    pub fn in_memory() -> Result<Self> {
        Self::build(SqliteConnectionManager::memory(), 1, None)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn build(manager: SqliteConnectionManager, pool_size: u32, path: Option<PathBuf>) -> Result<Self> {
        let pool = Pool::builder().max_size(pool_size).build(manager).map_err(InfraError::from)?;
        let conn = pool.get().map_err(InfraError::from)?;
        create_schema(&conn)?;
        Ok(Self { pool, path })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&PooledConnection<SqliteConnectionManager>) -> std::result::Result<T, InfraError>
            + Send
            + 'static,
    {
        let pool = self.pool.clone();
        let result = task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(InfraError::from)?;
        Ok(result?)
    }
}

fn create_schema(conn: &rusqlite::Connection) -> std::result::Result<(), InfraError> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {SQLITE_TABLE_NAME} (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );"
    ))?;
    Ok(())
}

#[async_trait]
impl KeyValueStorage for SqliteStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let value = conn
                .query_row(
                    &format!("SELECT value FROM {SQLITE_TABLE_NAME} WHERE key = ?1"),
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {SQLITE_TABLE_NAME} (key, value, updated_at)
                     VALUES (?1, ?2, CAST(strftime('%s','now') AS INTEGER))
                     ON CONFLICT(key) DO UPDATE SET
                         value = excluded.value,
                         updated_at = excluded.updated_at"
                ),
                params![key, value],
            )?;
            debug!(key = %key, bytes = value.len(), "Blob upserted");
            Ok(())
        })
        .await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute(&format!("DELETE FROM {SQLITE_TABLE_NAME} WHERE key = ?1"), params![key])?;
            Ok(())
        })
        .await
    }
}
