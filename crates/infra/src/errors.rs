//! Conversions from infrastructure errors into domain errors
//!
//! Every adapter failure below the `KeyValueStorage` port becomes
//! `FieldSyncError::Storage` so the queue store can propagate it unchanged.

use fieldsync_domain::FieldSyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("blocking storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("simulated storage failure")]
    Simulated,
}

impl From<InfraError> for FieldSyncError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Sqlite(rusqlite::Error::SqliteFailure(code, message)) => {
                FieldSyncError::Storage(format!(
                    "sqlite failure {:?} (code {}): {}",
                    code.code,
                    code.extended_code,
                    message.unwrap_or_default()
                ))
            }
            other => FieldSyncError::Storage(other.to_string()),
        }
    }
}
