//! Error types used throughout the synchronization core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for FieldSync
///
/// Storage failures always surface as [`FieldSyncError::Storage`] and are
/// never retried by the core; callers treat them as a hard failure of the
/// enclosing operation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum FieldSyncError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Executor error: {0}")]
    Executor(String),
}

impl FieldSyncError {
    /// True when the error came from the local key-value storage layer
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<serde_json::Error> for FieldSyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for FieldSync operations
pub type Result<T> = std::result::Result<T, FieldSyncError>;
