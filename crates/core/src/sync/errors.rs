//! Executor boundary errors
//!
//! Executors classify their own failures. Transient failures consume the
//! attempt budget; permanent ones send the job straight to the failed list.

use fieldsync_common::error::{CommonError, ErrorSeverity};
use fieldsync_common::{impl_error_classification, impl_error_conversion};
use fieldsync_domain::FieldSyncError;
use thiserror::Error;

/// Failure reported by a [`JobExecutor`](super::ports::JobExecutor)
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Worth retrying (network drop, 5xx, timeout)
    #[error("transient failure: {0}")]
    Transient(String),

    /// Retrying cannot help (malformed payload, 4xx, missing remote record)
    #[error("permanent failure: {0}")]
    Permanent(String),

    /// A classified remote or local failure
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ExecutorError {
    /// Failure that should consume one attempt and be tried again
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    /// Failure that should go straight to the failed list
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }
}

impl_error_conversion!(ExecutorError, Common);

impl_error_classification!(ExecutorError, Common,
    Self::Transient(_) => {
        retryable: true,
        severity: ErrorSeverity::Warning,
    },
    Self::Permanent(_) => {
        retryable: false,
        severity: ErrorSeverity::Error,
    }
);

impl From<ExecutorError> for FieldSyncError {
    fn from(err: ExecutorError) -> Self {
        Self::Executor(err.to_string())
    }
}
