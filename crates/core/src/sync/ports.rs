//! Port interfaces for sync operations

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use fieldsync_domain::Result;

use super::errors::ExecutorError;

/// String-keyed blob storage the job queue persists through
///
/// Implementations report every I/O failure as `FieldSyncError::Storage`.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`, `None` if absent
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; deleting an absent key succeeds
    async fn remove_item(&self, key: &str) -> Result<()>;
}

/// Applies one job payload against the remote system
///
/// Executors must be idempotent: delivery is at-least-once and a payload can
/// be applied twice (for example after a crash between the remote write and
/// the queue update).
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, payload: &serde_json::Value) -> std::result::Result<(), ExecutorError>;
}

/// Executor backed by an async closure
pub struct FnExecutor<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> JobExecutor for FnExecutor<F, Fut>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), ExecutorError>> + Send + 'static,
{
    async fn execute(&self, payload: &serde_json::Value) -> std::result::Result<(), ExecutorError> {
        (self.f)(payload.clone()).await
    }
}

/// Wrap an async closure as a [`JobExecutor`]
///
/// ```rust
/// use fieldsync_core::{executor_fn, ExecutorError, ExecutorRegistry};
///
/// let mut registry = ExecutorRegistry::new();
/// registry.register(
///     "deleteImage",
///     executor_fn(|payload| async move {
///         if payload.get("imageId").is_none() {
///             return Err(ExecutorError::permanent("missing imageId"));
///         }
///         Ok(())
///     }),
/// );
/// assert!(registry.contains("deleteImage"));
/// ```
pub fn executor_fn<F, Fut>(f: F) -> FnExecutor<F, Fut>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), ExecutorError>> + Send + 'static,
{
    FnExecutor { f, _fut: PhantomData }
}
