//! Executor registry
//!
//! Maps a job label to the executor that applies its payload. Built once at
//! startup and read-only afterwards; the same lookup serves the inline attempt
//! path and the drain loop.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::ports::JobExecutor;

#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn JobExecutor>>,
}

impl ExecutorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `executor` under `label`, replacing any previous one
    pub fn register<E>(&mut self, label: impl Into<String>, executor: E) -> &mut Self
    where
        E: JobExecutor + 'static,
    {
        self.executors.insert(label.into(), Arc::new(executor));
        self
    }

    /// Register an executor that is already shared
    pub fn register_arc(
        &mut self,
        label: impl Into<String>,
        executor: Arc<dyn JobExecutor>,
    ) -> &mut Self {
        self.executors.insert(label.into(), executor);
        self
    }

    /// Builder form of [`register_arc`](Self::register_arc)
    pub fn with(mut self, label: impl Into<String>, executor: Arc<dyn JobExecutor>) -> Self {
        self.register_arc(label, executor);
        self
    }

    /// Executor for `label`
    pub fn get(&self, label: &str) -> Option<Arc<dyn JobExecutor>> {
        self.executors.get(label).cloned()
    }

    /// Whether `label` has an executor
    pub fn contains(&self, label: &str) -> bool {
        self.executors.contains_key(label)
    }

    /// Registered labels, sorted
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    /// Number of registered labels
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    /// True when no executor is registered
    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry").field("labels", &self.labels()).finish()
    }
}
