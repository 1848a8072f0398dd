//! In-process key-value storage
//!
//! Nothing survives a restart. The failure switch makes every call return a
//! storage error, for exercising failure propagation above the port.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use fieldsync_core::KeyValueStorage;
use fieldsync_domain::Result;
use parking_lot::RwLock;

use crate::errors::InfraError;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn check(&self) -> std::result::Result<(), InfraError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(InfraError::Simulated);
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.items.read().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.check()?;
        self.items.write().remove(key);
        Ok(())
    }
}
