use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::{Result, TributaryError};
use crate::cache::Cache;

/// In-process cache backed by a mutex-guarded map. Used in tests and for
/// one-shot runs where persistence across processes is not needed.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| TributaryError::Cache(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| TributaryError::Cache(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
