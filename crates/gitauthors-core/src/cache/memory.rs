//! In-process cache backend.

use crate::cache::traits::{CacheKey, CacheStore};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Cache store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().map_err(|_| Error::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &CacheKey, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| Error::Poisoned)?;
        entries.insert(key.clone(), value.to_vec());
        Ok(())
    }

    fn has(&self, key: &CacheKey) -> Result<bool> {
        let entries = self.entries.lock().map_err(|_| Error::Poisoned)?;
        Ok(entries.contains_key(key))
    }

    fn retain_generation(&self, namespace: &str, generation: &str) -> Result<usize> {
        let mut entries = self.entries.lock().map_err(|_| Error::Poisoned)?;
        let before = entries.len();
        entries.retain(|k, _| k.namespace != namespace || k.generation == generation);
        Ok(before - entries.len())
    }
}
