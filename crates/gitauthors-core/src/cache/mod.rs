//! Cache abstraction layer.
//!
//! Components memoize expensive history queries through a [`Cache`] handle
//! bound to one repository and one HEAD commit. The bytes live in a
//! [`CacheStore`] backend (SQLite or in-memory) supplied by the host.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;
pub use traits::{CacheKey, CacheOp, CacheStore};

use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// A cache scoped to one repository (`namespace`) at one HEAD (`generation`).
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    namespace: String,
    generation: String,
}

impl Cache {
    /// Bind a store to a repository state, evicting entries computed
    /// against any other HEAD of the same repository.
    pub fn bind(
        store: Arc<dyn CacheStore>,
        namespace: impl Into<String>,
        generation: impl Into<String>,
    ) -> Result<Self> {
        let namespace = namespace.into();
        let generation = generation.into();
        let removed = store.retain_generation(&namespace, &generation)?;
        if removed > 0 {
            tracing::debug!("Evicted {} stale cache entries for {}", removed, namespace);
        }
        Ok(Self {
            store,
            namespace,
            generation,
        })
    }

    /// HEAD commit this cache is bound to.
    pub fn generation(&self) -> &str {
        &self.generation
    }

    fn key(&self, op: CacheOp, subject: &str) -> CacheKey {
        CacheKey {
            namespace: self.namespace.clone(),
            generation: self.generation.clone(),
            op,
            subject: subject.to_string(),
        }
    }

    pub fn get_bytes(&self, op: CacheOp, subject: &str) -> Result<Option<Vec<u8>>> {
        let key = self.key(op, subject);
        let value = self.store.get(&key)?;
        tracing::trace!(hit = value.is_some(), "cache {}", key);
        Ok(value)
    }

    pub fn put_bytes(&self, op: CacheOp, subject: &str, value: &[u8]) -> Result<()> {
        self.store.set(&self.key(op, subject), value)
    }

    /// Fetch and decode a JSON-encoded value.
    pub fn get<T: DeserializeOwned>(&self, op: CacheOp, subject: &str) -> Result<Option<T>> {
        match self.get_bytes(op, subject)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Encode a value as JSON and store it.
    pub fn put<T: Serialize>(&self, op: CacheOp, subject: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.put_bytes(op, subject, &bytes)
    }

    pub fn contains(&self, op: CacheOp, subject: &str) -> Result<bool> {
        self.store.has(&self.key(op, subject))
    }
}
