//! SQLite cache backend implementation.

use crate::cache::traits::{CacheKey, CacheStore};
use crate::error::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-based cache store.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open (or create) a cache database at the given path.
    ///
    /// A directory created for the database gets a `.gitignore` ignoring
    /// everything, so a cache inside a work tree stays out of `git status`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                std::fs::write(parent.join(".gitignore"), "*\n")?;
                tracing::debug!("Created cache directory {}", parent.display());
            }
        }
        let conn = Connection::open(path)?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::Poisoned)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                digest          TEXT PRIMARY KEY,
                namespace       TEXT NOT NULL,
                generation      TEXT NOT NULL,
                op              TEXT NOT NULL,
                subject         TEXT NOT NULL,
                value           BLOB NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_entries_namespace ON entries(namespace, generation);
            "#,
        )?;
        Ok(())
    }

    /// Count stored entries.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl CacheStore for SqliteCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM entries WHERE digest = ?1",
                params![key.digest().to_hex()],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &CacheKey, value: &[u8]) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO entries
            (digest, namespace, generation, op, subject, value)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                key.digest().to_hex(),
                key.namespace,
                key.generation,
                key.op.as_str(),
                key.subject,
                value,
            ],
        )?;
        Ok(())
    }

    fn has(&self, key: &CacheKey) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE digest = ?1",
            params![key.digest().to_hex()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn retain_generation(&self, namespace: &str, generation: &str) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM entries WHERE namespace = ?1 AND generation != ?2",
            params![namespace, generation],
        )?;
        Ok(removed)
    }
}
