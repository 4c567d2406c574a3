//! gitauthors Core Library
//!
//! Shared types, the history cache and configuration for the gitauthors
//! authorship checker.

pub mod author;
pub mod cache;
pub mod config;
pub mod content_hash;
pub mod declared;
pub mod error;

pub use author::{AuthorDiff, AuthorEntry, AuthorList};
pub use cache::{Cache, CacheOp, CacheStore, MemoryCache, SqliteCache};
pub use config::{ExtractorKind, PathFilter, Settings, TrackerConfig};
pub use content_hash::{ContentHash, FileIdentity};
pub use error::{Error, Result};
