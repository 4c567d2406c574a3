//! Cache key and store trait definitions.

use crate::{ContentHash, Result};
use std::fmt;

/// The operation a cache entry memoizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOp {
    /// Parsed bulk `git log` output.
    CommitLog,
    /// Change records of a single commit.
    CommitChanges,
    /// A complete repository index snapshot.
    RepositoryIndex,
    /// Path history tree of one file identity.
    PathHistory,
    /// File content at a revision.
    BlobContent,
    /// Pure renames between a merge commit and its second parent.
    MergeRenames,
}

impl CacheOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOp::CommitLog => "commit_log",
            CacheOp::CommitChanges => "commit_changes",
            CacheOp::RepositoryIndex => "repository_index",
            CacheOp::PathHistory => "path_history",
            CacheOp::BlobContent => "blob_content",
            CacheOp::MergeRenames => "merge_renames",
        }
    }
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured cache key.
///
/// `namespace` separates repositories sharing one store, `generation` is the
/// HEAD commit the entry was computed against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: String,
    pub generation: String,
    pub op: CacheOp,
    pub subject: String,
}

impl CacheKey {
    /// Stable digest the entry is stored under.
    pub fn digest(&self) -> ContentHash {
        ContentHash::from_parts([
            self.namespace.as_str(),
            self.generation.as_str(),
            self.op.as_str(),
            self.subject.as_str(),
        ])
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.op, &self.generation[..self.generation.len().min(7)], self.subject)
    }
}

/// Opaque key-value persistence supplied by the host process.
pub trait CacheStore: Send + Sync {
    /// Fetch a value.
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;

    /// Store a value, replacing any previous one.
    fn set(&self, key: &CacheKey, value: &[u8]) -> Result<()>;

    /// Check if a value exists.
    fn has(&self, key: &CacheKey) -> Result<bool>;

    /// Drop every entry of `namespace` not computed against `generation`.
    /// Returns the number of entries removed.
    fn retain_generation(&self, namespace: &str, generation: &str) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(op: CacheOp, subject: &str) -> CacheKey {
        CacheKey {
            namespace: "/repo".to_string(),
            generation: "0123456789abcdef".to_string(),
            op,
            subject: subject.to_string(),
        }
    }

    #[test]
    fn test_digest_depends_on_every_field() {
        let base = key(CacheOp::CommitChanges, "abc");
        assert_eq!(base.digest(), key(CacheOp::CommitChanges, "abc").digest());
        assert_ne!(base.digest(), key(CacheOp::BlobContent, "abc").digest());
        assert_ne!(base.digest(), key(CacheOp::CommitChanges, "abd").digest());

        let mut other_head = base.clone();
        other_head.generation = "fedcba".to_string();
        assert_ne!(base.digest(), other_head.digest());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            key(CacheOp::PathHistory, "x").to_string(),
            "path_history@0123456:x"
        );
    }
}
