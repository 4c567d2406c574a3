//! Commit and change record structures.

use chrono::{DateTime, Utc};
use gitauthors_core::AuthorEntry;
use serde::{Deserialize, Serialize};

/// Information about a git commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit hash (40 hex characters).
    pub hash: String,
    /// Author name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
    /// Commit message summary (first line).
    pub subject: String,
    /// Author date.
    pub date: DateTime<Utc>,
    /// Parent hashes, first parent first.
    pub parents: Vec<String>,
    /// Paths this commit changed; filled in when the repository is indexed.
    #[serde(default)]
    pub changes: Vec<ChangeRecord>,
}

impl Commit {
    /// Merge commits have more than one parent and are never attributed.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Short commit hash (7 characters).
    pub fn short_hash(&self) -> &str {
        &self.hash[..7.min(self.hash.len())]
    }

    pub fn author(&self) -> AuthorEntry {
        AuthorEntry::new(&self.author_name, &self.author_email)
    }
}

/// How a commit touched a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChangeRecord {
    Add { path: String },
    Modify { path: String },
    Delete { path: String },
    /// `similarity` is git's 0-100 rename score.
    Rename { from: String, to: String, similarity: u8 },
    /// `similarity` is git's 0-100 copy score.
    Copy { from: String, to: String, similarity: u8 },
}

impl ChangeRecord {
    /// Every path the record mentions; both sides for renames and copies.
    pub fn paths(&self) -> Vec<&str> {
        match self {
            ChangeRecord::Add { path } | ChangeRecord::Modify { path } | ChangeRecord::Delete { path } => {
                vec![path.as_str()]
            }
            ChangeRecord::Rename { from, to, .. } | ChangeRecord::Copy { from, to, .. } => {
                vec![from.as_str(), to.as_str()]
            }
        }
    }

    /// The rename or copy whose destination is `path`, as `(from, similarity)`.
    pub fn predecessor_of(&self, path: &str) -> Option<(&str, u8)> {
        match self {
            ChangeRecord::Rename { from, to, similarity } | ChangeRecord::Copy { from, to, similarity }
                if to == path && from != path =>
            {
                Some((from.as_str(), *similarity))
            }
            _ => None,
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, ChangeRecord::Copy { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(parents: &[&str]) -> Commit {
        Commit {
            hash: "0123456789abcdef0123456789abcdef01234567".to_string(),
            author_name: "Dana K".to_string(),
            author_email: "dana@x.io".to_string(),
            subject: "Initial".to_string(),
            date: Utc::now(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            changes: Vec::new(),
        }
    }

    #[test]
    fn test_merge_detection() {
        assert!(!commit(&[]).is_merge());
        assert!(!commit(&["a"]).is_merge());
        assert!(commit(&["a", "b"]).is_merge());
    }

    #[test]
    fn test_author_and_short_hash() {
        let c = commit(&[]);
        assert_eq!(c.short_hash(), "0123456");
        assert_eq!(c.author().to_string(), "Dana K <dana@x.io>");
    }

    #[test]
    fn test_predecessor_of() {
        let rename = ChangeRecord::Rename {
            from: "old.php".to_string(),
            to: "new.php".to_string(),
            similarity: 90,
        };
        assert_eq!(rename.predecessor_of("new.php"), Some(("old.php", 90)));
        assert_eq!(rename.predecessor_of("old.php"), None);
        assert_eq!(rename.paths(), vec!["old.php", "new.php"]);

        let modify = ChangeRecord::Modify { path: "new.php".to_string() };
        assert_eq!(modify.predecessor_of("new.php"), None);
        assert!(!modify.is_copy());
    }
}
