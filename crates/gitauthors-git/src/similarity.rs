//! Content-similarity detection used to confirm low-confidence renames and copies.

use crate::repository::{GitError, Result};
use gitauthors_core::ContentHash;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Minimum size of a duplicated region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloneThresholds {
    /// Lines the region must span in both files.
    pub min_lines: usize,
    /// Consecutive equal tokens the region must contain.
    pub min_tokens: usize,
}

/// Near-duplicate code detector over two files.
pub trait SimilarityDetector: Send + Sync {
    /// Whether `left` and `right` share a region meeting `thresholds`.
    fn find_clone(&self, left: &Path, right: &Path, thresholds: CloneThresholds) -> Result<bool>;
}

#[derive(Debug, PartialEq, Eq)]
struct Token<'a> {
    text: &'a str,
    line: usize,
}

/// Token-window clone detector.
///
/// Tokens are runs of identifier characters or single punctuation
/// characters; whitespace is dropped, so reformatting does not hide a clone.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenCloneDetector;

impl TokenCloneDetector {
    pub fn new() -> Self {
        Self
    }

    fn tokenize(source: &str) -> Vec<Token<'_>> {
        let mut tokens = Vec::new();
        let mut line = 1;
        let mut start: Option<usize> = None;

        for (i, c) in source.char_indices() {
            let is_word = c.is_alphanumeric() || c == '_' || c == '$';
            if is_word {
                start.get_or_insert(i);
                continue;
            }
            if let Some(s) = start.take() {
                tokens.push(Token { text: &source[s..i], line });
            }
            if c == '\n' {
                line += 1;
            } else if !c.is_whitespace() {
                tokens.push(Token {
                    text: &source[i..i + c.len_utf8()],
                    line,
                });
            }
        }
        if let Some(s) = start {
            tokens.push(Token { text: &source[s..], line });
        }
        tokens
    }

    fn window_hash(tokens: &[Token<'_>]) -> u64 {
        let mut hasher = DefaultHasher::new();
        for token in tokens {
            token.text.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Core comparison over in-memory sources.
    pub fn compare(&self, left: &str, right: &str, thresholds: CloneThresholds) -> bool {
        let window = thresholds.min_tokens.max(1);
        let left = Self::tokenize(left);
        let right = Self::tokenize(right);
        if left.len() < window || right.len() < window {
            return false;
        }

        let mut starts: HashMap<u64, Vec<usize>> = HashMap::new();
        for i in 0..=left.len() - window {
            starts
                .entry(Self::window_hash(&left[i..i + window]))
                .or_default()
                .push(i);
        }

        for j in 0..=right.len() - window {
            let Some(candidates) = starts.get(&Self::window_hash(&right[j..j + window])) else {
                continue;
            };
            for &i in candidates {
                // Only extend maximal matches; a start inside one was covered
                if i > 0 && j > 0 && left[i - 1].text == right[j - 1].text {
                    continue;
                }
                let mut len = 0;
                while i + len < left.len()
                    && j + len < right.len()
                    && left[i + len].text == right[j + len].text
                {
                    len += 1;
                }
                if len < window {
                    continue;
                }
                let left_lines = left[i + len - 1].line - left[i].line + 1;
                let right_lines = right[j + len - 1].line - right[j].line + 1;
                if left_lines.min(right_lines) >= thresholds.min_lines {
                    return true;
                }
            }
        }
        false
    }
}

impl SimilarityDetector for TokenCloneDetector {
    fn find_clone(&self, left: &Path, right: &Path, thresholds: CloneThresholds) -> Result<bool> {
        let left = std::fs::read(left)?;
        let right = std::fs::read(right)?;
        Ok(self.compare(
            &String::from_utf8_lossy(&left),
            &String::from_utf8_lossy(&right),
            thresholds,
        ))
    }
}

/// Temporary directory holding detector inputs for one traversal.
///
/// Created on first use; files are named by content hash so the same blob
/// is written once. Everything is removed when the value is dropped.
#[derive(Default)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    files: HashMap<ContentHash, PathBuf>,
}

impl ScratchDir {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `content` to a scratch file and return its path.
    pub fn materialize(&mut self, content: &[u8]) -> Result<PathBuf> {
        let hash = ContentHash::from_content(content);
        if let Some(path) = self.files.get(&hash) {
            return Ok(path.clone());
        }

        let dir = match self.dir.take() {
            Some(dir) => dir,
            None => tempfile::Builder::new()
                .prefix("gitauthors-")
                .tempdir()
                .map_err(GitError::ScratchDir)?,
        };
        let path = dir.path().join(hash.to_hex());
        self.dir = Some(dir);
        std::fs::write(&path, content)?;
        self.files.insert(hash, path.clone());
        Ok(path)
    }

    /// Location of the directory, if it has been created.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(|d| d.path())
    }
}
