//! Declared-author sources and their comparison with history.

use crate::attribution::Attribution;
use crate::repository::Result;
use gitauthors_core::declared::{header_authors, manifest_authors};
use gitauthors_core::{AuthorDiff, AuthorEntry, ExtractorKind};
use std::collections::BTreeSet;

/// Outcome of checking one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileVerdict {
    /// Declared authors match history.
    Clean,
    Mismatch(AuthorDiff),
    /// History never mentions the file.
    NoHistory,
    /// The file declares no author and one is required.
    NoHeader,
}

/// Something that declares authors and can be checked against history.
pub trait AuthorSource {
    /// Paths this source declares authors in.
    fn list_file_identities(&self, attribution: &Attribution) -> Result<BTreeSet<String>>;

    /// Authors history attributes to `path`.
    fn authors_for(&self, attribution: &Attribution, path: &str) -> Result<Option<Vec<AuthorEntry>>>;

    /// Authors `path` declares in the work tree. A missing file declares none.
    fn declared_authors(&self, attribution: &Attribution, path: &str) -> Result<Vec<AuthorEntry>>;

    fn check(&self, attribution: &Attribution, path: &str, require_header: bool) -> Result<FileVerdict> {
        let Some(actual) = self.authors_for(attribution, path)? else {
            return Ok(FileVerdict::NoHistory);
        };
        let declared = self.declared_authors(attribution, path)?;
        if declared.is_empty() {
            return Ok(if require_header { FileVerdict::NoHeader } else { FileVerdict::Clean });
        }

        let diff = AuthorDiff::compare(&declared, &actual);
        Ok(if diff.is_clean() { FileVerdict::Clean } else { FileVerdict::Mismatch(diff) })
    }
}

fn read_work_tree(attribution: &Attribution, path: &str) -> Result<Option<String>> {
    match std::fs::read(attribution.repository().root().join(path)) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl AuthorSource for ExtractorKind {
    fn list_file_identities(&self, attribution: &Attribution) -> Result<BTreeSet<String>> {
        match self.manifest() {
            None => attribution.list_file_identities(),
            Some(manifest) => {
                let tracked = attribution.repository().tracked_files()?;
                Ok(tracked.iter().filter(|p| p.as_str() == manifest).cloned().collect())
            }
        }
    }

    fn authors_for(&self, attribution: &Attribution, path: &str) -> Result<Option<Vec<AuthorEntry>>> {
        match self {
            ExtractorKind::Source => attribution.authors_for(path),
            _ => attribution.repository_authors(path).map(Some),
        }
    }

    fn declared_authors(&self, attribution: &Attribution, path: &str) -> Result<Vec<AuthorEntry>> {
        let Some(content) = read_work_tree(attribution, path)? else {
            tracing::warn!("{} is tracked but missing from the work tree", path);
            return Ok(Vec::new());
        };
        match self {
            ExtractorKind::Source => Ok(header_authors(&content)?),
            kind => Ok(manifest_authors(*kind, &content)?),
        }
    }
}
