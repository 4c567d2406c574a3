//! The two queries collaborators make against a repository.

use crate::authors::AuthorAggregator;
use crate::repository::{GitRepository, Result};
use crate::similarity::{SimilarityDetector, TokenCloneDetector};
use crate::tracker::{HistoryTracker, PathHistory};
use gitauthors_core::{AuthorEntry, PathFilter, Settings};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Author attribution for one repository.
pub struct Attribution {
    repo: GitRepository,
    filter: PathFilter,
    detector: Arc<dyn SimilarityDetector>,
}

impl Attribution {
    /// Apply `settings` to `repo`: path patterns and tracker thresholds.
    pub fn new(repo: GitRepository, settings: &Settings) -> Result<Self> {
        Ok(Self {
            repo: repo.with_tracker_config(settings.tracker.clone()),
            filter: settings.path_filter()?,
            detector: Arc::new(TokenCloneDetector::new()),
        })
    }

    pub fn with_detector(mut self, detector: Arc<dyn SimilarityDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn repository(&self) -> &GitRepository {
        &self.repo
    }

    /// Tracked paths in the current tree accepted by the include/exclude rules.
    pub fn list_file_identities(&self) -> Result<BTreeSet<String>> {
        let tracked = self.repo.tracked_files()?;
        Ok(tracked
            .iter()
            .filter(|path| self.filter.matches(path))
            .cloned()
            .collect())
    }

    /// Lineage of `path`, or `None` when it has no history in this repository.
    pub fn path_history(&self, path: impl AsRef<Path>) -> Result<Option<PathHistory>> {
        let Some(relative) = self.repo.relative_path(path) else {
            return Ok(None);
        };
        let index = self.repo.index()?;
        HistoryTracker::new(&self.repo, &index, self.detector.as_ref()).track(&relative)
    }

    /// Authors of `path` across renames and copies.
    ///
    /// `None` means the path has no retrievable history; an empty list
    /// means it has history but only merge commits touched it.
    pub fn authors_for(&self, path: impl AsRef<Path>) -> Result<Option<Vec<AuthorEntry>>> {
        let Some(history) = self.path_history(path)? else {
            return Ok(None);
        };
        let index = self.repo.index()?;
        AuthorAggregator::new(&self.repo, &index)
            .authors_for(&history)
            .map(Some)
    }

    /// Every non-merge author in the repository, for files describing the
    /// whole project. `touched` is checked for local modifications.
    pub fn repository_authors(&self, touched: &str) -> Result<Vec<AuthorEntry>> {
        let index = self.repo.index()?;
        AuthorAggregator::new(&self.repo, &index).repository_authors(touched)
    }
}
