//! Author attribution over a file's lineage.

use crate::index::RepositoryIndex;
use crate::repository::{GitRepository, Result};
use crate::tracker::PathHistory;
use gitauthors_core::{AuthorEntry, AuthorList};

/// Turns commit sets into deduplicated author lists.
pub struct AuthorAggregator<'a> {
    repo: &'a GitRepository,
    index: &'a RepositoryIndex,
}

impl<'a> AuthorAggregator<'a> {
    pub fn new(repo: &'a GitRepository, index: &'a RepositoryIndex) -> Self {
        Self { repo, index }
    }

    /// Authors of every non-merge commit in the lineage, sorted, followed
    /// by the local user when the file has uncommitted changes.
    pub fn authors_for(&self, history: &PathHistory) -> Result<Vec<AuthorEntry>> {
        let mut authors = AuthorList::new();
        for node in history.nodes() {
            let Some(record) = self.index.record_by_identity(&node.identity) else {
                continue;
            };
            for commit in record.commits.iter().filter_map(|h| self.index.commit(h)) {
                if !commit.is_merge() {
                    authors.push(commit.author());
                }
            }
        }
        authors.sort();

        self.append_local_editor(&mut authors, &history.root().path)?;
        Ok(authors.into_vec())
    }

    /// Authors of every non-merge commit in the repository, with the local
    /// editor rule applied to `touched`.
    pub fn repository_authors(&self, touched: &str) -> Result<Vec<AuthorEntry>> {
        let mut authors: AuthorList = self
            .index
            .commits()
            .iter()
            .filter(|c| !c.is_merge())
            .map(|c| c.author())
            .collect();
        authors.sort();

        self.append_local_editor(&mut authors, touched)?;
        Ok(authors.into_vec())
    }

    /// Someone editing a tracked file right now is one of its authors.
    fn append_local_editor(&self, authors: &mut AuthorList, path: &str) -> Result<()> {
        if !self.repo.root().join(path).is_file() {
            return Ok(());
        }
        if !self.repo.status()?.is_modified(path) {
            return Ok(());
        }
        if let Some(me) = self.repo.local_identity()?.as_ref() {
            tracing::debug!("{} has local changes, adding {}", path, me);
            authors.push_last(me.clone());
        }
        Ok(())
    }
}
