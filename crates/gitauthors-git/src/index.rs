//! File identity index over the whole commit history.

use crate::changes::ChangeSetParser;
use crate::commit::{ChangeRecord, Commit};
use crate::log::CommitLog;
use crate::repository::{GitRepository, Result};
use gitauthors_core::{CacheOp, FileIdentity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Commits that touched one literal path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePathRecord {
    pub identity: FileIdentity,
    pub path: String,
    /// Hashes of commits whose change records mention `path`, oldest first.
    pub commits: Vec<String>,
}

impl FilePathRecord {
    fn new(path: &str) -> Self {
        Self {
            identity: FileIdentity::from_path(path),
            path: path.to_string(),
            commits: Vec::new(),
        }
    }

    /// Most recent commit touching this path.
    pub fn last_commit(&self) -> Option<&str> {
        self.commits.last().map(String::as_str)
    }
}

/// Maps every path ever changed to the commits that changed it.
///
/// A rename or copy is recorded under both its source and destination so
/// the seam can be found from either side.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RepositoryIndex {
    commits: Vec<Commit>,
    records: Vec<FilePathRecord>,
    #[serde(skip)]
    commit_lookup: HashMap<String, usize>,
    #[serde(skip)]
    record_lookup: HashMap<FileIdentity, usize>,
}

impl RepositoryIndex {
    /// Build the index for the repository's current HEAD.
    ///
    /// A complete snapshot cached for this HEAD is reused as is. Otherwise
    /// each commit's change set is taken from the cache when present and
    /// diffed (then cached) when not, so an interrupted build resumes.
    pub fn build(repo: &GitRepository) -> Result<Self> {
        let cache = repo.cache()?;
        let mode = if repo.config().detect_copies { "copies-harder" } else { "renames" };

        if let Some(mut index) = cache.get::<RepositoryIndex>(CacheOp::RepositoryIndex, mode)? {
            index.reindex();
            tracing::info!(
                "Loaded repository index from cache: {} commits, {} paths",
                index.commits.len(),
                index.records.len()
            );
            return Ok(index);
        }

        let mut commits = CommitLog::new(repo).fetch_all()?;
        commits.reverse();

        let mut diffed = 0;
        for commit in &mut commits {
            let subject = format!("{}:{}", commit.hash, mode);
            commit.changes = match cache.get::<Vec<ChangeRecord>>(CacheOp::CommitChanges, &subject)? {
                Some(changes) => changes,
                None => {
                    let changes = Self::diff_commit(repo, &commit.hash)?;
                    cache.put(CacheOp::CommitChanges, &subject, &changes)?;
                    diffed += 1;
                    changes
                }
            };
        }

        let index = Self::from_commits(commits);
        cache.put(CacheOp::RepositoryIndex, mode, &index)?;
        tracing::info!(
            "Indexed {} commits ({} diffed), {} paths",
            index.commits.len(),
            diffed,
            index.records.len()
        );
        Ok(index)
    }

    /// Name-status of one commit against its first parent.
    ///
    /// Copy detection considers every file of the parent tree as a source,
    /// not only the ones the commit modified.
    fn diff_commit(repo: &GitRepository, hash: &str) -> Result<Vec<ChangeRecord>> {
        let mut args = vec!["show", "--format=", "--name-status", "-z", "-M"];
        if repo.config().detect_copies {
            args.extend(["-C", "--find-copies-harder"]);
        }
        args.extend(["-m", "--first-parent", hash]);

        let output = repo.runner().run(&args)?;
        Ok(ChangeSetParser::parse(&output))
    }

    /// Index commits given oldest first, with their changes filled in.
    pub fn from_commits(commits: Vec<Commit>) -> Self {
        let mut index = Self::default();
        for commit in commits {
            index.insert(commit);
        }
        index
    }

    fn insert(&mut self, commit: Commit) {
        for change in &commit.changes {
            for path in change.paths() {
                let position = match self.record_lookup.get(&FileIdentity::from_path(path)) {
                    Some(&i) => i,
                    None => {
                        let record = FilePathRecord::new(path);
                        self.record_lookup.insert(record.identity.clone(), self.records.len());
                        self.records.push(record);
                        self.records.len() - 1
                    }
                };
                let record = &mut self.records[position];
                if record.last_commit() != Some(commit.hash.as_str()) {
                    record.commits.push(commit.hash.clone());
                }
            }
        }
        self.commit_lookup.insert(commit.hash.clone(), self.commits.len());
        self.commits.push(commit);
    }

    /// Rebuild lookup tables after deserialization.
    fn reindex(&mut self) {
        self.commit_lookup = self
            .commits
            .iter()
            .enumerate()
            .map(|(i, c)| (c.hash.clone(), i))
            .collect();
        self.record_lookup = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.identity.clone(), i))
            .collect();
    }

    pub fn commit(&self, hash: &str) -> Option<&Commit> {
        self.commit_lookup.get(hash).map(|&i| &self.commits[i])
    }

    /// Record of a repository-relative path.
    pub fn record(&self, path: &str) -> Option<&FilePathRecord> {
        self.record_by_identity(&FileIdentity::from_path(path))
    }

    pub fn record_by_identity(&self, identity: &FileIdentity) -> Option<&FilePathRecord> {
        self.record_lookup.get(identity).map(|&i| &self.records[i])
    }

    /// All commits, oldest first.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn records(&self) -> &[FilePathRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::ScriptedRunner;
    use gitauthors_core::MemoryCache;
    use std::sync::Arc;

    const LOG: &str = "log --simplify-merges --format=%H%x1f%an%x1f%ae%x1f%s%x1f%aI%x1f%P HEAD";

    fn log_args() -> String {
        format!("-c log.showSignature=false {}", LOG)
    }

    fn show_args(hash: &str) -> String {
        format!("show --format= --name-status -z -M -C --find-copies-harder -m --first-parent {}", hash)
    }

    fn scripted() -> ScriptedRunner {
        ScriptedRunner::new("/repo")
            .on("rev-parse --verify HEAD", "c2\n")
            .on(
                &log_args(),
                concat!(
                    "c2\u{1f}Lee\u{1f}lee@x.io\u{1f}Move\u{1f}2024-01-02T00:00:00Z\u{1f}c1\n",
                    "c1\u{1f}Dana\u{1f}dana@x.io\u{1f}Add\u{1f}2024-01-01T00:00:00Z\u{1f}\n",
                ),
            )
            .on(&show_args("c1"), "A\0src/old.php\0A\0README.md\0")
            .on(&show_args("c2"), "R095\0src/old.php\0src/new.php\0M\0README.md\0")
    }

    #[test]
    fn test_build_records_both_sides_of_rename() {
        let repo = GitRepository::with_runner("/repo", Arc::new(scripted()));
        let index = RepositoryIndex::build(&repo).unwrap();

        assert_eq!(index.commits().len(), 2);
        assert_eq!(index.commits()[0].hash, "c1");
        assert_eq!(index.record("src/old.php").unwrap().commits, vec!["c1", "c2"]);
        assert_eq!(index.record("src/new.php").unwrap().commits, vec!["c2"]);
        assert_eq!(index.record("README.md").unwrap().last_commit(), Some("c2"));
        assert!(index.record("missing.php").is_none());
        assert_eq!(index.commit("c2").unwrap().changes.len(), 2);
    }

    #[test]
    fn test_cached_snapshot_short_circuits() {
        let store = Arc::new(MemoryCache::new());
        let first = GitRepository::with_runner("/repo", Arc::new(scripted())).with_cache_store(store.clone());
        RepositoryIndex::build(&first).unwrap();

        let runner = Arc::new(scripted());
        let second = GitRepository::with_runner("/repo", runner.clone()).with_cache_store(store);
        let index = RepositoryIndex::build(&second).unwrap();

        // Only HEAD is resolved; the snapshot covers everything else
        assert_eq!(runner.history(), vec!["rev-parse --verify HEAD"]);
        assert_eq!(index.record("src/new.php").unwrap().commits, vec!["c2"]);
        assert_eq!(index.commit("c1").unwrap().author_name, "Dana");
    }

    #[test]
    fn test_partial_build_resumes_from_cached_diffs() {
        let store = Arc::new(MemoryCache::new());

        // First run dies while diffing c2
        let broken = ScriptedRunner::new("/repo")
            .on("rev-parse --verify HEAD", "c2\n")
            .on(
                &log_args(),
                concat!(
                    "c2\u{1f}Lee\u{1f}lee@x.io\u{1f}Move\u{1f}2024-01-02T00:00:00Z\u{1f}c1\n",
                    "c1\u{1f}Dana\u{1f}dana@x.io\u{1f}Add\u{1f}2024-01-01T00:00:00Z\u{1f}\n",
                ),
            )
            .on(&show_args("c1"), "A\0src/old.php\0");
        let repo = GitRepository::with_runner("/repo", Arc::new(broken)).with_cache_store(store.clone());
        assert!(RepositoryIndex::build(&repo).is_err());

        let runner = Arc::new(scripted());
        let repo = GitRepository::with_runner("/repo", runner.clone()).with_cache_store(store);
        RepositoryIndex::build(&repo).unwrap();

        let history = runner.history();
        assert!(history.contains(&show_args("c2")));
        assert!(!history.contains(&show_args("c1")));
        assert!(!history.contains(&log_args()));
    }

    #[test]
    fn test_special_characters_in_paths_are_kept() {
        let runner = ScriptedRunner::new("/repo")
            .on("rev-parse --verify HEAD", "c1\n")
            .on(&log_args(), "c1\u{1f}Dana\u{1f}dana@x.io\u{1f}Add\u{1f}2024-01-01T00:00:00Z\u{1f}\n")
            .on(&show_args("c1"), "A\0say \"hi\".txt\0A\0tab\there.txt\0");
        let repo = GitRepository::with_runner("/repo", Arc::new(runner));
        let index = RepositoryIndex::build(&repo).unwrap();

        assert_eq!(index.record("say \"hi\".txt").unwrap().commits, vec!["c1"]);
        assert_eq!(index.record("tab\there.txt").unwrap().commits, vec!["c1"]);
        assert!(index.record("\"say \\\"hi\\\".txt\"").is_none());
    }

    #[test]
    fn test_snapshot_serialization_rebuilds_lookups() {
        let repo = GitRepository::with_runner("/repo", Arc::new(scripted()));
        let index = RepositoryIndex::build(&repo).unwrap();

        let json = serde_json::to_vec(&index).unwrap();
        let mut restored: RepositoryIndex = serde_json::from_slice(&json).unwrap();
        assert!(restored.record("src/old.php").is_none());
        restored.reindex();
        assert_eq!(restored.record("src/old.php"), index.record("src/old.php"));
        assert_eq!(restored.commit("c2"), index.commit("c2"));
    }
}
