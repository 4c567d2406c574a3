//! Rename and copy following across history.
//!
//! Starting from one path, the tracker walks backwards through the renames
//! and copies that produced it and collects the predecessor paths whose
//! history the file inherits. The result is a tree stored as an arena:
//! node 0 is the queried path, every node lists the indices of its
//! predecessors.

use crate::changes::ChangeSetParser;
use crate::commit::{ChangeRecord, Commit};
use crate::index::{FilePathRecord, RepositoryIndex};
use crate::repository::{GitRepository, Result};
use crate::similarity::{CloneThresholds, ScratchDir, SimilarityDetector};
use gitauthors_core::{CacheOp, ContentHash, FileIdentity};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One path in a lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryNode {
    pub identity: FileIdentity,
    pub path: String,
    /// Arena indices of the paths this one was renamed or copied from.
    pub predecessors: Vec<usize>,
}

/// Lineage tree of a file, rooted at the queried path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathHistory {
    nodes: Vec<HistoryNode>,
}

impl PathHistory {
    fn new(root: &FilePathRecord) -> Self {
        Self {
            nodes: vec![HistoryNode {
                identity: root.identity.clone(),
                path: root.path.clone(),
                predecessors: Vec::new(),
            }],
        }
    }

    fn attach(&mut self, parent: usize, identity: FileIdentity, path: String) -> usize {
        let child = self.nodes.len();
        self.nodes.push(HistoryNode {
            identity,
            path,
            predecessors: Vec::new(),
        });
        self.nodes[parent].predecessors.push(child);
        child
    }

    pub fn root(&self) -> &HistoryNode {
        &self.nodes[0]
    }

    /// Every node, in discovery order.
    pub fn nodes(&self) -> &[HistoryNode] {
        &self.nodes
    }

    /// Every path in the lineage, queried path first.
    pub fn paths(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.path.as_str()).collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.iter().any(|n| n.path == path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeamKind {
    Rename,
    Copy,
}

/// A rename or copy producing the tracked path.
#[derive(Debug, Clone)]
struct Seam {
    kind: SeamKind,
    from: String,
    to: String,
    similarity: u8,
    /// Revision holding `from` before the change.
    from_rev: String,
    /// Revision holding `to` after the change.
    to_rev: String,
}

impl Seam {
    fn new(change: &ChangeRecord, to: &str, from_rev: String, to_rev: &str) -> Option<Self> {
        let (from, similarity) = change.predecessor_of(to)?;
        Some(Self {
            kind: if change.is_copy() { SeamKind::Copy } else { SeamKind::Rename },
            from: from.to_string(),
            to: to.to_string(),
            similarity,
            from_rev,
            to_rev: to_rev.to_string(),
        })
    }
}

/// Builds [`PathHistory`] trees for paths of one repository.
pub struct HistoryTracker<'a> {
    repo: &'a GitRepository,
    index: &'a RepositoryIndex,
    detector: &'a dyn SimilarityDetector,
}

impl<'a> HistoryTracker<'a> {
    pub fn new(repo: &'a GitRepository, index: &'a RepositoryIndex, detector: &'a dyn SimilarityDetector) -> Self {
        Self { repo, index, detector }
    }

    /// Lineage of `path`, or `None` when history never mentions it.
    ///
    /// Results are cached per file identity and last touching commit.
    /// Detector inputs live in a scratch directory removed before returning.
    pub fn track(&self, path: &str) -> Result<Option<PathHistory>> {
        let Some(record) = self.index.record(path) else {
            return Ok(None);
        };

        let cache = self.repo.cache()?;
        let subject = format!(
            "{}:{}:{}",
            record.identity.to_hex(),
            record.last_commit().unwrap_or(""),
            &ContentHash::from_content(format!("{:?}", self.repo.config()).as_bytes()).to_hex()[..12]
        );
        if let Some(history) = cache.get::<PathHistory>(CacheOp::PathHistory, &subject)? {
            tracing::debug!("Path history of {} served from cache", path);
            return Ok(Some(history));
        }

        let mut scratch = ScratchDir::new();
        let mut history = PathHistory::new(record);
        let mut visited = HashSet::from([record.identity.clone()]);
        self.expand(0, &mut history, &mut visited, &mut scratch)?;

        cache.put(CacheOp::PathHistory, &subject, &history)?;
        Ok(Some(history))
    }

    fn expand(
        &self,
        node: usize,
        history: &mut PathHistory,
        visited: &mut HashSet<FileIdentity>,
        scratch: &mut ScratchDir,
    ) -> Result<()> {
        let path = history.nodes[node].path.clone();
        let Some(record) = self.index.record(&path) else {
            return Ok(());
        };

        for seam in self.seams(record)? {
            let identity = FileIdentity::from_path(&seam.from);
            if visited.contains(&identity) || self.index.record_by_identity(&identity).is_none() {
                continue;
            }
            if !self.should_follow(&seam, scratch)? {
                tracing::debug!(
                    "Not following {:?} {} -> {} ({}%)",
                    seam.kind,
                    seam.from,
                    seam.to,
                    seam.similarity
                );
                continue;
            }

            tracing::debug!("Following {:?} {} -> {}", seam.kind, seam.from, seam.to);
            visited.insert(identity.clone());
            let child = history.attach(node, identity, seam.from);
            self.expand(child, history, visited, scratch)?;
        }
        Ok(())
    }

    /// Renames and copies whose destination is the record's path.
    fn seams(&self, record: &FilePathRecord) -> Result<Vec<Seam>> {
        let commits: Vec<&Commit> = record
            .commits
            .iter()
            .filter_map(|hash| self.index.commit(hash))
            .collect();

        if !commits.is_empty() && commits.iter().all(|c| c.is_merge()) {
            return self.merge_seams(&record.path, &commits);
        }

        let mut seams = Vec::new();
        for commit in commits {
            for change in &commit.changes {
                if let Some(seam) = Seam::new(change, &record.path, format!("{}^", commit.hash), &commit.hash) {
                    seams.push(seam);
                }
            }
        }
        Ok(seams)
    }

    /// Merge commits carry no reliable rename data of their own; compare
    /// each one against its second parent instead.
    fn merge_seams(&self, path: &str, merges: &[&Commit]) -> Result<Vec<Seam>> {
        let cache = self.repo.cache()?;
        let mut seams = Vec::new();

        for merge in merges {
            let Some(second_parent) = merge.parents.get(1) else {
                continue;
            };
            let renames = match cache.get::<Vec<ChangeRecord>>(CacheOp::MergeRenames, &merge.hash)? {
                Some(renames) => renames,
                None => {
                    let output = self.repo.runner().run(&[
                        "diff",
                        "--name-status",
                        "-z",
                        "-M",
                        "--diff-filter=R",
                        second_parent.as_str(),
                        merge.hash.as_str(),
                    ])?;
                    let renames: Vec<ChangeRecord> = ChangeSetParser::parse(&output)
                        .into_iter()
                        .filter(|c| matches!(c, ChangeRecord::Rename { .. }))
                        .collect();
                    cache.put(CacheOp::MergeRenames, &merge.hash, &renames)?;
                    renames
                }
            };
            seams.extend(
                renames
                    .iter()
                    .filter_map(|change| Seam::new(change, path, second_parent.clone(), &merge.hash)),
            );
        }
        Ok(seams)
    }

    fn should_follow(&self, seam: &Seam, scratch: &mut ScratchDir) -> Result<bool> {
        let config = self.repo.config();
        match seam.kind {
            SeamKind::Rename => {
                if seam.similarity >= config.rename_follow_similarity {
                    return Ok(true);
                }
                let thresholds = CloneThresholds {
                    min_lines: config.rename_min_lines,
                    min_tokens: config.rename_min_tokens,
                };
                self.confirm(seam, thresholds, scratch)
            }
            SeamKind::Copy => {
                let thresholds = CloneThresholds {
                    min_lines: config.copy_min_lines,
                    min_tokens: config.copy_min_tokens,
                };
                self.confirm(seam, thresholds, scratch)
            }
        }
    }

    /// Compare both sides of a seam. Copies of identical length are
    /// accepted without running the detector.
    fn confirm(&self, seam: &Seam, thresholds: CloneThresholds, scratch: &mut ScratchDir) -> Result<bool> {
        let before = self.repo.file_at(&seam.from_rev, &seam.from)?;
        let after = self.repo.file_at(&seam.to_rev, &seam.to)?;

        if seam.kind == SeamKind::Copy && before.len() == after.len() {
            return Ok(true);
        }

        let left = scratch.materialize(&before)?;
        let right = scratch.materialize(&after)?;
        self.detector.find_clone(&left, &right, thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{CountingDetector, ScriptedRunner};
    use chrono::Utc;
    use std::sync::Arc;

    fn commit(hash: &str, parents: &[&str], changes: Vec<ChangeRecord>) -> Commit {
        Commit {
            hash: hash.to_string(),
            author_name: format!("author-{}", hash),
            author_email: format!("{}@x.io", hash),
            subject: String::new(),
            date: Utc::now(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            changes,
        }
    }

    fn add(path: &str) -> ChangeRecord {
        ChangeRecord::Add { path: path.to_string() }
    }

    fn rename(from: &str, to: &str, similarity: u8) -> ChangeRecord {
        ChangeRecord::Rename {
            from: from.to_string(),
            to: to.to_string(),
            similarity,
        }
    }

    fn copy(from: &str, to: &str, similarity: u8) -> ChangeRecord {
        ChangeRecord::Copy {
            from: from.to_string(),
            to: to.to_string(),
            similarity,
        }
    }

    fn repo(runner: ScriptedRunner) -> (GitRepository, Arc<ScriptedRunner>) {
        let runner = Arc::new(runner.on("rev-parse --verify HEAD", "head\n"));
        (GitRepository::with_runner("/repo", runner.clone()), runner)
    }

    #[test]
    fn test_high_similarity_rename_skips_detector() {
        let index = RepositoryIndex::from_commits(vec![
            commit("c1", &[], vec![add("a.php")]),
            commit("c2", &["c1"], vec![rename("a.php", "b.php", 90)]),
        ]);
        let (repo, runner) = repo(ScriptedRunner::new("/repo"));
        let detector = CountingDetector::new(false);

        let history = HistoryTracker::new(&repo, &index, &detector).track("b.php").unwrap().unwrap();

        assert_eq!(history.paths(), vec!["b.php", "a.php"]);
        assert_eq!(history.root().predecessors, vec![1]);
        assert_eq!(detector.calls(), 0);
        // Only HEAD was needed, for the cache binding
        assert_eq!(runner.calls(), 1);
    }

    #[test]
    fn test_low_similarity_rename_consults_detector() {
        let index = RepositoryIndex::from_commits(vec![
            commit("c1", &[], vec![add("a.php")]),
            commit("c2", &["c1"], vec![rename("a.php", "b.php", 40)]),
        ]);
        let scripted = ScriptedRunner::new("/repo")
            .on("show c2^:a.php", "old body\n")
            .on("show c2:b.php", "new body\n");

        let (rejecting_repo, _) = repo(scripted);
        let rejecting = CountingDetector::new(false);
        let history = HistoryTracker::new(&rejecting_repo, &index, &rejecting).track("b.php").unwrap().unwrap();
        assert_eq!(history.paths(), vec!["b.php"]);
        assert_eq!(rejecting.calls(), 1);
        assert_eq!(
            rejecting.thresholds(),
            vec![CloneThresholds { min_lines: 2, min_tokens: 7 }]
        );

        let scripted = ScriptedRunner::new("/repo")
            .on("show c2^:a.php", "old body\n")
            .on("show c2:b.php", "new body\n");
        let (accepting_repo, _) = repo(scripted);
        let accepting = CountingDetector::new(true);
        let history = HistoryTracker::new(&accepting_repo, &index, &accepting).track("b.php").unwrap().unwrap();
        assert_eq!(history.paths(), vec!["b.php", "a.php"]);
    }

    #[test]
    fn test_copy_with_equal_length_skips_detector() {
        let index = RepositoryIndex::from_commits(vec![
            commit("c1", &[], vec![add("lib/x.js")]),
            commit("c2", &["c1"], vec![copy("lib/x.js", "lib/y.js", 60)]),
        ]);
        let scripted = ScriptedRunner::new("/repo")
            .on("show c2^:lib/x.js", "var a = 1;\n")
            .on("show c2:lib/y.js", "var b = 2;\n");
        let (repo, _) = repo(scripted);
        let detector = CountingDetector::new(false);

        let history = HistoryTracker::new(&repo, &index, &detector).track("lib/y.js").unwrap().unwrap();
        assert_eq!(history.paths(), vec!["lib/y.js", "lib/x.js"]);
        assert_eq!(detector.calls(), 0);
    }

    #[test]
    fn test_copy_with_different_length_uses_copy_thresholds() {
        let index = RepositoryIndex::from_commits(vec![
            commit("c1", &[], vec![add("lib/x.js")]),
            commit("c2", &["c1"], vec![copy("lib/x.js", "lib/y.js", 100)]),
        ]);
        let scripted = ScriptedRunner::new("/repo")
            .on("show c2^:lib/x.js", "short\n")
            .on("show c2:lib/y.js", "much longer content\n");
        let (repo, _) = repo(scripted);
        let detector = CountingDetector::new(false);

        let history = HistoryTracker::new(&repo, &index, &detector).track("lib/y.js").unwrap().unwrap();
        assert_eq!(history.paths(), vec!["lib/y.js"]);
        assert_eq!(
            detector.thresholds(),
            vec![CloneThresholds { min_lines: 5, min_tokens: 35 }]
        );
    }

    #[test]
    fn test_transitive_lineage_and_cycle_guard() {
        let index = RepositoryIndex::from_commits(vec![
            commit("c1", &[], vec![add("a")]),
            commit("c2", &["c1"], vec![rename("a", "b", 100)]),
            commit("c3", &["c2"], vec![rename("b", "c", 80)]),
            // c renamed back to a, then a to c again
            commit("c4", &["c3"], vec![rename("c", "a", 100)]),
            commit("c5", &["c4"], vec![rename("a", "c", 100)]),
        ]);
        let (repo, _) = repo(ScriptedRunner::new("/repo"));
        let detector = CountingDetector::new(false);

        let history = HistoryTracker::new(&repo, &index, &detector).track("c").unwrap().unwrap();
        assert_eq!(history.paths(), vec!["c", "b", "a"]);
        assert_eq!(history.nodes()[1].predecessors, vec![2]);
        assert_eq!(history.nodes()[2].predecessors, Vec::<usize>::new());
    }

    #[test]
    fn test_merge_only_path_uses_second_parent_renames() {
        let index = RepositoryIndex::from_commits(vec![
            commit("c1", &[], vec![add("old.php")]),
            commit("c2", &["c1"], vec![add("other.php")]),
            commit("m1", &["c2", "c1"], vec![add("new.php")]),
        ]);
        let scripted = ScriptedRunner::new("/repo").on(
            "diff --name-status -z -M --diff-filter=R c1 m1",
            "R088\0old.php\0new.php\0",
        );
        let (repo, runner) = repo(scripted);
        let detector = CountingDetector::new(false);

        let history = HistoryTracker::new(&repo, &index, &detector).track("new.php").unwrap().unwrap();
        assert_eq!(history.paths(), vec!["new.php", "old.php"]);
        assert_eq!(detector.calls(), 0);
        assert_eq!(runner.calls(), 2);
    }

    #[test]
    fn test_results_are_cached_and_idempotent() {
        let index = RepositoryIndex::from_commits(vec![
            commit("c1", &[], vec![add("a.php")]),
            commit("c2", &["c1"], vec![rename("a.php", "b.php", 40)]),
        ]);
        let scripted = ScriptedRunner::new("/repo")
            .on("show c2^:a.php", "x\n")
            .on("show c2:b.php", "y\n");
        let (repo, runner) = repo(scripted);
        let detector = CountingDetector::new(true);
        let tracker = HistoryTracker::new(&repo, &index, &detector);

        let first = tracker.track("b.php").unwrap();
        let calls = runner.calls();
        let second = tracker.track("b.php").unwrap();

        assert_eq!(first, second);
        assert_eq!(runner.calls(), calls);
        assert_eq!(detector.calls(), 1);
        assert!(tracker.track("never.php").unwrap().is_none());
    }

    #[test]
    fn test_blob_failure_propagates() {
        let index = RepositoryIndex::from_commits(vec![
            commit("c1", &[], vec![add("a.php")]),
            commit("c2", &["c1"], vec![rename("a.php", "b.php", 10)]),
        ]);
        let (repo, _) = repo(ScriptedRunner::new("/repo"));
        let detector = CountingDetector::new(true);

        let result = HistoryTracker::new(&repo, &index, &detector).track("b.php");
        assert!(matches!(result, Err(crate::GitError::CommandFailed(_))));
    }
}
