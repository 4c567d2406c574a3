//! gitauthors Git Engine
//!
//! Reconstructs file lineage from git history, following renames and
//! copies, and attributes authors to it.

pub mod attribution;
pub mod authors;
pub mod changes;
pub mod commit;
pub mod extractor;
pub mod index;
pub mod log;
pub mod repository;
pub mod runner;
pub mod similarity;
pub mod tracker;

#[cfg(test)]
mod testutils;

pub use attribution::Attribution;
pub use authors::AuthorAggregator;
pub use changes::ChangeSetParser;
pub use commit::{ChangeRecord, Commit};
pub use extractor::{AuthorSource, FileVerdict};
pub use index::{FilePathRecord, RepositoryIndex};
pub use log::CommitLog;
pub use repository::{GitError, GitRepository, Result, WorkingTreeStatus};
pub use runner::{CommandFailure, CommandRunner, GitCommand};
pub use similarity::{CloneThresholds, ScratchDir, SimilarityDetector, TokenCloneDetector};
pub use tracker::{HistoryNode, HistoryTracker, PathHistory};
