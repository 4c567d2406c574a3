//! Subcommand implementations.

pub mod authors;
pub mod check;
pub mod files;

use anyhow::Result;
use gitauthors_core::{Settings, SqliteCache};
use gitauthors_git::{Attribution, GitRepository};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Open the repository containing `path` with its settings applied.
pub fn open(path: &Path, config: Option<&Path>, no_cache: bool) -> Result<(Attribution, Settings)> {
    let repo = GitRepository::open(path)?;
    let settings = match config {
        Some(file) => Settings::load(file)?,
        None => Settings::discover(repo.root())?,
    };

    let repo = if no_cache {
        repo
    } else {
        let db = settings.cache_path(repo.root());
        tracing::debug!("Using cache at {}", db.display());
        repo.with_cache_store(Arc::new(SqliteCache::new(&db)?))
    };

    let attribution = Attribution::new(repo, &settings)?;
    Ok((attribution, settings))
}

/// Absolute form of a command-line path.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Directory to start repository discovery from.
pub fn discovery_start(path: &Path) -> &Path {
    if path.is_file() {
        path.parent().unwrap_or(path)
    } else {
        path
    }
}
