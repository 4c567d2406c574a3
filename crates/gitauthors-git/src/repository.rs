//! Git repository handle.

use crate::index::RepositoryIndex;
use crate::runner::{CommandFailure, CommandRunner, GitCommand};
use gitauthors_core::{AuthorEntry, Cache, CacheOp, CacheStore, MemoryCache, TrackerConfig};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Repository not found at {0}")]
    NotFound(PathBuf),

    #[error(transparent)]
    CommandFailed(#[from] CommandFailure),

    #[error("Unexpected git output: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot create scratch directory: {0}")]
    ScratchDir(std::io::Error),

    #[error(transparent)]
    Core(#[from] gitauthors_core::Error),

    #[error("Repository state lock poisoned")]
    Poisoned,
}

/// Result type for git operations.
pub type Result<T> = std::result::Result<T, GitError>;

/// Lazily computed, process-lifetime value.
///
/// The lock is held while computing, so concurrent callers wait for the
/// first one instead of repeating the work.
struct Memo<T>(Mutex<Option<Arc<T>>>);

impl<T> Memo<T> {
    fn new() -> Self {
        Self(Mutex::new(None))
    }

    fn get_or_try_init(&self, init: impl FnOnce() -> Result<T>) -> Result<Arc<T>> {
        let mut slot = self.0.lock().map_err(|_| GitError::Poisoned)?;
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(init()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }
}

/// Tracked paths with uncommitted changes in the work tree or index.
#[derive(Debug, Default)]
pub struct WorkingTreeStatus {
    modified: HashSet<String>,
}

impl WorkingTreeStatus {
    /// Parse `status --porcelain -z` output.
    pub fn parse(output: &[u8]) -> Self {
        let text = String::from_utf8_lossy(output);
        let mut entries = text.split('\0');
        let mut modified = HashSet::new();

        while let Some(entry) = entries.next() {
            if entry.len() < 4 {
                continue;
            }
            let (xy, path) = entry.split_at(3);
            let xy = xy.trim_end();
            if xy == "??" || xy == "!!" {
                continue;
            }
            modified.insert(path.to_string());
            // Renames and copies are followed by their source path
            if xy.starts_with('R') || xy.starts_with('C') {
                entries.next();
            }
        }
        Self { modified }
    }

    pub fn is_modified(&self, path: &str) -> bool {
        self.modified.contains(path)
    }
}

/// A repository work tree queried through a [`CommandRunner`].
pub struct GitRepository {
    root: PathBuf,
    runner: Arc<dyn CommandRunner>,
    store: Arc<dyn CacheStore>,
    config: TrackerConfig,
    head: Memo<String>,
    cache: Memo<Cache>,
    index: Memo<RepositoryIndex>,
    tracked: Memo<Vec<String>>,
    status: Memo<WorkingTreeStatus>,
    identity: Memo<Option<AuthorEntry>>,
}

impl GitRepository {
    /// Open the repository containing `path`, walking up parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = Self::discover(path)?;
        let runner = Arc::new(GitCommand::new(&root));
        Ok(Self::with_runner(root, runner))
    }

    /// Find the work tree root of the repository containing `path`.
    pub fn discover(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let repo = git2::Repository::discover(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                GitError::NotFound(path.to_path_buf())
            } else {
                GitError::Git(e)
            }
        })?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::NotFound(path.to_path_buf()))?;
        Ok(workdir.components().collect())
    }

    /// Use an explicit runner rooted at `root`, without discovery.
    pub fn with_runner(root: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            root: root.into(),
            runner,
            store: Arc::new(MemoryCache::new()),
            config: TrackerConfig::default(),
            head: Memo::new(),
            cache: Memo::new(),
            index: Memo::new(),
            tracked: Memo::new(),
            status: Memo::new(),
            identity: Memo::new(),
        }
    }

    /// Persist history queries in `store` instead of process memory.
    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = store;
        self
    }

    /// Rename/copy following thresholds.
    pub fn with_tracker_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Get the repository root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Hash of the HEAD commit.
    pub fn head(&self) -> Result<Arc<String>> {
        self.head.get_or_try_init(|| {
            let out = self.runner.run(&["rev-parse", "--verify", "HEAD"])?;
            let head = out.trim().to_string();
            if head.is_empty() {
                return Err(GitError::Parse("empty HEAD hash".to_string()));
            }
            Ok(head)
        })
    }

    /// Cache bound to this repository's current HEAD.
    pub fn cache(&self) -> Result<Arc<Cache>> {
        self.cache.get_or_try_init(|| {
            let head = self.head()?;
            let namespace = self.root.to_string_lossy().into_owned();
            Ok(Cache::bind(Arc::clone(&self.store), namespace, head.as_str())?)
        })
    }

    /// File-identity index over the whole history, built once.
    pub fn index(&self) -> Result<Arc<RepositoryIndex>> {
        self.index.get_or_try_init(|| RepositoryIndex::build(self))
    }

    /// Paths tracked in the current tree.
    pub fn tracked_files(&self) -> Result<Arc<Vec<String>>> {
        self.tracked.get_or_try_init(|| {
            let out = self.runner.run_raw(&["ls-files", "-z"])?;
            Ok(String::from_utf8_lossy(&out)
                .split('\0')
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect())
        })
    }

    /// Uncommitted changes to tracked files.
    pub fn status(&self) -> Result<Arc<WorkingTreeStatus>> {
        self.status.get_or_try_init(|| {
            let out = self
                .runner
                .run_raw(&["status", "--porcelain", "-z", "--untracked-files=no"])?;
            Ok(WorkingTreeStatus::parse(&out))
        })
    }

    /// Locally configured `user.name`/`user.email`, if any.
    pub fn local_identity(&self) -> Result<Arc<Option<AuthorEntry>>> {
        self.identity.get_or_try_init(|| {
            let name = self.runner.run(&["config", "--default", "", "--get", "user.name"])?;
            let email = self.runner.run(&["config", "--default", "", "--get", "user.email"])?;
            let name = name.trim();
            if name.is_empty() {
                tracing::debug!("No local user.name configured");
                return Ok(None);
            }
            Ok(Some(AuthorEntry::new(name, email.trim())))
        })
    }

    /// Content of `path` at `rev`, cached per `(rev, path)`.
    pub fn file_at(&self, rev: &str, path: &str) -> Result<Vec<u8>> {
        let cache = self.cache()?;
        let subject = format!("{}:{}", rev, path);
        if let Some(content) = cache.get_bytes(CacheOp::BlobContent, &subject)? {
            return Ok(content);
        }
        let content = self.runner.run_raw(&["show", &subject])?;
        cache.put_bytes(CacheOp::BlobContent, &subject, &content)?;
        Ok(content)
    }

    /// Repository-relative `/`-separated form of `path`, or `None` when it
    /// lies outside the work tree.
    ///
    /// Relative paths are taken as relative to the repository root.
    pub fn relative_path(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = path.as_ref();
        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => {
                    let canonical = path.canonicalize().ok()?;
                    let root = self.root.canonicalize().ok()?;
                    canonical.strip_prefix(root).ok()?.to_path_buf()
                }
            }
        } else {
            path.to_path_buf()
        };

        let mut parts: Vec<String> = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                Component::ParentDir => {
                    parts.pop()?;
                }
                Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }
}
