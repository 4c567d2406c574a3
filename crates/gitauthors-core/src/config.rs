//! Settings loaded from `.gitauthors.json`.

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default settings file name, looked up at the repository root.
pub const SETTINGS_FILE: &str = ".gitauthors.json";

/// Where declared authors come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// `@author` tags in source file headers.
    Source,
    /// `composer.json`
    Composer,
    /// `bower.json`
    Bower,
    /// `package.json`
    Node,
}

impl ExtractorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorKind::Source => "source",
            ExtractorKind::Composer => "composer",
            ExtractorKind::Bower => "bower",
            ExtractorKind::Node => "node",
        }
    }

    /// Manifest file inspected by this extractor, if any.
    pub fn manifest(&self) -> Option<&'static str> {
        match self {
            ExtractorKind::Source => None,
            ExtractorKind::Composer => Some("composer.json"),
            ExtractorKind::Bower => Some("bower.json"),
            ExtractorKind::Node => Some("package.json"),
        }
    }
}

/// Thresholds deciding whether a rename or copy is followed.
///
/// The defaults are empirical and have not been calibrated against a
/// large corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Renames at or above this similarity index are followed without
    /// comparing content.
    pub rename_follow_similarity: u8,
    /// Minimum cloned lines confirming a low-similarity rename.
    pub rename_min_lines: usize,
    /// Minimum cloned tokens confirming a low-similarity rename.
    pub rename_min_tokens: usize,
    /// Minimum cloned lines confirming a copy.
    pub copy_min_lines: usize,
    /// Minimum cloned tokens confirming a copy.
    pub copy_min_tokens: usize,
    /// Ask git for copy detection when indexing commits.
    ///
    /// Uses `-C --find-copies-harder`, so every unmodified file of the
    /// parent is a copy candidate. On large trees this makes each
    /// per-commit diff noticeably slower; disable it to only follow renames.
    pub detect_copies: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            rename_follow_similarity: 75,
            rename_min_lines: 2,
            rename_min_tokens: 7,
            copy_min_lines: 5,
            copy_min_tokens: 35,
            detect_copies: true,
        }
    }
}

/// User settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Glob patterns of files to check.
    pub include: Vec<String>,
    /// Glob patterns of files to skip.
    pub exclude: Vec<String>,
    /// Declared-author sources to check.
    pub extractors: Vec<ExtractorKind>,
    /// Report source files declaring no author at all.
    pub require_header: bool,
    /// Cache database location; relative paths resolve against the repository root.
    pub cache: Option<PathBuf>,
    pub tracker: TrackerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            include: vec!["**".to_string()],
            exclude: Vec::new(),
            extractors: vec![ExtractorKind::Source],
            require_header: false,
            cache: None,
            tracker: TrackerConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load `.gitauthors.json` from `root`, falling back to defaults when absent.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(SETTINGS_FILE);
        if path.is_file() {
            tracing::debug!("Loading settings from {}", path.display());
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Cache database path for a repository root.
    pub fn cache_path(&self, root: &Path) -> PathBuf {
        match &self.cache {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root.join(p),
            None => root.join(".gitauthors").join("cache.db"),
        }
    }

    /// Compile include/exclude patterns.
    pub fn path_filter(&self) -> Result<PathFilter> {
        PathFilter::new(&self.include, &self.exclude)
    }
}

/// Include/exclude matcher over repository-relative `/`-separated paths.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>> {
            patterns.iter().map(|p| glob_to_regex(p)).collect()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// True when the path matches an include pattern and no exclude pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.include.iter().any(|r| r.is_match(path)) && !self.exclude.iter().any(|r| r.is_match(path))
    }
}

/// Translate a glob into an anchored regex.
///
/// `**` spans directories, `*` and `?` stay within one segment. A trailing
/// `/` matches everything below that directory.
fn glob_to_regex(glob: &str) -> Result<Regex> {
    let glob = glob.trim_start_matches("./");
    let mut pattern = String::from("^");
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    pattern.push_str("(?:.*/)?");
                } else {
                    pattern.push_str(".*");
                }
            }
            '*' => pattern.push_str("[^/]*"),
            '?' => pattern.push_str("[^/]"),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    if glob.ends_with('/') {
        pattern.push_str(".*");
    }
    pattern.push('$');

    Regex::new(&pattern).map_err(|e| Error::Config(format!("invalid pattern {:?}: {}", glob, e)))
}
