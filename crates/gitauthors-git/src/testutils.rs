//! Test utilities for gitauthors-git.
//!
//! Provides a scripted command runner and a call-counting similarity detector.

use crate::runner::{CommandFailure, CommandRunner};
use crate::similarity::{CloneThresholds, SimilarityDetector};
use crate::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Runner answering from a table keyed by the space-joined argument list.
///
/// Unscripted commands fail like git does on a bad revision (exit code 128).
pub struct ScriptedRunner {
    working_dir: PathBuf,
    responses: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
    history: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            responses: HashMap::new(),
            calls: AtomicUsize::new(0),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Script the stdout of a command line.
    pub fn on(self, args: &str, stdout: &str) -> Self {
        self.on_bytes(args, stdout.as_bytes())
    }

    pub fn on_bytes(mut self, args: &str, stdout: &[u8]) -> Self {
        self.responses.insert(args.to_string(), stdout.to_vec());
        self
    }

    /// Number of commands run so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Command lines run so far, in order.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run_raw(&self, args: &[&str]) -> std::result::Result<Vec<u8>, CommandFailure> {
        let line = args.join(" ");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.history.lock().unwrap().push(line.clone());

        self.responses.get(&line).cloned().ok_or_else(|| CommandFailure {
            command: format!("git {}", line),
            working_dir: self.working_dir.clone(),
            exit_code: Some(128),
            stderr: format!("fatal: unscripted command: {}", line),
        })
    }

    fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

/// Detector with a fixed verdict that counts its invocations.
pub struct CountingDetector {
    verdict: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<CloneThresholds>>,
}

impl CountingDetector {
    pub fn new(verdict: bool) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Thresholds passed to each call.
    pub fn thresholds(&self) -> Vec<CloneThresholds> {
        self.seen.lock().unwrap().clone()
    }
}

impl SimilarityDetector for CountingDetector {
    fn find_clone(&self, left: &Path, right: &Path, thresholds: CloneThresholds) -> Result<bool> {
        assert!(left.is_file(), "left input must be materialized");
        assert!(right.is_file(), "right input must be materialized");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(thresholds);
        Ok(self.verdict)
    }
}
