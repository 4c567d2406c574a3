//! Git subprocess execution.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A version-control command that exited unsuccessfully.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    /// Full command line, program included.
    pub command: String,
    /// Directory the command ran in.
    pub working_dir: PathBuf,
    /// Exit code, `None` when terminated by a signal or never started.
    pub exit_code: Option<i32>,
    /// Captured standard error (or the spawn error).
    pub stderr: String,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());
        write!(
            f,
            "`{}` failed in {} (exit code {}): {}",
            self.command,
            self.working_dir.display(),
            code,
            self.stderr.trim()
        )
    }
}

impl std::error::Error for CommandFailure {}

/// Runs version-control subcommands in a fixed working directory.
pub trait CommandRunner: Send + Sync {
    /// Run a subcommand and return its raw stdout.
    fn run_raw(&self, args: &[&str]) -> Result<Vec<u8>, CommandFailure>;

    /// Directory every command runs in.
    fn working_dir(&self) -> &Path;

    /// Run a subcommand and return its stdout as text.
    fn run(&self, args: &[&str]) -> Result<String, CommandFailure> {
        let stdout = self.run_raw(args)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// Executes the `git` binary.
pub struct GitCommand {
    program: String,
    working_dir: PathBuf,
}

impl GitCommand {
    /// Create a runner for the `git` found on `PATH`.
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self::with_program("git", working_dir)
    }

    /// Create a runner for a specific git executable.
    pub fn with_program(program: impl Into<String>, working_dir: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.as_ref().to_path_buf(),
        }
    }

    fn command_line(&self, args: &[&str]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl CommandRunner for GitCommand {
    fn run_raw(&self, args: &[&str]) -> Result<Vec<u8>, CommandFailure> {
        tracing::debug!("Running {}", self.command_line(args));

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.working_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| CommandFailure {
                command: self.command_line(args),
                working_dir: self.working_dir.clone(),
                exit_code: None,
                stderr: e.to_string(),
            })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(CommandFailure {
                command: self.command_line(args),
                working_dir: self.working_dir.clone(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }

    fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}
