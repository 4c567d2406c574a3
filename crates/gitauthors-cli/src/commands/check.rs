//! Check command implementation.

use anyhow::Result;
use colored::Colorize;
use gitauthors_core::ExtractorKind;
use gitauthors_git::{AuthorSource, FileVerdict, GitRepository};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

struct Finding {
    kind: ExtractorKind,
    path: String,
    verdict: FileVerdict,
}

impl Finding {
    /// Files without history only warn.
    fn is_failure(&self) -> bool {
        matches!(self.verdict, FileVerdict::Mismatch(_) | FileVerdict::NoHeader)
    }
}

/// Run the check command. Returns whether every file passed.
pub async fn run(paths: Vec<PathBuf>, config: Option<PathBuf>, no_cache: bool) -> Result<bool> {
    // One task per repository, each with its own index and cache namespace
    let mut roots: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for path in paths {
        let path = super::absolute(&path)?;
        let root = GitRepository::discover(super::discovery_start(&path))?;
        roots.entry(root).or_default().push(path);
    }

    let mut tasks = Vec::new();
    for (root, paths) in roots {
        let config = config.clone();
        let handle = tokio::task::spawn_blocking({
            let root = root.clone();
            move || check_root(&root, &paths, config.as_deref(), no_cache)
        });
        tasks.push((root, handle));
    }

    let mut clean = true;
    for (root, handle) in tasks {
        println!("{} Checking {}", "→".blue(), root.display());
        match handle.await? {
            Ok(findings) => clean &= report(&findings),
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                clean = false;
            }
        }
        println!();
    }

    if clean {
        println!("{} All declared authors match history", "✓".green());
    } else {
        println!("{} Declared authors differ from history", "✗".red());
    }
    Ok(clean)
}

fn check_root(root: &Path, paths: &[PathBuf], config: Option<&Path>, no_cache: bool) -> Result<Vec<Finding>> {
    let (attribution, settings) = super::open(root, config, no_cache)?;
    let prefixes: Vec<Option<String>> = paths
        .iter()
        .map(|p| attribution.repository().relative_path(p))
        .collect();

    let mut findings = Vec::new();
    for kind in &settings.extractors {
        for path in kind.list_file_identities(&attribution)? {
            if !prefixes.iter().any(|prefix| covers(prefix.as_deref(), &path)) {
                continue;
            }
            let verdict = kind.check(&attribution, &path, settings.require_header)?;
            tracing::debug!("{} {}: {:?}", kind.as_str(), path, verdict);
            findings.push(Finding {
                kind: *kind,
                path,
                verdict,
            });
        }
    }
    Ok(findings)
}

/// Whether a command-line prefix (`None` for the whole repository) selects `path`.
fn covers(prefix: Option<&str>, path: &str) -> bool {
    match prefix {
        None => true,
        Some(prefix) => {
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        }
    }
}

fn report(findings: &[Finding]) -> bool {
    for finding in findings {
        let label = format!("[{}] {}", finding.kind.as_str(), finding.path);
        match &finding.verdict {
            FileVerdict::Clean => println!("{} {}", "✓".green(), label),
            FileVerdict::NoHistory => println!("{} {}: no history", "⚠".yellow(), label),
            FileVerdict::NoHeader => println!("{} {}: no declared author", "⚠".yellow(), label),
            FileVerdict::Mismatch(diff) => {
                println!("{} {}", "✗".red(), label);
                for author in &diff.missing {
                    println!("   {} {}", "+".green(), author);
                }
                for author in &diff.unexpected {
                    println!("   {} {}", "-".red(), author);
                }
            }
        }
    }

    let failures = findings.iter().filter(|f| f.is_failure()).count();
    println!(
        "  {} file(s) checked, {} with problems",
        findings.len(),
        failures.to_string().bold()
    );
    failures == 0
}
