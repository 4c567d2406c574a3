//! Authors command implementation.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

/// Run the authors command.
pub async fn run(file: PathBuf, config: Option<PathBuf>, no_cache: bool) -> Result<()> {
    let file = super::absolute(&file)?;
    let (attribution, _) = super::open(super::discovery_start(&file), config.as_deref(), no_cache)?;

    let Some(relative) = attribution.repository().relative_path(&file) else {
        eprintln!("{} {} is outside the repository", "✗".red(), file.display());
        return Ok(());
    };
    println!("{} Authors of {}", "→".blue(), relative);

    let Some(authors) = attribution.authors_for(&file)? else {
        println!("{} No history found for: {}", "⚠".yellow(), relative);
        return Ok(());
    };

    if let Some(history) = attribution.path_history(&file)? {
        let predecessors: Vec<_> = history.paths().into_iter().skip(1).collect();
        if !predecessors.is_empty() {
            println!("   Previously: {}", predecessors.join(", ").dimmed());
        }
    }

    println!();
    if authors.is_empty() {
        println!("  (only merge commits touched this file)");
    }
    for author in &authors {
        println!("  {}", author);
    }
    Ok(())
}
