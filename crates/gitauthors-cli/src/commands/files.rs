//! Files command implementation.

use anyhow::Result;
use colored::Colorize;
use gitauthors_git::AuthorSource;
use std::path::PathBuf;

/// Run the files command.
pub async fn run(path: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let path = super::absolute(&path)?;
    let (attribution, settings) = super::open(super::discovery_start(&path), config.as_deref(), true)?;

    println!(
        "{} Files in {}",
        "→".blue(),
        attribution.repository().root().display()
    );

    let mut total = 0;
    for kind in &settings.extractors {
        let files = kind.list_file_identities(&attribution)?;
        if files.is_empty() {
            continue;
        }
        println!();
        println!("{} ({})", kind.as_str().bold(), files.len());
        for file in &files {
            println!("  {}", file);
        }
        total += files.len();
    }

    println!();
    println!("{} {} file(s)", "✓".green(), total);
    Ok(())
}
