//! gitauthors CLI
//!
//! Checks declared authors against git history.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "gitauthors")]
#[command(author, version, about = "Check declared authors against git history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List files whose declared authors can be checked
    Files {
        /// Path inside the repository (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Settings file (defaults to .gitauthors.json at the repository root)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the authors history attributes to a file
    Authors {
        /// File to attribute
        file: PathBuf,

        /// Settings file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not read or write the history cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Compare declared authors with history
    Check {
        /// Paths to check; each repository found is checked once
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Settings file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not read or write the history cache
        #[arg(long)]
        no_cache: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("gitauthors=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("gitauthors=info")
            .init();
    }

    match cli.command {
        Commands::Files { path, config } => {
            commands::files::run(path, config).await?;
        }
        Commands::Authors { file, config, no_cache } => {
            commands::authors::run(file, config, no_cache).await?;
        }
        Commands::Check { paths, config, no_cache } => {
            if !commands::check::run(paths, config, no_cache).await? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
