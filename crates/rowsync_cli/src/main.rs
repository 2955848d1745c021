//! Rowsync CLI
//!
//! Command-line tools for synchronizing snapshot files with a SQLite
//! database.
//!
//! # Commands
//!
//! - `sync` - Apply a snapshot file's pending changes in one transaction
//! - `fill` - Load a table's rows into a snapshot file
//! - `commands` - Print the commands a sync would derive
//! - `inspect` - Summarize a snapshot file

mod commands;
mod snapshot_file;

use clap::{Parser, Subcommand};
use commands::sync::SyncOptions;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Rowsync change-set synchronization tools.
#[derive(Parser)]
#[command(name = "rowsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a snapshot file's pending changes to the database
    Sync {
        /// Path to the SQLite database file
        #[arg(short, long)]
        db: PathBuf,

        /// Path to the snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Commit successful rows even if others fail
        #[arg(short, long)]
        keep_going: bool,

        /// Per-statement timeout in seconds (0 for no limit)
        #[arg(short, long, default_value = "30")]
        timeout: u64,

        /// Executions per statement, retries included
        #[arg(short, long, default_value = "3")]
        attempts: u32,

        /// Write the reconciled snapshot to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Load a table's rows into a snapshot file
    Fill {
        /// Path to the SQLite database file
        #[arg(short, long)]
        db: PathBuf,

        /// Path to the snapshot file naming the table and columns
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Write the filled snapshot to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the commands a sync would derive for a snapshot file
    Commands {
        /// Path to the snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,

        /// SQL dialect (sqlite, sqlserver)
        #[arg(short, long, default_value = "sqlite")]
        dialect: String,
    },

    /// Summarize a snapshot file
    Inspect {
        /// Path to the snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging on stderr; stdout carries command output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Sync {
            db,
            snapshot,
            keep_going,
            timeout,
            attempts,
            output,
            format,
        } => {
            commands::sync::run(&SyncOptions {
                db: &db,
                snapshot: &snapshot,
                keep_going,
                timeout: Duration::from_secs(timeout),
                attempts,
                output: output.as_deref(),
                format: &format,
            })?;
        }
        Commands::Fill {
            db,
            snapshot,
            output,
        } => {
            commands::fill::run(&db, &snapshot, output.as_deref())?;
        }
        Commands::Commands { snapshot, dialect } => {
            commands::derive::run(&snapshot, &dialect)?;
        }
        Commands::Inspect { snapshot, format } => {
            commands::inspect::run(&snapshot, &format)?;
        }
        Commands::Version => {
            println!("rowsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("rowsync core v{}", rowsync_core::VERSION);
        }
    }

    Ok(())
}
