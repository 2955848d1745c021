//! Sync command implementation.

use crate::snapshot_file::SnapshotFile;
use rowsync_core::{RetryConfig, SyncConfig, SyncOutcome, SynchronizationResult};
use std::path::Path;
use std::time::Duration;

/// Options of the sync command.
#[derive(Debug)]
pub struct SyncOptions<'a> {
    /// SQLite database file.
    pub db: &'a Path,
    /// Snapshot file to apply.
    pub snapshot: &'a Path,
    /// Commit the rows that succeed instead of rolling everything back.
    pub keep_going: bool,
    /// Per-statement timeout; zero means no limit.
    pub timeout: Duration,
    /// Executions per statement, retries included.
    pub attempts: u32,
    /// Where to write the reconciled snapshot.
    pub output: Option<&'a Path>,
    /// Output format (text, json).
    pub format: &'a str,
}

/// Runs the sync command.
///
/// Fails when nothing was committed; a partial success prints the failed
/// rows and exits normally.
pub fn run(options: &SyncOptions<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let mut snapshot = SnapshotFile::load(options.snapshot)?.into_snapshot()?;

    let config = SyncConfig::new()
        .with_rollback_all_on_error(!options.keep_going)
        .with_command_timeout(options.timeout)
        .with_retry(RetryConfig::new(options.attempts));
    let sync = super::synchronizer(options.db, config)?;

    tracing::debug!(
        table = snapshot.name(),
        pending = snapshot.changed_rows().len(),
        "synchronizing snapshot file"
    );
    let outcome = sync.synchronize_with_defaults(&mut snapshot);

    if let Some(path) = options.output {
        SnapshotFile::from_snapshot(&snapshot).save(path)?;
    }

    match options.format {
        "json" => println!("{}", serde_json::to_string_pretty(&outcome)?),
        _ => print_text_output(&outcome),
    }

    match outcome.result {
        SynchronizationResult::Success | SynchronizationResult::PartialSuccess => Ok(()),
        result => Err(format!("synchronization {result}").into()),
    }
}

fn print_text_output(outcome: &SyncOutcome) {
    println!("Result:     {}", outcome.result);
    println!("Applied:    {}", outcome.applied);
    println!("Failed:     {}", outcome.failed);
    println!("Statements: {}", outcome.statements);
    if !outcome.message.is_empty() {
        println!();
        println!("Errors:");
        for line in outcome.message.lines() {
            println!("  {line}");
        }
    }
}
