//! Fill command implementation.

use crate::snapshot_file::SnapshotFile;
use rowsync_core::SyncConfig;
use std::path::Path;

/// Runs the fill command: appends the table's rows to the snapshot and
/// writes it to `output`, or to stdout.
pub fn run(
    db: &Path,
    snapshot_path: &Path,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut snapshot = SnapshotFile::load(snapshot_path)?.into_snapshot()?;
    let sync = super::synchronizer(db, SyncConfig::default())?;

    let loaded = sync.fill(&mut snapshot)?;
    tracing::info!(table = snapshot.name(), loaded, "snapshot filled");

    let file = SnapshotFile::from_snapshot(&snapshot);
    match output {
        Some(path) => file.save(path)?,
        None => println!("{}", file.to_json()?),
    }
    Ok(())
}
