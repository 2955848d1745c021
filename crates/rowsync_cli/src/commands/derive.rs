//! Commands command implementation: prints the commands a sync would derive.

use crate::snapshot_file::SnapshotFile;
use rowsync_core::statement::dialect_by_name;
use rowsync_core::{Command, CommandBuilder, SourceVersion, TableSchema};
use std::path::Path;

/// Runs the commands command.
pub fn run(snapshot_path: &Path, dialect: &str) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = SnapshotFile::load(snapshot_path)?.into_snapshot()?;
    let dialect = dialect_by_name(dialect).ok_or_else(|| format!("Unknown dialect: {dialect}"))?;
    let schema = TableSchema::from_snapshot(&snapshot)?;
    let set = CommandBuilder::new(&schema, dialect.as_ref()).derive_all()?;

    println!("Commands for {} ({})", schema.table(), dialect.name());
    for (kind, command) in set.iter() {
        println!();
        print_command(kind, command);
    }
    Ok(())
}

fn print_command(kind: &str, command: &Command) {
    println!("{kind}:");
    println!("  {}", command.text);
    for param in &command.parameters {
        let source = match (&param.source_column, param.source_version) {
            (Some(column), SourceVersion::Current) => format!(" <- {column}"),
            (Some(column), SourceVersion::Original) => format!(" <- {column} (original)"),
            (None, _) => String::new(),
        };
        println!(
            "    {} {} {:?}{source}",
            param.name, param.data_type, param.direction
        );
    }
}
