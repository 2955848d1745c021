//! Inspect command implementation.

use crate::snapshot_file::SnapshotFile;
use rowsync_core::{Column, RowState, TableSchema, TabularSnapshot};
use serde::Serialize;
use std::path::Path;

/// Snapshot inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Table name.
    pub table: String,
    /// Column metadata.
    pub columns: Vec<Column>,
    /// Key columns used to address rows, if the snapshot has a usable key.
    pub key: Vec<String>,
    /// Why the snapshot has no usable key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_error: Option<String>,
    /// Number of rows.
    pub rows: usize,
    /// Rows by state.
    pub states: StateCounts,
    /// Rows carrying an error.
    pub errors: Vec<RowErrorInfo>,
}

/// Row counts by state.
#[derive(Debug, Default, Serialize)]
pub struct StateCounts {
    /// Rows as read from the store.
    pub unchanged: usize,
    /// New rows.
    pub added: usize,
    /// Edited rows.
    pub modified: usize,
    /// Rows marked for deletion.
    pub deleted: usize,
}

/// An error recorded on a row.
#[derive(Debug, Serialize)]
pub struct RowErrorInfo {
    /// Row position.
    pub row: usize,
    /// Error message.
    pub message: String,
}

impl InspectResult {
    /// Summarizes a snapshot.
    pub fn new(snapshot: &TabularSnapshot) -> Self {
        let (key, key_error) = match TableSchema::from_snapshot(snapshot) {
            Ok(schema) => (schema.key_columns().map(|c| c.name.clone()).collect(), None),
            Err(err) => (Vec::new(), Some(err.to_string())),
        };

        let mut states = StateCounts::default();
        for row in snapshot.rows() {
            match row.state() {
                RowState::Unchanged => states.unchanged += 1,
                RowState::Added => states.added += 1,
                RowState::Modified => states.modified += 1,
                RowState::Deleted => states.deleted += 1,
            }
        }

        Self {
            table: snapshot.name().to_string(),
            columns: snapshot.columns().to_vec(),
            key,
            key_error,
            rows: snapshot.len(),
            states,
            errors: snapshot
                .errors()
                .map(|(row, message)| RowErrorInfo {
                    row,
                    message: message.to_string(),
                })
                .collect(),
        }
    }
}

/// Runs the inspect command.
pub fn run(snapshot_path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = SnapshotFile::load(snapshot_path)?.into_snapshot()?;
    let result = InspectResult::new(&snapshot);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Snapshot: {}", result.table);
    println!();
    println!("Columns:");
    for column in &result.columns {
        let mut flags = Vec::new();
        if column.is_primary_key {
            flags.push("primary key");
        }
        if column.is_auto_generated {
            flags.push("auto");
        }
        if column.is_unique {
            flags.push("unique");
        }
        if flags.is_empty() {
            println!("  {} {}", column.name, column.data_type);
        } else {
            println!("  {} {} ({})", column.name, column.data_type, flags.join(", "));
        }
    }
    println!();
    match &result.key_error {
        Some(err) => println!("Key: none ({err})"),
        None => println!("Key: {}", result.key.join(", ")),
    }
    println!();
    println!("Rows: {}", result.rows);
    println!("  Unchanged: {}", result.states.unchanged);
    println!("  Added:     {}", result.states.added);
    println!("  Modified:  {}", result.states.modified);
    println!("  Deleted:   {}", result.states.deleted);

    if !result.errors.is_empty() {
        println!();
        println!("Errors:");
        for error in &result.errors {
            println!("  [{}] {}", error.row, error.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowsync_core::{DataType, Value};

    #[test]
    fn counts_states_and_errors() {
        let mut snapshot = TabularSnapshot::new(
            "Tag",
            vec![
                Column::new("Label", DataType::Text).primary_key(),
                Column::new("Color", DataType::Text),
            ],
        );
        snapshot.load_row(vec!["a".into(), "red".into()]).unwrap();
        snapshot.load_row(vec!["b".into(), Value::Null]).unwrap();
        snapshot.delete_row(1).unwrap();
        snapshot.insert_row([("Label", "c")]).unwrap();
        snapshot.set_row_error(2, "duplicate").unwrap();

        let result = InspectResult::new(&snapshot);
        assert_eq!(result.key, vec!["Label"]);
        assert_eq!(result.rows, 3);
        assert_eq!(result.states.unchanged, 1);
        assert_eq!(result.states.deleted, 1);
        assert_eq!(result.states.added, 1);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn missing_key_is_explained() {
        let snapshot = TabularSnapshot::new("Note", vec![Column::new("Body", DataType::Text)]);
        let result = InspectResult::new(&snapshot);
        assert!(result.key.is_empty());
        assert!(result.key_error.unwrap().contains("no primary key"));
    }
}
