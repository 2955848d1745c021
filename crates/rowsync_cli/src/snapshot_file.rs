//! JSON snapshot files.
//!
//! ```json
//! {
//!   "name": "Employee",
//!   "columns": [
//!     { "name": "Id", "type": "integer", "primary_key": true, "auto_generated": true },
//!     { "name": "Name", "type": "text" }
//!   ],
//!   "rows": [
//!     { "state": "added", "values": { "Name": "Ada" } },
//!     { "state": "modified", "values": { "Id": 3, "Name": "Grace B. Hopper" },
//!       "original": { "Id": 3, "Name": "Grace Hopper" } }
//!   ]
//! }
//! ```
//!
//! Decimals are written as strings so no precision is lost.

use rowsync_core::{Column, DataType, Row, RowState, SnapshotError, TabularSnapshot, Value};
use rowsync_store::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors reading or writing a snapshot file.
#[derive(Debug, Error)]
pub enum FileError {
    /// The file could not be read or written.
    #[error("cannot access {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid snapshot JSON.
    #[error("invalid snapshot file: {0}")]
    Json(#[from] serde_json::Error),

    /// A row names a column the snapshot does not have.
    #[error("row {row}: unknown column {column}")]
    UnknownColumn {
        /// Row position in the file.
        row: usize,
        /// Column name.
        column: String,
    },

    /// A value cannot be read as its column type.
    #[error("row {row}, column {column}: {message}")]
    Value {
        /// Row position in the file.
        row: usize,
        /// Column name.
        column: String,
        /// What went wrong.
        message: String,
    },

    /// The rows do not fit the columns.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// A snapshot as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Table name.
    pub name: String,
    /// Column metadata.
    pub columns: Vec<Column>,
    /// Rows, in order.
    #[serde(default)]
    pub rows: Vec<RowFile>,
}

/// One row as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFile {
    /// Lifecycle state.
    pub state: RowState,
    /// Current values by column name. Columns left out are NULL.
    #[serde(default)]
    pub values: Map<String, Json>,
    /// Values as last read from the store, for modified and deleted rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<Map<String, Json>>,
    /// Error from the last synchronization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SnapshotFile {
    /// Reads a snapshot file.
    pub fn load(path: &Path) -> Result<Self, FileError> {
        let text = std::fs::read_to_string(path).map_err(|source| FileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the file as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), FileError> {
        let text = self.to_json()?;
        std::fs::write(path, text).map_err(|source| FileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the pretty-printed JSON text.
    pub fn to_json(&self) -> Result<String, FileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds the in-memory snapshot.
    pub fn into_snapshot(self) -> Result<TabularSnapshot, FileError> {
        let mut snapshot = TabularSnapshot::new(self.name, self.columns);
        for (index, row) in self.rows.into_iter().enumerate() {
            let values = read_values(&snapshot, index, &row.values)?;
            let original = row
                .original
                .as_ref()
                .map(|o| read_values(&snapshot, index, o))
                .transpose()?;

            let mut built = match row.state {
                RowState::Added => Row::added(values),
                RowState::Unchanged => Row::unchanged(values),
                RowState::Modified => {
                    Row::modified(original.unwrap_or_else(|| values.clone()), values)
                }
                RowState::Deleted => Row::deleted(original.unwrap_or(values)),
            };
            if let Some(error) = row.error {
                built = built.with_error(error);
            }
            snapshot.push_row(built)?;
        }
        Ok(snapshot)
    }

    /// Captures an in-memory snapshot.
    pub fn from_snapshot(snapshot: &TabularSnapshot) -> Self {
        let columns = snapshot.columns();
        let rows = snapshot
            .rows()
            .iter()
            .map(|row| {
                let original = match row.state() {
                    RowState::Modified | RowState::Deleted => {
                        row.original().map(|o| write_values(columns, o))
                    }
                    RowState::Added | RowState::Unchanged => None,
                };
                RowFile {
                    state: row.state(),
                    values: write_values(columns, row.values()),
                    original,
                    error: row.error_message().map(str::to_string),
                }
            })
            .collect();

        Self {
            name: snapshot.name().to_string(),
            columns: columns.to_vec(),
            rows,
        }
    }
}

fn read_values(
    snapshot: &TabularSnapshot,
    row: usize,
    values: &Map<String, Json>,
) -> Result<Vec<Value>, FileError> {
    let mut out = vec![Value::Null; snapshot.columns().len()];
    for (name, json) in values {
        let index = snapshot
            .column_index(name)
            .ok_or_else(|| FileError::UnknownColumn {
                row,
                column: name.clone(),
            })?;
        let column = &snapshot.columns()[index];
        out[index] = from_json(json, column.data_type).map_err(|message| FileError::Value {
            row,
            column: column.name.clone(),
            message,
        })?;
    }
    Ok(out)
}

fn write_values(columns: &[Column], values: &[Value]) -> Map<String, Json> {
    columns
        .iter()
        .zip(values)
        .map(|(column, value)| (column.name.clone(), to_json(value)))
        .collect()
}

/// Reads a JSON value as `data_type`.
pub fn from_json(json: &Json, data_type: DataType) -> Result<Value, String> {
    let value = match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) if data_type == DataType::Decimal => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map(Value::Decimal)
                .map_err(|e| format!("{text} is not a decimal: {e}"))?
        }
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n
                .as_f64()
                .map(Value::Real)
                .ok_or_else(|| format!("{n} is out of range"))?,
        },
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect();
            Value::Bytes(bytes.ok_or("byte arrays must hold numbers 0-255")?)
        }
        Json::Object(_) => return Err("objects are not valid cell values".to_string()),
    };
    value.coerce(data_type).map_err(|e| e.to_string())
}

/// Writes a value as JSON.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => Json::Number((*i).into()),
        Value::Real(r) => Number::from_f64(*r).map_or(Json::Null, Json::Number),
        Value::Decimal(d) => Json::String(d.to_string()),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::Array(b.iter().map(|&x| Json::from(x)).collect()),
    }
}
