//! Explicit table schema used to derive statements.

use crate::error::{SyncError, SyncResult};
use crate::snapshot::{Column, TabularSnapshot};

/// The shape of the target table.
///
/// The key is the primary-key columns, or the first unique column when the
/// table declares no primary key. A schema without a key cannot address
/// individual rows and is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    table: String,
    columns: Vec<Column>,
    key: Vec<usize>,
}

impl TableSchema {
    /// Creates a schema.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name or column list is empty, a
    /// column name repeats, or no key can be derived.
    pub fn new(table: impl Into<String>, columns: Vec<Column>) -> SyncResult<Self> {
        let table = table.into();
        if table.trim().is_empty() {
            return Err(SyncError::validation("table name is empty"));
        }
        if columns.is_empty() {
            return Err(SyncError::validation(format!("table {table} has no columns")));
        }
        for (i, column) in columns.iter().enumerate() {
            if column.name.trim().is_empty() {
                return Err(SyncError::validation(format!(
                    "table {table} has a column with an empty name"
                )));
            }
            if columns[..i]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(SyncError::validation(format!(
                    "table {table} declares column {} twice",
                    column.name
                )));
            }
        }

        let mut key: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_primary_key)
            .map(|(i, _)| i)
            .collect();
        if key.is_empty() {
            key.extend(columns.iter().position(|c| c.is_unique));
        }
        if key.is_empty() {
            return Err(SyncError::validation(format!(
                "table {table} has no primary key or unique column"
            )));
        }

        Ok(Self {
            table,
            columns,
            key,
        })
    }

    /// Builds the schema from a snapshot's column metadata.
    ///
    /// # Errors
    ///
    /// See [`TableSchema::new`].
    pub fn from_snapshot(snapshot: &TabularSnapshot) -> SyncResult<Self> {
        Self::new(snapshot.name(), snapshot.columns().to_vec())
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns every column.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the key columns.
    pub fn key_columns(&self) -> impl Iterator<Item = &Column> {
        self.key.iter().map(|&i| &self.columns[i])
    }

    /// Returns true if the column is part of the key.
    pub fn is_key(&self, index: usize) -> bool {
        self.key.contains(&index)
    }

    /// Returns the columns an insert supplies values for.
    pub fn insert_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.is_auto_generated)
    }

    /// Returns the columns an update assigns.
    pub fn update_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, c)| !self.is_key(*i) && !c.is_auto_generated)
            .map(|(_, c)| c)
    }

    /// Returns the auto-generated primary-key column, if any.
    pub fn generated_key(&self) -> Option<&Column> {
        self.key_columns()
            .find(|c| c.is_primary_key && c.is_auto_generated)
    }

    /// Checks that a snapshot can be written through this schema.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first schema column the
    /// snapshot does not carry, or a table name mismatch.
    pub fn check_snapshot(&self, snapshot: &TabularSnapshot) -> SyncResult<()> {
        if !snapshot.name().eq_ignore_ascii_case(&self.table) {
            return Err(SyncError::validation(format!(
                "snapshot {} does not match table {}",
                snapshot.name(),
                self.table
            )));
        }
        for column in &self.columns {
            if snapshot.column_index(&column.name).is_none() {
                return Err(SyncError::validation(format!(
                    "snapshot {} has no column {}",
                    snapshot.name(),
                    column.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rowsync_store::DataType;

    fn employee_columns() -> Vec<Column> {
        vec![
            Column::new("Id", DataType::Integer).primary_key().auto_generated(),
            Column::new("Name", DataType::Text).unique(),
            Column::new("Salary", DataType::Decimal),
        ]
    }

    #[test]
    fn primary_key_wins() {
        let schema = TableSchema::new("Employee", employee_columns()).unwrap();
        let key: Vec<_> = schema.key_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(key, vec!["Id"]);
        assert_eq!(schema.generated_key().map(|c| c.name.as_str()), Some("Id"));

        let insert: Vec<_> = schema.insert_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(insert, vec!["Name", "Salary"]);
        let update: Vec<_> = schema.update_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(update, vec!["Name", "Salary"]);
    }

    #[test]
    fn unique_column_is_fallback_key() {
        let schema = TableSchema::new(
            "Tag",
            vec![
                Column::new("Label", DataType::Text).unique(),
                Column::new("Color", DataType::Text),
            ],
        )
        .unwrap();
        let key: Vec<_> = schema.key_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(key, vec!["Label"]);
        assert!(schema.generated_key().is_none());
    }

    #[test]
    fn keyless_tables_are_rejected() {
        let err = TableSchema::new("Log", vec![Column::new("Line", DataType::Text)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("no primary key"));
    }

    #[test]
    fn malformed_schemas_are_rejected() {
        assert!(TableSchema::new("", employee_columns()).is_err());
        assert!(TableSchema::new("Employee", vec![]).is_err());

        let mut columns = employee_columns();
        columns.push(Column::new("name", DataType::Text));
        assert!(TableSchema::new("Employee", columns).is_err());
    }

    #[test]
    fn snapshot_must_carry_schema_columns() {
        let schema = TableSchema::new("Employee", employee_columns()).unwrap();
        let snapshot = TabularSnapshot::new(
            "Employee",
            vec![Column::new("Id", DataType::Integer).primary_key()],
        );
        assert!(schema.check_snapshot(&snapshot).is_err());

        let snapshot = TabularSnapshot::new("Employee", employee_columns());
        assert!(schema.check_snapshot(&snapshot).is_ok());
    }
}
