//! The change-tracked table.

use super::{Column, Row, RowState};
use rowsync_store::{Value, ValueError};
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors from editing a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// No column has this name.
    #[error("table {table} has no column named {column}")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Requested column.
        column: String,
    },

    /// A row has the wrong number of values.
    #[error("table {table} has {expected} columns but the row has {found} values")]
    ArityMismatch {
        /// Table name.
        table: String,
        /// Number of columns.
        expected: usize,
        /// Number of values offered.
        found: usize,
    },

    /// The row index is past the end.
    #[error("row {index} is out of range for {len} rows")]
    RowOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of rows.
        len: usize,
    },

    /// The row is marked for deletion and cannot be edited.
    #[error("row {index} is deleted")]
    RowDeleted {
        /// Row index.
        index: usize,
    },

    /// A value does not fit the column type.
    #[error("column {column}: {source}")]
    Type {
        /// Column name.
        column: String,
        /// Conversion failure.
        source: ValueError,
    },
}

/// An in-memory, change-tracked table.
///
/// Rows keep both their current values and the values last known to be in
/// the store, plus a [`RowState`]. Edits move rows through the lifecycle:
///
/// - new rows start `Added`
/// - editing an `Unchanged` row makes it `Modified`
/// - deleting an `Unchanged` or `Modified` row makes it `Deleted`
/// - deleting an `Added` row removes it, since the store never saw it
///
/// Every value is coerced to its column's type on the way in.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularSnapshot {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl TabularSnapshot {
    /// Creates an empty snapshot.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the position of a column, matching exactly and then ignoring
    /// ASCII case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .or_else(|| self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name)))
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Returns the rows in order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the row at `index`.
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Returns the number of rows, including deleted ones.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the value of a column in a row.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.value(col)
    }

    /// Appends a prepared row after checking its shape and coercing values.
    ///
    /// # Errors
    ///
    /// Returns an error if the value count does not match the columns or a
    /// value cannot be converted to its column type.
    pub fn push_row(&mut self, mut row: Row) -> SnapshotResult<usize> {
        row.values = self.conform(row.values)?;
        if let Some(original) = row.original.take() {
            row.original = Some(self.conform(original)?);
        }
        self.rows.push(row);
        Ok(self.rows.len() - 1)
    }

    /// Appends a new `Added` row. Returns its index.
    ///
    /// # Errors
    ///
    /// See [`TabularSnapshot::push_row`].
    pub fn add_row(&mut self, values: Vec<Value>) -> SnapshotResult<usize> {
        self.push_row(Row::added(values))
    }

    /// Appends a new `Added` row from column/value pairs. Columns not named
    /// are NULL.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::UnknownColumn`] for a name with no column,
    /// or a type error from coercion.
    pub fn insert_row<I, K, V>(&mut self, pairs: I) -> SnapshotResult<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut values = vec![Value::Null; self.columns.len()];
        for (name, value) in pairs {
            let index = self.require_column(name.as_ref())?;
            values[index] = value.into();
        }
        self.add_row(values)
    }

    /// Appends an `Unchanged` row as read from the store.
    ///
    /// # Errors
    ///
    /// See [`TabularSnapshot::push_row`].
    pub fn load_row(&mut self, values: Vec<Value>) -> SnapshotResult<usize> {
        self.push_row(Row::unchanged(values))
    }

    /// Sets one value, marking an `Unchanged` row `Modified`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown row or column, a deleted row, or a
    /// value that does not fit the column type.
    pub fn set_value(
        &mut self,
        row: usize,
        column: &str,
        value: impl Into<Value>,
    ) -> SnapshotResult<()> {
        let col = self.require_column(column)?;
        let value = self.coerce(col, value.into())?;
        let len = self.rows.len();
        let target = self
            .rows
            .get_mut(row)
            .ok_or(SnapshotError::RowOutOfRange { index: row, len })?;

        if target.state == RowState::Deleted {
            return Err(SnapshotError::RowDeleted { index: row });
        }
        target.values[col] = value;
        if target.state == RowState::Unchanged {
            target.state = RowState::Modified;
        }
        Ok(())
    }

    /// Marks a row for deletion. An `Added` row is removed immediately and
    /// later rows shift down by one.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::RowOutOfRange`] for an unknown row.
    pub fn delete_row(&mut self, row: usize) -> SnapshotResult<()> {
        let len = self.rows.len();
        let target = self
            .rows
            .get_mut(row)
            .ok_or(SnapshotError::RowOutOfRange { index: row, len })?;

        match target.state {
            RowState::Added => {
                self.rows.remove(row);
            }
            RowState::Unchanged | RowState::Modified => target.state = RowState::Deleted,
            RowState::Deleted => {}
        }
        Ok(())
    }

    /// Returns the indices of rows with pending changes.
    pub fn changed_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.state.is_pending())
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns true if any row has pending changes.
    pub fn has_changes(&self) -> bool {
        self.rows.iter().any(|row| row.state.is_pending())
    }

    /// Returns true if any row carries an error.
    pub fn has_errors(&self) -> bool {
        self.rows.iter().any(Row::has_error)
    }

    /// Iterates over `(index, message)` for rows carrying an error.
    pub fn errors(&self) -> impl Iterator<Item = (usize, &str)> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.error_message().map(|m| (i, m)))
    }

    /// Commits every pending change locally: deleted rows disappear and the
    /// rest become `Unchanged` with their current values as the original.
    pub fn accept_changes(&mut self) {
        self.accept_where(|_| true);
    }

    /// Accepts pending rows without an error and leaves failed rows pending.
    pub fn accept_successful(&mut self) {
        self.accept_where(|row| !row.has_error());
    }

    fn accept_where(&mut self, accept: impl Fn(&Row) -> bool) {
        self.rows
            .retain(|row| !(row.state == RowState::Deleted && accept(row)));
        for row in self.rows.iter_mut().filter(|row| accept(row)) {
            if row.state.is_pending() {
                row.original = Some(row.values.clone());
                row.state = RowState::Unchanged;
            }
            row.error = None;
        }
    }

    /// Discards every pending change: added rows disappear, edited and
    /// deleted rows return to their original values.
    pub fn reject_changes(&mut self) {
        self.rows.retain(|row| row.state != RowState::Added);
        for row in &mut self.rows {
            if let Some(original) = &row.original {
                row.values.clone_from(original);
            }
            row.state = RowState::Unchanged;
            row.error = None;
        }
    }

    /// Records an error on a row.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::RowOutOfRange`] for an unknown row.
    pub fn set_row_error(&mut self, row: usize, message: impl Into<String>) -> SnapshotResult<()> {
        let len = self.rows.len();
        let target = self
            .rows
            .get_mut(row)
            .ok_or(SnapshotError::RowOutOfRange { index: row, len })?;
        target.error = Some(message.into());
        Ok(())
    }

    /// Clears the error on every row.
    pub fn clear_errors(&mut self) {
        for row in &mut self.rows {
            row.error = None;
        }
    }

    /// Writes a store-assigned value into a row without changing its state.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown row or a value that does not fit the
    /// column type.
    pub fn merge_value(&mut self, row: usize, column: usize, value: Value) -> SnapshotResult<()> {
        let value = self.coerce(column, value)?;
        let len = self.rows.len();
        let target = self
            .rows
            .get_mut(row)
            .ok_or(SnapshotError::RowOutOfRange { index: row, len })?;
        if let Some(slot) = target.values.get_mut(column) {
            *slot = value;
        }
        Ok(())
    }

    fn require_column(&self, name: &str) -> SnapshotResult<usize> {
        self.column_index(name)
            .ok_or_else(|| SnapshotError::UnknownColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    fn coerce(&self, column: usize, value: Value) -> SnapshotResult<Value> {
        let Some(col) = self.columns.get(column) else {
            return Err(SnapshotError::ArityMismatch {
                table: self.name.clone(),
                expected: self.columns.len(),
                found: column + 1,
            });
        };
        value.coerce(col.data_type).map_err(|source| SnapshotError::Type {
            column: col.name.clone(),
            source,
        })
    }

    fn conform(&self, values: Vec<Value>) -> SnapshotResult<Vec<Value>> {
        if values.len() != self.columns.len() {
            return Err(SnapshotError::ArityMismatch {
                table: self.name.clone(),
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| self.coerce(i, value))
            .collect()
    }
}
