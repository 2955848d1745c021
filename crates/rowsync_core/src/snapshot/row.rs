//! Rows and their lifecycle.

use rowsync_store::{SourceVersion, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a row relative to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowState {
    /// Matches the store.
    Unchanged,
    /// Not yet in the store.
    Added,
    /// Edited since it was loaded or last accepted.
    Modified,
    /// Marked for deletion.
    Deleted,
}

impl RowState {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            RowState::Unchanged => "unchanged",
            RowState::Added => "added",
            RowState::Modified => "modified",
            RowState::Deleted => "deleted",
        }
    }

    /// Returns true for every state except `Unchanged`.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        !matches!(self, RowState::Unchanged)
    }
}

impl fmt::Display for RowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of a snapshot.
///
/// `original` holds the values last known to be in the store and is absent
/// for rows that were never there.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub(super) values: Vec<Value>,
    pub(super) original: Option<Vec<Value>>,
    pub(super) state: RowState,
    pub(super) error: Option<String>,
}

impl Row {
    /// A new row, not yet in the store.
    pub fn added(values: Vec<Value>) -> Self {
        Self {
            values,
            original: None,
            state: RowState::Added,
            error: None,
        }
    }

    /// A row as loaded from the store.
    pub fn unchanged(values: Vec<Value>) -> Self {
        Self {
            original: Some(values.clone()),
            values,
            state: RowState::Unchanged,
            error: None,
        }
    }

    /// A loaded row that has since been edited.
    pub fn modified(original: Vec<Value>, current: Vec<Value>) -> Self {
        Self {
            values: current,
            original: Some(original),
            state: RowState::Modified,
            error: None,
        }
    }

    /// A loaded row marked for deletion.
    pub fn deleted(original: Vec<Value>) -> Self {
        Self {
            values: original.clone(),
            original: Some(original),
            state: RowState::Deleted,
            error: None,
        }
    }

    /// Attaches an error message.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Returns the current values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the current value at `index`.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the original values, if the row was ever in the store.
    pub fn original(&self) -> Option<&[Value]> {
        self.original.as_deref()
    }

    /// Returns the values of the requested version.
    ///
    /// Rows with no original version answer with their current values.
    pub fn version(&self, version: SourceVersion) -> &[Value] {
        match version {
            SourceVersion::Current => &self.values,
            SourceVersion::Original => self.original.as_deref().unwrap_or(&self.values),
        }
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> RowState {
        self.state
    }

    /// Returns true if the last synchronization failed for this row.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the error message of the last failed synchronization.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
