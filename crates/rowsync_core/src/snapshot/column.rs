//! Column metadata.

use rowsync_store::DataType;
use serde::{Deserialize, Serialize};

/// A column of a [`super::TabularSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as the store knows it.
    pub name: String,
    /// Declared type; values are coerced to it.
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Part of the primary key.
    #[serde(rename = "primary_key", default)]
    pub is_primary_key: bool,
    /// Assigned by the store on insert.
    #[serde(rename = "auto_generated", default)]
    pub is_auto_generated: bool,
    /// Carries a unique constraint.
    #[serde(rename = "unique", default)]
    pub is_unique: bool,
}

impl Column {
    /// Creates a plain column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_primary_key: false,
            is_auto_generated: false,
            is_unique: false,
        }
    }

    /// Marks the column as part of the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Marks the column as store-assigned.
    #[must_use]
    pub fn auto_generated(mut self) -> Self {
        self.is_auto_generated = true;
        self
    }

    /// Marks the column as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }
}
