//! Error types for synchronization.

use crate::snapshot::SnapshotError;
use rowsync_store::{FailureClass, StoreError};
use serde::Serialize;
use thiserror::Error;

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Coarse classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The snapshot or schema is unusable; nothing was sent to the store.
    Validation,
    /// The store kept failing with a transient error.
    TransientStore,
    /// An update or delete matched no row.
    Concurrency,
    /// The store rejected the statement.
    Provider,
    /// Anything else.
    Unexpected,
}

/// Errors that can occur while synchronizing a snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// The snapshot or schema cannot be synchronized.
    #[error("validation failed: {message}")]
    Validation {
        /// What is wrong.
        message: String,
    },

    /// The store failed, after `attempts` executions.
    #[error("{source}")]
    Store {
        /// The last store error.
        source: StoreError,
        /// How the store classified the error.
        class: FailureClass,
        /// Number of executions made.
        attempts: u32,
    },

    /// An update or delete affected no rows.
    #[error("concurrency violation: the {operation} command affected 0 of the expected 1 rows")]
    Concurrency {
        /// `update` or `delete`.
        operation: &'static str,
    },

    /// A snapshot operation failed.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// An internal inconsistency.
    #[error("unexpected error: {message}")]
    Unexpected {
        /// Description.
        message: String,
    },
}

impl SyncError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an unexpected error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Wraps a store error seen after `attempts` executions, using the
    /// error's default classification.
    pub fn store(source: StoreError, attempts: u32) -> Self {
        let class = source.classify();
        Self::classified(source, class, attempts)
    }

    /// Wraps a store error with the classification the store reported.
    pub fn classified(source: StoreError, class: FailureClass, attempts: u32) -> Self {
        Self::Store {
            source,
            class,
            attempts,
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Validation { .. } => ErrorKind::Validation,
            SyncError::Store { class, .. } if class.is_transient() => ErrorKind::TransientStore,
            SyncError::Store { .. } => ErrorKind::Provider,
            SyncError::Concurrency { .. } => ErrorKind::Concurrency,
            SyncError::Snapshot(_) => ErrorKind::Validation,
            SyncError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Returns true if the store failed transiently.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::TransientStore
    }

    /// Returns true if the error invalidates the whole batch, not one row.
    #[must_use]
    pub fn is_batch_fatal(&self) -> bool {
        match self {
            SyncError::Store { source, .. } => source.is_batch_fatal(),
            SyncError::Validation { .. } | SyncError::Unexpected { .. } => true,
            SyncError::Concurrency { .. } | SyncError::Snapshot(_) => false,
        }
    }

    /// Returns the number of store executions, if the store was reached.
    #[must_use]
    pub fn attempts(&self) -> Option<u32> {
        match self {
            SyncError::Store { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
