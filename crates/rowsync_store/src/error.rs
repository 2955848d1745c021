//! Error types for store operations.

use std::time::Duration;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Why a transient failure is expected to clear up on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// A statement or lock wait ran out of time.
    Timeout,
    /// The connection could not be established or was lost.
    Connectivity,
}

/// Classification of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retrying the identical statement may succeed.
    Transient(TransientKind),
    /// Retrying will not help.
    Fatal,
}

impl FailureClass {
    /// Returns true for transient classifications.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(self, FailureClass::Transient(_))
    }
}

/// Errors reported by a relational store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A statement or lock wait exceeded its timeout.
    #[error("timeout: {message}")]
    Timeout {
        /// Store-reported message.
        message: String,
    },

    /// The connection could not be opened or was lost.
    #[error("connection error: {message}")]
    Connection {
        /// Store-reported message.
        message: String,
    },

    /// A constraint (unique, not-null, check, foreign key) was violated.
    #[error("constraint violation: {message}")]
    Constraint {
        /// Store-reported message.
        message: String,
    },

    /// The statement is malformed or references unknown objects.
    #[error("malformed statement: {message}")]
    Syntax {
        /// Store-reported message.
        message: String,
    },

    /// The store cannot run this kind of command.
    #[error("unsupported command: {message}")]
    Unsupported {
        /// Description of what is unsupported.
        message: String,
    },

    /// Any other store-reported failure.
    #[error("provider error{}: {message}", code.map(|c| format!(" {c}")).unwrap_or_default())]
    Provider {
        /// Native error code, if the store has one.
        code: Option<i32>,
        /// Store-reported message.
        message: String,
    },

    /// A transaction-scoped operation was attempted with no open transaction.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// A transaction was begun while another one is still open.
    #[error("a transaction is already active on this connection")]
    TransactionActive,

    /// The transaction handle does not belong to the open transaction.
    #[error("transaction {given} does not match the active transaction {active}")]
    TransactionMismatch {
        /// Handle offered by the caller.
        given: u64,
        /// Transaction actually open on the connection.
        active: u64,
    },

    /// The store rolled back the open transaction on its own, after an
    /// interrupted statement or an I/O, full-disk or `ON CONFLICT ROLLBACK`
    /// failure. Later statements would run outside any transaction.
    #[error("transaction rolled back by the store: {message}")]
    TransactionAborted {
        /// The statement failure that ended the transaction.
        message: String,
    },

    /// No pooled store became available in time.
    #[error("connection pool exhausted after waiting {waited:?}")]
    PoolExhausted {
        /// How long the checkout waited.
        waited: Duration,
    },
}

impl StoreError {
    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a constraint violation error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }

    /// Creates a malformed statement error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }

    /// Creates an unsupported command error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Creates a provider error without a native code.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            code: None,
            message: message.into(),
        }
    }

    /// Creates an aborted-transaction error from the failure that caused it.
    pub fn transaction_aborted(cause: &StoreError) -> Self {
        Self::TransactionAborted {
            message: cause.to_string(),
        }
    }

    /// Classifies this error as transient or fatal.
    #[must_use]
    pub fn classify(&self) -> FailureClass {
        match self {
            StoreError::Timeout { .. } | StoreError::PoolExhausted { .. } => {
                FailureClass::Transient(TransientKind::Timeout)
            }
            StoreError::Connection { .. } => FailureClass::Transient(TransientKind::Connectivity),
            _ => FailureClass::Fatal,
        }
    }

    /// Returns true if this error can be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.classify().is_transient()
    }

    /// Returns true if this error invalidates a whole batch rather than one row.
    ///
    /// A malformed or unsupported statement fails identically for every row,
    /// and a broken transaction cannot absorb further writes.
    #[must_use]
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::Syntax { .. }
                | StoreError::Unsupported { .. }
                | StoreError::NoActiveTransaction
                | StoreError::TransactionActive
                | StoreError::TransactionMismatch { .. }
                | StoreError::TransactionAborted { .. }
        )
    }
}
