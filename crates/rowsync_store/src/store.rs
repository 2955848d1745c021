//! Relational store trait definition.

use crate::command::Command;
use crate::error::{FailureClass, StoreError, StoreResult};
use crate::execution::Execution;
use std::fmt;

/// Isolation level requested when a transaction begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Dirty reads allowed.
    ReadUncommitted,
    /// Only committed data is visible.
    #[default]
    ReadCommitted,
    /// Rows read stay stable for the transaction.
    RepeatableRead,
    /// Full serializability.
    Serializable,
}

/// Unique identifier for a transaction on one store.
///
/// Transaction IDs are monotonically increasing per store and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// A handle to the transaction open on a store.
///
/// The handle is consumed by [`RelationalStore::commit`] or
/// [`RelationalStore::rollback`], so it cannot outlive its transaction.
#[derive(Debug, PartialEq, Eq)]
pub struct Transaction {
    id: TransactionId,
    isolation: IsolationLevel,
}

impl Transaction {
    /// Creates a handle. Called by store implementations.
    #[must_use]
    pub const fn new(id: TransactionId, isolation: IsolationLevel) -> Self {
        Self { id, isolation }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub const fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the isolation level the transaction was begun with.
    #[must_use]
    pub const fn isolation(&self) -> IsolationLevel {
        self.isolation
    }
}

/// A connection to a relational store.
///
/// A store owns exactly one physical connection. All methods take
/// `&mut self`, so one logical operation runs against the connection at a
/// time; share stores between threads through a [`crate::StorePool`].
///
/// # Invariants
///
/// - The connection opens lazily on first use; `open` is optional
/// - `close` is idempotent and discards any open transaction
/// - At most one transaction is open at a time
/// - `execute` writes store-assigned values into the command's output
///   parameters: the k-th Out/InOut parameter receives column k of the
///   first row of the final result set, and ReturnValue parameters receive
///   the rows affected
///
/// # Implementors
///
/// - [`crate::SqliteStore`] - SQLite through `rusqlite`
pub trait RelationalStore: Send {
    /// Opens the connection if it is not already open.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the connection cannot be made.
    fn open(&mut self) -> StoreResult<()>;

    /// Closes the connection. Closing a closed store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the store reports a failure while closing.
    fn close(&mut self) -> StoreResult<()>;

    /// Returns true if the connection is open.
    fn is_open(&self) -> bool;

    /// Begins a transaction, opening the connection first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TransactionActive`] if one is already open.
    fn begin_transaction(&mut self, isolation: IsolationLevel) -> StoreResult<Transaction>;

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle does not match the open transaction
    /// or the store rejects the commit.
    fn commit(&mut self, transaction: Transaction) -> StoreResult<()>;

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle does not match the open transaction
    /// or the store fails to roll back.
    fn rollback(&mut self, transaction: Transaction) -> StoreResult<()>;

    /// Executes one command, enlisted in `transaction` if given.
    ///
    /// # Errors
    ///
    /// Returns the store failure; use [`RelationalStore::classify`] to decide
    /// whether it is worth retrying.
    fn execute(
        &mut self,
        command: &mut Command,
        transaction: Option<&Transaction>,
    ) -> StoreResult<Execution>;

    /// Classifies a failure reported by this store.
    fn classify(&self, error: &StoreError) -> FailureClass {
        error.classify()
    }
}

impl<S: RelationalStore + ?Sized> RelationalStore for Box<S> {
    fn open(&mut self) -> StoreResult<()> {
        (**self).open()
    }

    fn close(&mut self) -> StoreResult<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn begin_transaction(&mut self, isolation: IsolationLevel) -> StoreResult<Transaction> {
        (**self).begin_transaction(isolation)
    }

    fn commit(&mut self, transaction: Transaction) -> StoreResult<()> {
        (**self).commit(transaction)
    }

    fn rollback(&mut self, transaction: Transaction) -> StoreResult<()> {
        (**self).rollback(transaction)
    }

    fn execute(
        &mut self,
        command: &mut Command,
        transaction: Option<&Transaction>,
    ) -> StoreResult<Execution> {
        (**self).execute(command, transaction)
    }

    fn classify(&self, error: &StoreError) -> FailureClass {
        (**self).classify(error)
    }
}
