//! # Rowsync Core
//!
//! Change-tracked snapshots and transactional change-set synchronization.
//!
//! A [`TabularSnapshot`] holds the rows of one table together with their
//! lifecycle state. A [`ChangeSetSynchronizer`] derives parameterized write
//! commands from the table's key, applies every pending row inside one
//! transaction, retries transient store failures, and reconciles the outcome
//! back into the snapshot: generated keys are merged, applied rows are
//! accepted and failed rows keep their pending state with an error message.
//!
//! ## Layers
//!
//! - [`snapshot`] - the change-tracked row model
//! - [`TableSchema`] and [`statement`] - typed statements rendered per
//!   [`statement::Dialect`], every value bound as a parameter
//! - [`CommandExecutor`] - bounded retry of store operations
//! - [`ChangeSetSynchronizer`] - the synchronization algorithm
//!
//! Store access goes through [`rowsync_store::RelationalStore`] and a
//! [`rowsync_store::StorePool`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod diagnostics;
mod error;
mod executor;
mod schema;
pub mod snapshot;
pub mod statement;
mod synchronizer;

pub use config::{RetryConfig, SyncConfig};
pub use diagnostics::DiagnosticHook;
pub use error::{ErrorKind, SyncError, SyncResult};
pub use executor::{CommandExecutor, Executed};
pub use schema::TableSchema;
pub use snapshot::{Column, Row, RowState, SnapshotError, SnapshotResult, TabularSnapshot};
pub use statement::{CommandBuilder, CommandSet, Dialect, SqlServerDialect, SqliteDialect};
pub use synchronizer::{ChangeSetSynchronizer, SyncOutcome, SyncStats, SynchronizationResult};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Store types callers need alongside the synchronizer.
pub use rowsync_store::{
    Command, DataType, Decimal, IsolationLevel, Parameter, ParameterDirection, SourceVersion,
    StoreError, Value,
};
