//! # Rowsync Store
//!
//! Relational store abstraction for rowsync.
//!
//! This crate is the lowest layer: it knows how to open a connection, run a
//! parameterized command inside a transaction and report what happened. It
//! knows nothing about snapshots or row states.
//!
//! ## Design Principles
//!
//! - Every value reaches the store as a bound parameter
//! - Failures are classified as transient or fatal by the store that saw them
//! - Scalar reads are typed; NULL, no rows and type mismatch stay distinct
//! - One connection per store; share through a [`StorePool`]
//!
//! ## Available Stores
//!
//! - [`SqliteStore`] - SQLite file or in-memory database via `rusqlite`
//!
//! ## Example
//!
//! ```rust
//! use rowsync_store::{Command, DataType, Parameter, RelationalStore, Scalar, SqliteStore};
//!
//! let mut store = SqliteStore::memory().with_setup("CREATE TABLE t (name TEXT)");
//! let mut insert = Command::text("INSERT INTO t (name) VALUES (:p1)")
//!     .with_parameter(Parameter::input(":p1", DataType::Text).with_value("Ada"));
//! store.execute(&mut insert, None).unwrap();
//!
//! let mut count = Command::text("SELECT COUNT(*) FROM t");
//! let n = store.execute(&mut count, None).unwrap().scalar::<i64>();
//! assert_eq!(n, Scalar::Present(1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod error;
mod execution;
mod pool;
mod sqlite;
mod store;
mod value;

pub use command::{
    Command, CommandKind, Parameter, ParameterDirection, SourceVersion, DEFAULT_COMMAND_TIMEOUT,
};
pub use error::{FailureClass, StoreError, StoreResult, TransientKind};
pub use execution::{Execution, ResultSet, Scalar};
pub use pool::{PoolConfig, PooledStore, StoreFactory, StorePool};
pub use sqlite::{SqliteStore, SqliteTarget};
pub use store::{IsolationLevel, RelationalStore, Transaction, TransactionId};
pub use value::{DataType, FromValue, Value, ValueError};

/// Re-exported so callers can build decimal values without a direct dependency.
pub use rust_decimal::Decimal;
