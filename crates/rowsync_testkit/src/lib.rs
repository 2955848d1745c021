//! # Rowsync Testkit
//!
//! Test utilities for rowsync.
//!
//! This crate provides:
//! - Temporary SQLite databases and the `Employee` fixture table
//! - A fault-injecting store wrapper for retry and rollback paths
//! - Property-based test generators using proptest
//!
//! The cross-crate integration tests live in this crate's `tests/`
//! directory.
//!
//! ## Usage
//!
//! ```rust
//! use rowsync_testkit::prelude::*;
//!
//! let db = TestDatabase::employees();
//! let sync = db.synchronizer();
//!
//! let mut employees = employee_snapshot();
//! employees.insert_row([("Name", "Ada")]).unwrap();
//! assert!(sync.synchronize_with_defaults(&mut employees).is_success());
//! assert_eq!(db.count("Employee"), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
