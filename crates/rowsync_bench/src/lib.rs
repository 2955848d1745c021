//! Benchmark utilities.

#![warn(missing_docs)]

use rowsync_core::{ChangeSetSynchronizer, Column, RetryConfig, SyncConfig, TabularSnapshot};
use rowsync_store::{
    Command, DataType, Decimal, RelationalStore, SqliteStore, StorePool, Value,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// DDL of the benchmark table.
pub const BENCH_DDL: &str = "CREATE TABLE IF NOT EXISTS Employee (\
    Id INTEGER PRIMARY KEY AUTOINCREMENT, \
    Name TEXT NOT NULL UNIQUE, \
    Salary TEXT)";

/// Columns of the benchmark table.
pub fn columns() -> Vec<Column> {
    vec![
        Column::new("Id", DataType::Integer).primary_key().auto_generated(),
        Column::new("Name", DataType::Text).unique(),
        Column::new("Salary", DataType::Decimal),
    ]
}

/// A snapshot of `count` new rows with names unique under `prefix`.
pub fn added_rows(prefix: &str, count: usize) -> TabularSnapshot {
    let mut snapshot = TabularSnapshot::new("Employee", columns());
    for i in 0..count {
        snapshot
            .insert_row([
                ("Name", Value::Text(format!("{prefix}-{i}"))),
                ("Salary", Value::Decimal(Decimal::new(i as i64 * 100 + 99, 2))),
            ])
            .expect("bench row fits the columns");
    }
    snapshot
}

/// A database file in a temporary directory.
pub struct BenchDatabase {
    _dir: TempDir,
    path: PathBuf,
}

impl BenchDatabase {
    /// Creates the database and its table.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bench.db");
        let mut store = SqliteStore::file(&path).with_setup(BENCH_DDL);
        store.open().expect("open bench database");
        store.close().expect("close bench database");
        Self { _dir: dir, path }
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A synchronizer that keeps its single connection open between calls.
    pub fn synchronizer(&self) -> ChangeSetSynchronizer<SqliteStore> {
        let pool = Arc::new(StorePool::single(SqliteStore::file(&self.path)));
        ChangeSetSynchronizer::new(pool).with_config(
            SyncConfig::new()
                .with_retry(RetryConfig::no_retry())
                .with_keep_connection_open(true),
        )
    }

    /// Deletes every row.
    pub fn clear(&self) {
        let mut store = SqliteStore::file(&self.path);
        store
            .execute(&mut Command::text("DELETE FROM Employee"), None)
            .expect("clear bench table");
        store.close().expect("close bench database");
    }
}

impl Default for BenchDatabase {
    fn default() -> Self {
        Self::new()
    }
}
