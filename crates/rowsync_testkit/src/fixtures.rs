//! Test fixtures and database helpers.
//!
//! Provides temporary SQLite databases that clean up after themselves and
//! the `Employee` table most tests synchronize against.

use rowsync_core::{ChangeSetSynchronizer, Column, RetryConfig, SyncConfig, TabularSnapshot};
use rowsync_store::{
    Command, DataType, PoolConfig, RelationalStore, SqliteStore, StorePool, Value,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// DDL of the `Employee` fixture table.
pub const EMPLOYEE_DDL: &str = "CREATE TABLE IF NOT EXISTS Employee (\
    Id INTEGER PRIMARY KEY AUTOINCREMENT, \
    Name TEXT NOT NULL UNIQUE, \
    Salary TEXT)";

/// DDL of a table whose key is supplied by the caller.
pub const TAG_DDL: &str = "CREATE TABLE IF NOT EXISTS Tag (\
    Label TEXT PRIMARY KEY, \
    Color TEXT NOT NULL)";

/// Columns of the `Employee` table.
pub fn employee_columns() -> Vec<Column> {
    vec![
        Column::new("Id", DataType::Integer).primary_key().auto_generated(),
        Column::new("Name", DataType::Text).unique(),
        Column::new("Salary", DataType::Decimal),
    ]
}

/// An empty `Employee` snapshot.
pub fn employee_snapshot() -> TabularSnapshot {
    TabularSnapshot::new("Employee", employee_columns())
}

/// Columns of the `Tag` table.
pub fn tag_columns() -> Vec<Column> {
    vec![
        Column::new("Label", DataType::Text).primary_key(),
        Column::new("Color", DataType::Text),
    ]
}

/// An empty `Tag` snapshot.
pub fn tag_snapshot() -> TabularSnapshot {
    TabularSnapshot::new("Tag", tag_columns())
}

/// Synchronizer configuration for tests: no backoff between retries.
pub fn test_config() -> SyncConfig {
    SyncConfig::new().with_retry(RetryConfig::immediate(3))
}

/// A SQLite database file in a temporary directory.
///
/// The directory is removed when the fixture drops.
pub struct TestDatabase {
    /// Temporary directory holding the database file.
    _temp_dir: TempDir,
    path: PathBuf,
}

impl TestDatabase {
    /// Creates a database and runs `ddl` against it.
    pub fn with_schema(ddl: &str) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("rowsync.db");
        let db = Self {
            _temp_dir: temp_dir,
            path,
        };
        db.execute(ddl);
        db
    }

    /// Creates a database holding an empty `Employee` table.
    pub fn employees() -> Self {
        Self::with_schema(EMPLOYEE_DDL)
    }

    /// Creates a database holding an empty `Tag` table.
    pub fn tags() -> Self {
        Self::with_schema(TAG_DDL)
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates an unopened store for the database.
    pub fn store(&self) -> SqliteStore {
        SqliteStore::file(&self.path)
    }

    /// Creates a pool that opens stores on demand.
    pub fn pool(&self, max_size: usize) -> Arc<StorePool<SqliteStore>> {
        let path = self.path.clone();
        let config = PoolConfig::default().with_max_size(max_size);
        Arc::new(StorePool::new(config, move || Ok(SqliteStore::file(&path))))
    }

    /// Creates a synchronizer over a pool of two stores with [`test_config`].
    pub fn synchronizer(&self) -> ChangeSetSynchronizer<SqliteStore> {
        ChangeSetSynchronizer::new(self.pool(2)).with_config(test_config())
    }

    /// Runs a statement batch outside any transaction.
    pub fn execute(&self, sql: &str) {
        let mut store = self.store();
        let mut command = Command::text(sql);
        store
            .execute(&mut command, None)
            .expect("Failed to execute statement");
        store.close().expect("Failed to close store");
    }

    /// Runs a query and returns its rows.
    pub fn query(&self, sql: &str) -> Vec<Vec<Value>> {
        let mut store = self.store();
        let mut command = Command::text(sql);
        let execution = store
            .execute(&mut command, None)
            .expect("Failed to run query");
        store.close().expect("Failed to close store");
        execution.result_set.map(|r| r.rows).unwrap_or_default()
    }

    /// Counts the rows of a table.
    pub fn count(&self, table: &str) -> i64 {
        let mut store = self.store();
        let mut command = Command::text(format!("SELECT COUNT(*) FROM \"{table}\""));
        let count = store
            .execute(&mut command, None)
            .expect("Failed to count rows")
            .scalar::<i64>()
            .present()
            .expect("COUNT(*) returned no value");
        store.close().expect("Failed to close store");
        count
    }

    /// Returns every employee name in ascending order.
    pub fn employee_names(&self) -> Vec<String> {
        self.query("SELECT Name FROM Employee ORDER BY Name")
            .into_iter()
            .filter_map(|row| match row.into_iter().next() {
                Some(Value::Text(name)) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Reads the table into a fresh snapshot through `fill`.
    pub fn reload(&self, mut snapshot: TabularSnapshot) -> TabularSnapshot {
        self.synchronizer()
            .fill(&mut snapshot)
            .expect("Failed to fill snapshot");
        snapshot
    }
}

impl std::fmt::Debug for TestDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestDatabase")
            .field("path", &self.path)
            .finish()
    }
}

/// Runs a test with an `Employee` database.
pub fn with_employee_db<F, R>(f: F) -> R
where
    F: FnOnce(&TestDatabase) -> R,
{
    let db = TestDatabase::employees();
    f(&db)
}

/// Test scenario builders.
pub mod scenarios {
    use super::*;

    /// Inserts the named employees directly and returns a snapshot loaded
    /// from the table.
    pub fn seeded_employees(db: &TestDatabase, names: &[&str]) -> TabularSnapshot {
        for (i, name) in names.iter().enumerate() {
            db.execute(&format!(
                "INSERT INTO Employee (Name, Salary) VALUES ('{}', '{}')",
                name.replace('\'', "''"),
                1000 * (i + 1)
            ));
        }
        db.reload(employee_snapshot())
    }

    /// A snapshot holding one new employee per name.
    pub fn new_employees(names: &[&str]) -> TabularSnapshot {
        let mut snapshot = employee_snapshot();
        for name in names {
            snapshot
                .insert_row([("Name", *name)])
                .expect("Failed to add employee");
        }
        snapshot
    }
}
