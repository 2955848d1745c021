//! SQLite store backed by `rusqlite`.

use crate::command::{Command, CommandKind};
use crate::error::{StoreError, StoreResult};
use crate::execution::{Execution, ResultSet};
use crate::store::{IsolationLevel, RelationalStore, Transaction, TransactionId};
use crate::value::Value;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Busy timeout used when a command asks for no limit.
const UNLIMITED_BUSY_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

/// Number of virtual machine steps between deadline checks.
const PROGRESS_STEPS: i32 = 1000;

/// Where a [`SqliteStore`] keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    /// A database file, created if missing.
    File(PathBuf),
    /// A private in-memory database. Its contents are lost on close.
    Memory,
}

/// A relational store over one SQLite connection.
///
/// The connection is opened lazily on first use and can be closed and
/// reopened; statements in `setup` run after every open (pragmas, or the
/// schema of an in-memory database).
///
/// # Example
///
/// ```rust
/// use rowsync_store::{Command, RelationalStore, SqliteStore};
///
/// let mut store = SqliteStore::memory().with_setup("CREATE TABLE t (x INTEGER)");
/// let mut cmd = Command::text("INSERT INTO t (x) VALUES (1)");
/// let execution = store.execute(&mut cmd, None).unwrap();
/// assert_eq!(execution.rows_affected, 1);
/// ```
#[derive(Debug)]
pub struct SqliteStore {
    target: SqliteTarget,
    setup: Vec<String>,
    conn: Option<Connection>,
    active: Option<TransactionId>,
    /// A transaction SQLite rolled back by itself; its handle is still out.
    aborted: Option<TransactionId>,
    next_txid: u64,
}

impl SqliteStore {
    /// Creates a store for a database file. Nothing is opened yet.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(SqliteTarget::File(path.as_ref().to_path_buf()))
    }

    /// Creates a store for a private in-memory database.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(SqliteTarget::Memory)
    }

    /// Creates a store for the given target.
    #[must_use]
    pub fn new(target: SqliteTarget) -> Self {
        Self {
            target,
            setup: vec!["PRAGMA foreign_keys = ON".to_string()],
            conn: None,
            active: None,
            aborted: None,
            next_txid: 1,
        }
    }

    /// Adds a statement batch to run after every open.
    #[must_use]
    pub fn with_setup(mut self, sql: impl Into<String>) -> Self {
        self.setup.push(sql.into());
        self
    }

    /// Returns the target.
    #[must_use]
    pub fn target(&self) -> &SqliteTarget {
        &self.target
    }

    /// Returns the open transaction, if any.
    #[must_use]
    pub fn active_transaction(&self) -> Option<TransactionId> {
        self.active
    }

    fn connection(&mut self) -> StoreResult<&Connection> {
        self.open()?;
        self.conn
            .as_ref()
            .ok_or_else(|| StoreError::connection("connection is not open"))
    }

    fn check_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        match self.active {
            None if self.aborted == Some(transaction.id()) => {
                Err(StoreError::TransactionAborted {
                    message: "a statement failure ended the transaction".to_string(),
                })
            }
            None => Err(StoreError::NoActiveTransaction),
            Some(active) if active != transaction.id() => Err(StoreError::TransactionMismatch {
                given: transaction.id().as_u64(),
                active: active.as_u64(),
            }),
            Some(_) => Ok(()),
        }
    }

    /// Ends the transaction bookkeeping once SQLite is back in autocommit mode.
    fn finish_transaction(&mut self, sql: &str) -> StoreResult<()> {
        let conn = self.conn.as_ref().ok_or(StoreError::NoActiveTransaction)?;
        let result = conn.execute_batch(sql).map_err(map_error);
        if result.is_ok() || conn.is_autocommit() {
            self.active = None;
        }
        result
    }
}

impl RelationalStore for SqliteStore {
    fn open(&mut self) -> StoreResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let conn = match &self.target {
            SqliteTarget::File(path) => Connection::open(path),
            SqliteTarget::Memory => Connection::open_in_memory(),
        }
        .map_err(|e| StoreError::connection(e.to_string()))?;

        for sql in &self.setup {
            conn.execute_batch(sql).map_err(map_error)?;
        }

        tracing::debug!(target = ?self.target, "opened sqlite connection");
        self.conn = Some(conn);
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        self.active = None;
        self.aborted = None;
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| map_error(e))?;
            tracing::debug!(target = ?self.target, "closed sqlite connection");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn begin_transaction(&mut self, isolation: IsolationLevel) -> StoreResult<Transaction> {
        if self.active.is_some() {
            return Err(StoreError::TransactionActive);
        }

        // SQLite transactions are always serializable; IMMEDIATE takes the
        // write lock up front instead of at the first write.
        let sql = match isolation {
            IsolationLevel::Serializable => "BEGIN IMMEDIATE",
            _ => "BEGIN DEFERRED",
        };
        self.connection()?.execute_batch(sql).map_err(map_error)?;

        let id = TransactionId::new(self.next_txid);
        self.next_txid += 1;
        self.active = Some(id);
        self.aborted = None;
        Ok(Transaction::new(id, isolation))
    }

    fn commit(&mut self, transaction: Transaction) -> StoreResult<()> {
        let checked = self.check_transaction(&transaction);
        if matches!(checked, Err(StoreError::TransactionAborted { .. })) {
            self.aborted = None;
        }
        checked?;
        self.finish_transaction("COMMIT")
    }

    fn rollback(&mut self, transaction: Transaction) -> StoreResult<()> {
        if self.active.is_none() && self.aborted == Some(transaction.id()) {
            // SQLite already discarded the work.
            self.aborted = None;
            return Ok(());
        }
        self.check_transaction(&transaction)?;
        self.finish_transaction("ROLLBACK")
    }

    fn execute(
        &mut self,
        command: &mut Command,
        transaction: Option<&Transaction>,
    ) -> StoreResult<Execution> {
        match transaction {
            Some(txn) => self.check_transaction(txn)?,
            None if self.active.is_some() => return Err(StoreError::TransactionActive),
            None => {}
        }
        if command.kind == CommandKind::StoredProcedure {
            return Err(StoreError::unsupported(format!(
                "sqlite has no stored procedures: {}",
                command.text
            )));
        }

        let conn = self.connection()?;
        install_timeout(conn, command.timeout)?;
        let result = run_statements(conn, command);
        conn.progress_handler(0, None::<fn() -> bool>);
        let autocommit = conn.is_autocommit();

        let execution = match result {
            Ok(execution) => execution,
            Err(err) => match self.active {
                Some(id) if autocommit => {
                    tracing::warn!(txn = %id, error = %err, "sqlite rolled back the transaction");
                    self.active = None;
                    self.aborted = Some(id);
                    return Err(StoreError::transaction_aborted(&err));
                }
                _ => return Err(err),
            },
        };
        execution.assign_outputs(command);
        Ok(execution)
    }
}

fn install_timeout(conn: &Connection, timeout: Duration) -> StoreResult<()> {
    if timeout.is_zero() {
        conn.busy_timeout(UNLIMITED_BUSY_TIMEOUT).map_err(map_error)?;
        conn.progress_handler(0, None::<fn() -> bool>);
    } else {
        conn.busy_timeout(timeout.min(UNLIMITED_BUSY_TIMEOUT))
            .map_err(map_error)?;
        let deadline = Instant::now() + timeout;
        conn.progress_handler(PROGRESS_STEPS, Some(move || Instant::now() > deadline));
    }
    Ok(())
}

fn run_statements(conn: &Connection, command: &Command) -> StoreResult<Execution> {
    let statements = split_statements(&command.text);
    if statements.is_empty() {
        return Err(StoreError::syntax("command text is empty"));
    }

    let mut execution = Execution::default();
    for sql in statements {
        let mut stmt = conn.prepare(sql).map_err(map_error)?;

        for param in command.parameters.iter().filter(|p| p.direction.is_input()) {
            if let Some(index) = stmt.parameter_index(&param.name).map_err(map_error)? {
                stmt.raw_bind_parameter(index, to_sql(&param.value))
                    .map_err(map_error)?;
            }
        }

        if stmt.column_count() == 0 {
            let changed = stmt.raw_execute().map_err(map_error)?;
            execution.rows_affected += changed as u64;
            continue;
        }

        let writes = !stmt.readonly();
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut result = ResultSet::new(columns);
        {
            let mut rows = stmt.raw_query();
            while let Some(row) = rows.next().map_err(map_error)? {
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    let value: SqlValue = row.get(i).map_err(map_error)?;
                    values.push(from_sql(value));
                }
                result.rows.push(values);
            }
        }
        if writes {
            // INSERT ... RETURNING and friends
            execution.rows_affected += conn.changes() as u64;
        }
        execution.result_set = Some(result);
    }

    Ok(execution)
}

/// Splits command text on `;` outside quoted identifiers and literals.
fn split_statements(text: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut closing: Option<char> = None;

    for (i, c) in text.char_indices() {
        if let Some(close) = closing {
            if c == close {
                closing = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => closing = Some(c),
            '[' => closing = Some(']'),
            ';' if !in_trigger_body(&text[start..i]) => {
                statements.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    statements.push(&text[start..]);

    statements
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// True while `fragment` is a `CREATE TRIGGER` whose body has not reached `END`.
fn in_trigger_body(fragment: &str) -> bool {
    let is_trigger = fragment
        .split_whitespace()
        .take(3)
        .any(|word| word.eq_ignore_ascii_case("TRIGGER"));
    if !is_trigger {
        return false;
    }
    let tail = fragment.trim_end();
    let ends = tail.len() >= 3
        && tail.is_char_boundary(tail.len() - 3)
        && tail[tail.len() - 3..].eq_ignore_ascii_case("END")
        && !tail[..tail.len() - 3]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
    !ends
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Decimal(d) => SqlValue::Text(d.to_string()),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
    }
}

fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Integer(i),
        SqlValue::Real(r) => Value::Real(r),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(b) => Value::Bytes(b),
    }
}

/// Maps a `rusqlite` error onto the store taxonomy.
fn map_error(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::InvalidParameterName(name) => {
            return StoreError::syntax(format!("invalid parameter name {name}"));
        }
        rusqlite::Error::MultipleStatement => {
            return StoreError::syntax("multiple statements in one fragment");
        }
        _ => {}
    }

    // Prepare failures arrive as SqlInputError, execution failures as
    // SqliteFailure; both carry the sqlite result code.
    let Some(failure) = err.sqlite_error().copied() else {
        return StoreError::provider(err.to_string());
    };
    let message = match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message,
        other => other.to_string(),
    };
    match failure.code {
        ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::OperationInterrupted => {
            StoreError::timeout(message)
        }
        ErrorCode::CannotOpen => StoreError::connection(message),
        ErrorCode::ConstraintViolation => StoreError::constraint(message),
        // SQLITE_ERROR: syntax errors, unknown tables and columns
        ErrorCode::Unknown => StoreError::syntax(message),
        _ => StoreError::Provider {
            code: Some(failure.extended_code),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Parameter, ParameterDirection};
    use crate::execution::Scalar;
    use crate::value::DataType;

    const DDL: &str = "CREATE TABLE Employee (
        Id INTEGER PRIMARY KEY AUTOINCREMENT,
        Name TEXT NOT NULL UNIQUE,
        Salary TEXT
    )";

    fn store() -> SqliteStore {
        SqliteStore::memory().with_setup(DDL)
    }

    fn insert(name: &str) -> Command {
        Command::text("INSERT INTO Employee (Name) VALUES (:p1); SELECT last_insert_rowid()")
            .with_parameter(Parameter::input(":p1", DataType::Text).with_value(name))
            .with_parameter(Parameter::output(":p2", DataType::Integer))
    }

    fn count(store: &mut SqliteStore) -> i64 {
        let mut cmd = Command::text("SELECT COUNT(*) FROM Employee");
        store
            .execute(&mut cmd, None)
            .unwrap()
            .scalar::<i64>()
            .present()
            .unwrap()
    }

    #[test]
    fn opens_lazily_and_closes_idempotently() {
        let mut store = store();
        assert!(!store.is_open());
        assert_eq!(count(&mut store), 0);
        assert!(store.is_open());

        store.close().unwrap();
        store.close().unwrap();
        assert!(!store.is_open());
    }

    #[test]
    fn insert_assigns_identity_to_output() {
        let mut store = store();

        let mut first = insert("Ada");
        let execution = store.execute(&mut first, None).unwrap();
        assert_eq!(execution.rows_affected, 1);
        assert_eq!(first.parameter(":p2").unwrap().value, Value::Integer(1));

        let mut second = insert("Grace");
        store.execute(&mut second, None).unwrap();
        assert_eq!(second.parameter(":p2").unwrap().value, Value::Integer(2));
    }

    #[test]
    fn return_value_receives_rows_affected() {
        let mut store = store();
        store.execute(&mut insert("Ada"), None).unwrap();
        store.execute(&mut insert("Grace"), None).unwrap();

        let mut cmd = Command::text("UPDATE Employee SET Salary = :p1").with_parameter(
            Parameter::input(":rv", DataType::Integer)
                .with_direction(ParameterDirection::ReturnValue),
        );
        let execution = store.execute(&mut cmd, None).unwrap();
        assert_eq!(execution.rows_affected, 2);
        assert_eq!(cmd.parameter(":rv").unwrap().value, Value::Integer(2));
    }

    #[test]
    fn constraint_violation_is_classified() {
        let mut store = store();
        store.execute(&mut insert("Ada"), None).unwrap();

        let err = store.execute(&mut insert("Ada"), None).unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }), "{err:?}");
        assert!(!err.is_transient());
        assert!(!err.is_batch_fatal());
    }

    #[test]
    fn malformed_statement_is_batch_fatal() {
        let mut store = store();
        let mut cmd = Command::text("INSERT INTO Missing (x) VALUES (1)");
        let err = store.execute(&mut cmd, None).unwrap_err();
        assert!(matches!(err, StoreError::Syntax { .. }), "{err:?}");
        assert!(err.is_batch_fatal());
    }

    #[test]
    fn stored_procedures_are_unsupported() {
        let mut store = store();
        let err = store
            .execute(&mut Command::procedure("usp_anything"), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::Unsupported { .. }));
    }

    #[test]
    fn rollback_discards_writes() {
        let mut store = store();
        let txn = store.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
        store.execute(&mut insert("Ada"), Some(&txn)).unwrap();
        store.rollback(txn).unwrap();

        assert_eq!(store.active_transaction(), None);
        assert_eq!(count(&mut store), 0);
    }

    #[test]
    fn commit_keeps_writes() {
        let mut store = store();
        let txn = store.begin_transaction(IsolationLevel::Serializable).unwrap();
        store.execute(&mut insert("Ada"), Some(&txn)).unwrap();
        store.commit(txn).unwrap();
        assert_eq!(count(&mut store), 1);
    }

    #[test]
    fn one_transaction_at_a_time() {
        let mut store = store();
        let txn = store.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
        assert_eq!(
            store.begin_transaction(IsolationLevel::ReadCommitted),
            Err(StoreError::TransactionActive)
        );
        // Commands must enlist in the open transaction.
        assert_eq!(
            store.execute(&mut insert("Ada"), None),
            Err(StoreError::TransactionActive)
        );

        let stale = Transaction::new(TransactionId::new(99), IsolationLevel::ReadCommitted);
        assert!(matches!(
            store.execute(&mut insert("Ada"), Some(&stale)),
            Err(StoreError::TransactionMismatch { given: 99, .. })
        ));
        store.commit(txn).unwrap();
    }

    #[test]
    fn closing_discards_open_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.sqlite");
        let mut store = SqliteStore::file(&path).with_setup(
            "CREATE TABLE IF NOT EXISTS Employee (Id INTEGER PRIMARY KEY, Name TEXT)",
        );

        let txn = store.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
        let mut cmd = Command::text("INSERT INTO Employee (Name) VALUES ('Ada')");
        store.execute(&mut cmd, Some(&txn)).unwrap();
        store.close().unwrap();

        let mut cmd = Command::text("SELECT COUNT(*) FROM Employee");
        let n = store.execute(&mut cmd, None).unwrap().scalar::<i64>();
        assert_eq!(n, Scalar::Present(0));
    }

    #[test]
    fn lock_wait_times_out_as_transient() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.sqlite");
        let ddl = "CREATE TABLE IF NOT EXISTS Employee (Id INTEGER PRIMARY KEY, Name TEXT)";

        let mut holder = SqliteStore::file(&path).with_setup(ddl);
        let txn = holder.begin_transaction(IsolationLevel::Serializable).unwrap();

        let mut waiter = SqliteStore::file(&path).with_setup(ddl);
        let mut cmd = Command::text("INSERT INTO Employee (Name) VALUES ('Ada')")
            .with_timeout(Duration::from_millis(50));
        let err = waiter.execute(&mut cmd, None).unwrap_err();
        assert!(err.is_transient(), "{err:?}");

        holder.rollback(txn).unwrap();
        waiter.execute(&mut cmd, None).unwrap();
    }

    #[test]
    fn query_returns_result_set() {
        let mut store = store();
        store.execute(&mut insert("Ada"), None).unwrap();

        let mut cmd = Command::text("SELECT Id, Name, Salary FROM Employee");
        let execution = store.execute(&mut cmd, None).unwrap();
        let rs = execution.result_set.unwrap();
        assert_eq!(rs.columns, vec!["Id", "Name", "Salary"]);
        assert_eq!(
            rs.rows,
            vec![vec![Value::Integer(1), Value::Text("Ada".into()), Value::Null]]
        );
    }

    #[test]
    fn decimals_round_trip_as_text() {
        let mut store = store();
        let mut cmd = Command::text("INSERT INTO Employee (Name, Salary) VALUES ('Ada', :p1)")
            .with_parameter(
                Parameter::input(":p1", DataType::Decimal)
                    .with_value(rust_decimal::Decimal::new(5000050, 2)),
            );
        store.execute(&mut cmd, None).unwrap();

        let mut cmd = Command::text("SELECT Salary FROM Employee");
        let salary = store.execute(&mut cmd, None).unwrap().scalar::<rust_decimal::Decimal>();
        assert_eq!(salary, Scalar::Present(rust_decimal::Decimal::new(5000050, 2)));
    }

    #[test]
    fn split_honours_quotes() {
        assert_eq!(
            split_statements("INSERT INTO \"a;b\" VALUES ('x;y'); SELECT 1;"),
            vec!["INSERT INTO \"a;b\" VALUES ('x;y')", "SELECT 1"]
        );
        assert_eq!(split_statements("SELECT [x;y] FROM t"), vec!["SELECT [x;y] FROM t"]);
        assert_eq!(split_statements("SELECT 'it''s'; "), vec!["SELECT 'it''s'"]);
        assert!(split_statements(" ; ;").is_empty());
        assert_eq!(
            split_statements(
                "CREATE TRIGGER t AFTER INSERT ON a BEGIN SELECT 1; SELECT 2; END; SELECT 3"
            ),
            vec![
                "CREATE TRIGGER t AFTER INSERT ON a BEGIN SELECT 1; SELECT 2; END",
                "SELECT 3"
            ]
        );
        assert_eq!(
            split_statements("CREATE TEMP TRIGGER t AFTER DELETE ON a BEGIN DELETE FROM backend; END"),
            vec!["CREATE TEMP TRIGGER t AFTER DELETE ON a BEGIN DELETE FROM backend; END"]
        );
    }

    /// A write that scans a billion-row cross join, so any deadline interrupts it.
    const SLOW_INSERT: &str = "INSERT INTO Employee (Name) \
        SELECT 'bulk' || COUNT(*) FROM Filler a, Filler b, Filler c";

    fn store_with_filler() -> SqliteStore {
        store().with_setup(
            "CREATE TABLE Filler (n INTEGER);
             WITH RECURSIVE c(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM c WHERE n < 1000)
             INSERT INTO Filler SELECT n FROM c",
        )
    }

    #[test]
    fn interrupted_write_ends_the_transaction() {
        let mut store = store_with_filler();
        let txn = store.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
        store.execute(&mut insert("Ada"), Some(&txn)).unwrap();

        let mut slow = Command::text(SLOW_INSERT).with_timeout(Duration::from_millis(5));
        let err = store.execute(&mut slow, Some(&txn)).unwrap_err();
        assert!(matches!(err, StoreError::TransactionAborted { .. }), "{err}");
        assert!(!err.is_transient());
        assert!(err.is_batch_fatal());
        assert_eq!(store.active_transaction(), None);

        // Nothing more runs under the dead handle, in or out of autocommit.
        let err = store.execute(&mut insert("Grace"), Some(&txn)).unwrap_err();
        assert!(matches!(err, StoreError::TransactionAborted { .. }), "{err}");

        store.rollback(txn).unwrap();
        assert_eq!(count(&mut store), 0);
    }

    #[test]
    fn commit_of_an_aborted_transaction_fails() {
        let mut store = store_with_filler();
        let txn = store.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
        store.execute(&mut insert("Ada"), Some(&txn)).unwrap();
        let mut slow = Command::text(SLOW_INSERT).with_timeout(Duration::from_millis(5));
        store.execute(&mut slow, Some(&txn)).unwrap_err();

        let err = store.commit(txn).unwrap_err();
        assert!(matches!(err, StoreError::TransactionAborted { .. }), "{err}");
        assert_eq!(count(&mut store), 0);

        // The connection is usable for a new transaction.
        let txn = store.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
        store.execute(&mut insert("Grace"), Some(&txn)).unwrap();
        store.commit(txn).unwrap();
        assert_eq!(count(&mut store), 1);
    }

    #[test]
    fn row_failure_keeps_the_transaction() {
        let mut store = store();
        let txn = store.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
        store.execute(&mut insert("Ada"), Some(&txn)).unwrap();
        let err = store.execute(&mut insert("Ada"), Some(&txn)).unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }), "{err}");
        assert!(store.active_transaction().is_some());
        store.commit(txn).unwrap();
        assert_eq!(count(&mut store), 1);
    }

    #[test]
    fn empty_command_is_malformed() {
        let mut store = store();
        let err = store.execute(&mut Command::text("  "), None).unwrap_err();
        assert!(err.is_batch_fatal());
    }
}
