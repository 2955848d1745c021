//! Transactional application of a snapshot's pending changes.

mod outcome;
mod rows;

pub use outcome::{SyncOutcome, SyncStats, SynchronizationResult};

use crate::config::SyncConfig;
use crate::diagnostics::DiagnosticHook;
use crate::error::{SyncError, SyncResult};
use crate::executor::CommandExecutor;
use crate::schema::TableSchema;
use crate::snapshot::{Row, RowState, TabularSnapshot};
use crate::statement::{CommandBuilder, CommandSet, Dialect, SqliteDialect, Statement};
use parking_lot::RwLock;
use rowsync_store::{Command, Execution, RelationalStore, StorePool, Transaction, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Commands supplied by the caller instead of derived ones.
#[derive(Debug, Clone, Default)]
struct SuppliedCommands {
    select: Option<Command>,
    insert: Option<Command>,
    update: Option<Command>,
    delete: Option<Command>,
}

/// Per-call working copies of the write templates.
#[derive(Debug, Default)]
struct CallTemplates {
    insert: Option<Command>,
    update: Option<Command>,
    delete: Option<Command>,
}

impl CallTemplates {
    fn for_state(&self, state: RowState) -> Option<&Command> {
        match state {
            RowState::Added => self.insert.as_ref(),
            RowState::Modified => self.update.as_ref(),
            RowState::Deleted => self.delete.as_ref(),
            RowState::Unchanged => None,
        }
    }
}

/// Store executions made during one call.
#[derive(Debug, Default)]
struct Tally {
    statements: u64,
    retries: u64,
}

impl Tally {
    fn statement(&mut self, attempts: u32) {
        self.statements += u64::from(attempts);
        self.retries += u64::from(attempts.saturating_sub(1));
    }

    fn overhead(&mut self, attempts: u32) {
        self.retries += u64::from(attempts.saturating_sub(1));
    }
}

/// Applies the pending changes of a [`TabularSnapshot`] to a relational
/// store inside one transaction, then reconciles the outcome back into the
/// snapshot.
///
/// The synchronizer holds no connection of its own. Every call checks a
/// store out of the pool, so one synchronizer is safely shared between
/// threads and concurrent calls never share a transaction.
///
/// # Example
///
/// ```rust
/// use rowsync_core::{ChangeSetSynchronizer, Column, SynchronizationResult, TabularSnapshot};
/// use rowsync_store::{DataType, SqliteStore, StorePool};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let store = SqliteStore::memory()
///     .with_setup("CREATE TABLE Tag (Label TEXT PRIMARY KEY, Color TEXT)");
/// let sync = ChangeSetSynchronizer::new(Arc::new(StorePool::single(store)))
///     .with_config(rowsync_core::SyncConfig::new().with_keep_connection_open(true));
///
/// let mut tags = TabularSnapshot::new("Tag", vec![
///     Column::new("Label", DataType::Text).primary_key(),
///     Column::new("Color", DataType::Text),
/// ]);
/// tags.insert_row([("Label", "urgent"), ("Color", "red")]).unwrap();
///
/// let outcome = sync.synchronize(&mut tags, true, Duration::from_secs(30));
/// assert_eq!(outcome.result, SynchronizationResult::Success);
/// assert!(!tags.has_changes());
/// ```
pub struct ChangeSetSynchronizer<S> {
    pool: Arc<StorePool<S>>,
    config: SyncConfig,
    dialect: Arc<dyn Dialect>,
    schema: Option<TableSchema>,
    supplied: SuppliedCommands,
    diagnostics: Option<Arc<dyn DiagnosticHook>>,
    stats: RwLock<SyncStats>,
}

impl<S: RelationalStore> ChangeSetSynchronizer<S> {
    /// Creates a synchronizer over `pool` with the SQLite dialect and
    /// default configuration.
    pub fn new(pool: Arc<StorePool<S>>) -> Self {
        Self {
            pool,
            config: SyncConfig::default(),
            dialect: Arc::new(SqliteDialect),
            schema: None,
            supplied: SuppliedCommands::default(),
            diagnostics: None,
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the dialect used to derive commands.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialect = dialect;
        self
    }

    /// Uses an explicit schema instead of the snapshot's column metadata.
    #[must_use]
    pub fn with_schema(mut self, schema: TableSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Supplies the select command used by [`ChangeSetSynchronizer::fill`].
    #[must_use]
    pub fn with_select_command(mut self, command: Command) -> Self {
        self.supplied.select = Some(command);
        self
    }

    /// Supplies the insert template.
    #[must_use]
    pub fn with_insert_command(mut self, command: Command) -> Self {
        self.supplied.insert = Some(command);
        self
    }

    /// Supplies the update template.
    #[must_use]
    pub fn with_update_command(mut self, command: Command) -> Self {
        self.supplied.update = Some(command);
        self
    }

    /// Supplies the delete template.
    #[must_use]
    pub fn with_delete_command(mut self, command: Command) -> Self {
        self.supplied.delete = Some(command);
        self
    }

    /// Reports swallowed failures and retries to `hook`.
    #[must_use]
    pub fn with_diagnostics(mut self, hook: Arc<dyn DiagnosticHook>) -> Self {
        self.diagnostics = Some(hook);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the store pool.
    pub fn pool(&self) -> &Arc<StorePool<S>> {
        &self.pool
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Resets the stats.
    pub fn reset_stats(&self) {
        *self.stats.write() = SyncStats::default();
    }

    /// Synchronizes with the configured failure policy and timeout.
    pub fn synchronize_with_defaults(&self, snapshot: &mut TabularSnapshot) -> SyncOutcome {
        self.synchronize(
            snapshot,
            self.config.rollback_all_on_error,
            self.config.command_timeout,
        )
    }

    /// Applies every pending change of `snapshot` in one transaction.
    ///
    /// Nothing escapes as an error: every failure is folded into the
    /// returned outcome, and failed rows carry their own message.
    ///
    /// - With `rollback_all_on_error`, any row failure rolls the whole
    ///   transaction back, discards the snapshot's pending edits and returns
    ///   `Failed`.
    /// - Without it, applied rows are committed and accepted while failed
    ///   rows stay pending with an error.
    ///
    /// `timeout` applies to each statement; zero means no limit.
    pub fn synchronize(
        &self,
        snapshot: &mut TabularSnapshot,
        rollback_all_on_error: bool,
        timeout: Duration,
    ) -> SyncOutcome {
        let call = Uuid::new_v4();
        let span = tracing::info_span!("synchronize", table = %snapshot.name(), %call);
        let _enter = span.enter();

        let mut tally = Tally::default();
        let mut outcome = self.apply(snapshot, rollback_all_on_error, timeout, &mut tally);
        outcome.statements = tally.statements;
        self.stats.write().record(&outcome, tally.retries);

        if outcome.is_success() {
            tracing::info!(
                applied = outcome.applied,
                statements = outcome.statements,
                "synchronization succeeded"
            );
        } else {
            tracing::warn!(
                result = %outcome.result,
                applied = outcome.applied,
                failed = outcome.failed,
                statements = outcome.statements,
                "synchronization did not fully succeed"
            );
        }
        outcome
    }

    /// Runs the select command and appends every result row as an
    /// `Unchanged` row. Returns the number of rows loaded.
    ///
    /// Result columns map to snapshot columns by name; snapshot columns the
    /// result lacks are NULL.
    ///
    /// # Errors
    ///
    /// Returns the store failure, or a snapshot error if a value does not
    /// fit its column.
    pub fn fill(&self, snapshot: &mut TabularSnapshot) -> SyncResult<usize> {
        let span = tracing::info_span!("fill", table = %snapshot.name());
        let _enter = span.enter();

        let mut select = match &self.supplied.select {
            Some(command) => command.clone(),
            None => Statement::Select {
                table: snapshot.name().to_string(),
                columns: snapshot.columns().iter().map(|c| c.name.clone()).collect(),
            }
            .render(self.dialect.as_ref())?,
        };
        select.timeout = self.config.command_timeout;

        let executor = self.executor();
        let mut store = self.pool.checkout().map_err(|err| SyncError::store(err, 1))?;
        let result = Self::open_and_execute(&executor, &mut store, &mut select);
        self.release(&mut store, snapshot.name());
        let execution = result?;

        let Some(result_set) = execution.result_set else {
            return Ok(0);
        };
        let mapping: Vec<Option<usize>> = snapshot
            .columns()
            .iter()
            .map(|c| result_set.column_index(&c.name))
            .collect();

        let mut loaded = 0;
        for values in result_set.rows {
            let row = mapping
                .iter()
                .map(|m| m.and_then(|i| values.get(i).cloned()).unwrap_or(Value::Null))
                .collect();
            snapshot.load_row(row)?;
            loaded += 1;
        }
        tracing::debug!(loaded, "snapshot filled");
        Ok(loaded)
    }

    /// Returns the commands a synchronization of `snapshot` would use.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the snapshot has no usable key or an
    /// identifier cannot be quoted.
    pub fn derive_commands(&self, snapshot: &TabularSnapshot) -> SyncResult<CommandSet> {
        let schema = self.resolve_schema(snapshot)?;
        let mut set = CommandBuilder::new(&schema, self.dialect.as_ref()).derive_all()?;
        if let Some(command) = &self.supplied.select {
            set.select = command.clone();
        }
        if let Some(command) = &self.supplied.insert {
            set.insert = Some(command.clone());
        }
        if let Some(command) = &self.supplied.update {
            set.update = Some(command.clone());
        }
        if let Some(command) = &self.supplied.delete {
            set.delete = Some(command.clone());
        }
        Ok(set)
    }

    fn apply(
        &self,
        snapshot: &mut TabularSnapshot,
        rollback_all_on_error: bool,
        timeout: Duration,
        tally: &mut Tally,
    ) -> SyncOutcome {
        let schema = match self.resolve_schema(snapshot) {
            Ok(schema) => schema,
            Err(err) => return error_outcome(&err),
        };
        snapshot.clear_errors();

        let changed = snapshot.changed_rows();
        if changed.is_empty() {
            tracing::debug!("no pending changes");
            return SyncOutcome::new(SynchronizationResult::Success);
        }

        let templates = match self.call_templates(&schema, snapshot, &changed, timeout) {
            Ok(templates) => templates,
            Err(err) => return error_outcome(&err),
        };

        let executor = self.executor();
        let mut store = match self.pool.checkout() {
            Ok(store) => store,
            Err(err) => return error_outcome(&SyncError::store(err, 1)),
        };
        let txn = match self.begin(&executor, &mut store, tally) {
            Ok(txn) => txn,
            Err(err) => {
                self.release(&mut store, schema.table());
                return error_outcome(&err);
            }
        };
        tracing::debug!(rows = changed.len(), txn = %txn.id(), "applying changes");

        let mut applied: Vec<(usize, Command)> = Vec::with_capacity(changed.len());
        let mut failed = 0usize;

        for &row in &changed {
            let state = snapshot.row(row).map_or(RowState::Unchanged, Row::state);
            let error = match templates.for_state(state) {
                None => SyncError::unexpected(format!("no command for {state} row {row}")),
                Some(template) => match rows::bind_row(template, snapshot, row) {
                    Err(err) => err,
                    Ok(mut command) => {
                        match executor.execute(&mut *store, &mut command, Some(&txn)) {
                            Ok(executed) => {
                                tally.statement(executed.attempts);
                                if let Some(err) = check_affected(state, &executed.execution) {
                                    err
                                } else {
                                    tracing::debug!(row, %state, "row applied");
                                    applied.push((row, command));
                                    continue;
                                }
                            }
                            Err(err) => {
                                tally.statement(err.attempts().unwrap_or(1));
                                err
                            }
                        }
                    }
                },
            };

            failed += 1;
            let message = format!("{}: {error}", rows::row_label(&schema, snapshot, row));
            // `row` comes from `changed_rows`, and no row has been removed yet.
            let _ = snapshot.set_row_error(row, message);

            if error.is_transient() || error.is_batch_fatal() {
                tracing::warn!(row, %error, "aborting synchronization");
                self.rollback_quietly(&mut store, txn, schema.table());
                self.release(&mut store, schema.table());
                let result = if error.is_transient() {
                    SynchronizationResult::TimedOut
                } else {
                    SynchronizationResult::Failed
                };
                let mut outcome = SyncOutcome::new(result).with_message(messages(snapshot));
                outcome.failed = failed;
                return outcome;
            }
            tracing::warn!(row, %error, "row failed");
        }

        let mut result = if failed == 0 {
            SynchronizationResult::Success
        } else if applied.is_empty() {
            SynchronizationResult::Failed
        } else {
            SynchronizationResult::PartialSuccess
        };

        if rollback_all_on_error && result != SynchronizationResult::Success {
            let message = messages(snapshot);
            self.rollback_quietly(&mut store, txn, schema.table());
            self.release(&mut store, schema.table());
            snapshot.reject_changes();
            let mut outcome = SyncOutcome::new(SynchronizationResult::Failed).with_message(message);
            outcome.failed = failed;
            return outcome;
        }

        if let Err(err) = store.commit(txn) {
            let class = store.classify(&err);
            let err = SyncError::classified(err, class, 1);
            tracing::warn!(%err, "commit failed");
            // The transaction state is unknown; never hand it back open.
            self.close_quietly(&mut store, schema.table());
            let mut outcome = error_outcome(&err);
            outcome.failed = failed;
            let rows = messages(snapshot);
            if !rows.is_empty() {
                outcome.message = format!("{}\n{rows}", outcome.message);
            }
            return outcome;
        }
        self.release(&mut store, schema.table());
        drop(store);

        // The writes are durable now. A value that cannot be merged is
        // reported, but the row is still accepted so it is not applied twice.
        let mut unmerged = Vec::new();
        for (row, command) in &applied {
            if let Err(err) = rows::merge_outputs(snapshot, *row, command) {
                tracing::warn!(row, %err, "merge failed");
                unmerged.push(format!(
                    "{}: generated values could not be merged: {err}",
                    rows::row_label(&schema, snapshot, *row)
                ));
            }
        }
        if result == SynchronizationResult::Success && !unmerged.is_empty() {
            result = SynchronizationResult::PartialSuccess;
        }

        if result != SynchronizationResult::Failed {
            snapshot.accept_successful();
        }

        let mut message = messages(snapshot);
        for line in unmerged {
            if !message.is_empty() {
                message.push('\n');
            }
            message.push_str(&line);
        }
        let mut outcome = SyncOutcome::new(result).with_message(message);
        outcome.applied = applied.len();
        outcome.failed = failed;
        outcome
    }

    fn resolve_schema(&self, snapshot: &TabularSnapshot) -> SyncResult<TableSchema> {
        match &self.schema {
            Some(schema) => {
                schema.check_snapshot(snapshot)?;
                Ok(schema.clone())
            }
            None => TableSchema::from_snapshot(snapshot),
        }
    }

    /// Prepares the templates the changed rows need, before any I/O.
    fn call_templates(
        &self,
        schema: &TableSchema,
        snapshot: &TabularSnapshot,
        changed: &[usize],
        timeout: Duration,
    ) -> SyncResult<CallTemplates> {
        let builder = CommandBuilder::new(schema, self.dialect.as_ref());
        let needs = |state: RowState| {
            changed
                .iter()
                .any(|&i| snapshot.row(i).map(Row::state) == Some(state))
        };

        let select = self.template(
            "select",
            self.supplied.select.as_ref(),
            || builder.select(),
            snapshot,
            timeout,
        )?;
        tracing::debug!(text = %select.text, "select command ready");

        let mut templates = CallTemplates::default();
        if needs(RowState::Added) {
            templates.insert = Some(self.template(
                "insert",
                self.supplied.insert.as_ref(),
                || builder.insert(),
                snapshot,
                timeout,
            )?);
        }
        if needs(RowState::Modified) {
            templates.update = Some(self.template(
                "update",
                self.supplied.update.as_ref(),
                || builder.update(),
                snapshot,
                timeout,
            )?);
        }
        if needs(RowState::Deleted) {
            templates.delete = Some(self.template(
                "delete",
                self.supplied.delete.as_ref(),
                || builder.delete(),
                snapshot,
                timeout,
            )?);
        }
        Ok(templates)
    }

    fn template(
        &self,
        kind: &str,
        supplied: Option<&Command>,
        derive: impl FnOnce() -> SyncResult<Command>,
        snapshot: &TabularSnapshot,
        timeout: Duration,
    ) -> SyncResult<Command> {
        let mut command = match supplied {
            Some(command) => command.clone(),
            None => derive()?,
        };
        rows::check_template(kind, &command, snapshot)?;
        command.timeout = timeout;
        tracing::debug!(kind, text = %command.text, "command template ready");
        Ok(command)
    }

    fn executor(&self) -> CommandExecutor {
        let executor = CommandExecutor::new(self.config.retry.clone());
        match &self.diagnostics {
            Some(hook) => executor.with_diagnostics(Arc::clone(hook)),
            None => executor,
        }
    }

    fn begin(
        &self,
        executor: &CommandExecutor,
        store: &mut S,
        tally: &mut Tally,
    ) -> SyncResult<Transaction> {
        if !store.is_open() {
            let ((), attempts) = executor.run(store, "open", |s| s.open())?;
            tally.overhead(attempts);
        }
        let isolation = self.config.isolation;
        let (txn, attempts) = executor.run(store, "begin", |s| s.begin_transaction(isolation))?;
        tally.overhead(attempts);
        Ok(txn)
    }

    fn open_and_execute(
        executor: &CommandExecutor,
        store: &mut S,
        command: &mut Command,
    ) -> SyncResult<Execution> {
        if !store.is_open() {
            executor.run(store, "open", |s| s.open())?;
        }
        executor.execute(store, command, None).map(|e| e.execution)
    }

    /// Rolls back, closing the connection if that fails. Never escalates.
    fn rollback_quietly(&self, store: &mut S, txn: Transaction, table: &str) {
        if let Err(err) = store.rollback(txn) {
            tracing::warn!(%err, "rollback failed, closing connection");
            if let Some(hook) = &self.diagnostics {
                hook.rollback_failed(table, &err);
            }
            self.close_quietly(store, table);
        }
    }

    fn close_quietly(&self, store: &mut S, table: &str) {
        if let Err(err) = store.close() {
            tracing::warn!(%err, "closing connection failed");
            if let Some(hook) = &self.diagnostics {
                hook.close_failed(table, &err);
            }
        }
    }

    /// Ends a call's use of the store.
    fn release(&self, store: &mut S, table: &str) {
        if !self.config.keep_connection_open {
            self.close_quietly(store, table);
        }
    }
}

impl<S> fmt::Debug for ChangeSetSynchronizer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSetSynchronizer")
            .field("config", &self.config)
            .field("dialect", &self.dialect.name())
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Zero rows affected by a write means the row was not where we expected.
fn check_affected(state: RowState, execution: &Execution) -> Option<SyncError> {
    if execution.rows_affected > 0 {
        return None;
    }
    let operation = match state {
        RowState::Added => "insert",
        RowState::Modified => "update",
        RowState::Deleted => "delete",
        RowState::Unchanged => return None,
    };
    Some(SyncError::Concurrency { operation })
}

fn error_outcome(err: &SyncError) -> SyncOutcome {
    let result = if err.is_transient() {
        SynchronizationResult::TimedOut
    } else {
        SynchronizationResult::Failed
    };
    SyncOutcome::new(result).with_message(err.to_string())
}

fn messages(snapshot: &TabularSnapshot) -> String {
    snapshot
        .errors()
        .map(|(_, message)| message)
        .collect::<Vec<_>>()
        .join("\n")
}
