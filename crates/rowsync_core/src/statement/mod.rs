//! Typed statements rendered into parameterized commands.
//!
//! A [`Statement`] names columns and where their values come from; it never
//! carries values. Rendering quotes every identifier through a [`Dialect`]
//! and turns every value position into a parameter bound to a source column,
//! so row data can only ever reach the store as a bound parameter.

mod builder;
mod dialect;

pub use builder::{CommandBuilder, CommandSet};
pub use dialect::{dialect_by_name, validate_identifier, Dialect, SqlServerDialect, SqliteDialect};

use crate::error::{SyncError, SyncResult};
use crate::snapshot::Column;
use rowsync_store::{Command, DataType, Parameter, SourceVersion};

/// A value position in a statement, bound to a column of the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Source column name.
    pub column: String,
    /// Column type.
    pub data_type: DataType,
    /// Which version of the row supplies the value.
    pub version: SourceVersion,
}

impl Binding {
    /// Binds the current value of a column.
    pub fn current(column: &Column) -> Self {
        Self {
            column: column.name.clone(),
            data_type: column.data_type,
            version: SourceVersion::Current,
        }
    }

    /// Binds the original value of a column.
    pub fn original(column: &Column) -> Self {
        Self {
            version: SourceVersion::Original,
            ..Self::current(column)
        }
    }
}

/// A single-table statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `SELECT columns FROM table`.
    Select {
        /// Table name.
        table: String,
        /// Selected columns.
        columns: Vec<String>,
    },
    /// `INSERT INTO table (..) VALUES (..)`, optionally followed by a fetch
    /// of the generated key.
    Insert {
        /// Table name.
        table: String,
        /// Supplied columns; empty inserts `DEFAULT VALUES`.
        values: Vec<Binding>,
        /// Column that receives the generated key.
        generated: Option<Binding>,
    },
    /// `UPDATE table SET .. WHERE key = original`.
    Update {
        /// Table name.
        table: String,
        /// Assigned columns.
        set: Vec<Binding>,
        /// Key columns matched against original values.
        key: Vec<Binding>,
    },
    /// `DELETE FROM table WHERE key = original`.
    Delete {
        /// Table name.
        table: String,
        /// Key columns matched against original values.
        key: Vec<Binding>,
    },
}

impl Statement {
    /// Returns the lowercase statement kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select { .. } => "select",
            Statement::Insert { .. } => "insert",
            Statement::Update { .. } => "update",
            Statement::Delete { .. } => "delete",
        }
    }

    /// Renders the statement into a command for `dialect`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an identifier the dialect cannot
    /// quote, an update with nothing to assign, or a keyless update or
    /// delete.
    pub fn render(&self, dialect: &dyn Dialect) -> SyncResult<Command> {
        let mut r = Renderer {
            dialect,
            parameters: Vec::new(),
        };

        let text = match self {
            Statement::Select { table, columns } => {
                let mut quoted = Vec::with_capacity(columns.len());
                for column in columns {
                    quoted.push(r.quote(column)?);
                }
                format!("SELECT {} FROM {}", quoted.join(", "), r.quote(table)?)
            }
            Statement::Insert {
                table,
                values,
                generated,
            } => {
                let table = r.quote(table)?;
                let mut text = if values.is_empty() {
                    format!("INSERT INTO {table} DEFAULT VALUES")
                } else {
                    let mut columns = Vec::with_capacity(values.len());
                    let mut markers = Vec::with_capacity(values.len());
                    for binding in values {
                        columns.push(r.quote(&binding.column)?);
                        markers.push(r.bind(binding));
                    }
                    format!(
                        "INSERT INTO {table} ({}) VALUES ({})",
                        columns.join(", "),
                        markers.join(", ")
                    )
                };
                if let Some(binding) = generated {
                    r.output(binding);
                    text.push_str("; ");
                    text.push_str(dialect.identity_fetch());
                }
                text
            }
            Statement::Update { table, set, key } => {
                if set.is_empty() {
                    return Err(SyncError::validation(format!(
                        "update of {table} has no assignable columns"
                    )));
                }
                let table = r.quote(table)?;
                let assignments = r.predicate(set, ", ")?;
                let filter = r.key_filter(key)?;
                format!("UPDATE {table} SET {assignments} WHERE {filter}")
            }
            Statement::Delete { table, key } => {
                let table = r.quote(table)?;
                let filter = r.key_filter(key)?;
                format!("DELETE FROM {table} WHERE {filter}")
            }
        };

        let mut command = Command::text(text);
        command.parameters = r.parameters;
        Ok(command)
    }
}

struct Renderer<'a> {
    dialect: &'a dyn Dialect,
    parameters: Vec<Parameter>,
}

impl Renderer<'_> {
    fn quote(&self, ident: &str) -> SyncResult<String> {
        self.dialect.quote_identifier(ident)
    }

    fn next_name(&self) -> String {
        self.dialect.parameter_name(self.parameters.len() + 1)
    }

    fn bind(&mut self, binding: &Binding) -> String {
        let name = self.next_name();
        self.parameters.push(
            Parameter::input(name.clone(), binding.data_type)
                .bound_to(&binding.column, binding.version),
        );
        name
    }

    fn output(&mut self, binding: &Binding) {
        let name = self.next_name();
        self.parameters.push(
            Parameter::output(name, binding.data_type).bound_to(&binding.column, binding.version),
        );
    }

    /// `a = :p1<sep>b = :p2`
    fn predicate(&mut self, bindings: &[Binding], separator: &str) -> SyncResult<String> {
        let mut parts = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let column = self.quote(&binding.column)?;
            let marker = self.bind(binding);
            parts.push(format!("{column} = {marker}"));
        }
        Ok(parts.join(separator))
    }

    fn key_filter(&mut self, key: &[Binding]) -> SyncResult<String> {
        if key.is_empty() {
            return Err(SyncError::validation("statement has no key columns"));
        }
        self.predicate(key, " AND ")
    }
}
