//! Derives per-row command templates from a table schema.

use super::{Binding, Dialect, Statement};
use crate::error::{SyncError, SyncResult};
use crate::schema::TableSchema;
use crate::snapshot::RowState;
use rowsync_store::Command;

/// The commands used to read and write one table.
///
/// Write commands are templates: their parameters name the source column
/// and row version they read, and are bound per row before execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSet {
    /// Reads the whole table.
    pub select: Command,
    /// Applies `Added` rows.
    pub insert: Option<Command>,
    /// Applies `Modified` rows.
    pub update: Option<Command>,
    /// Applies `Deleted` rows.
    pub delete: Option<Command>,
}

impl CommandSet {
    /// Returns the template for rows in `state`.
    pub fn for_state(&self, state: RowState) -> Option<&Command> {
        match state {
            RowState::Added => self.insert.as_ref(),
            RowState::Modified => self.update.as_ref(),
            RowState::Deleted => self.delete.as_ref(),
            RowState::Unchanged => None,
        }
    }

    /// Iterates over `(kind, command)` for every command present.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Command)> {
        [
            ("select", Some(&self.select)),
            ("insert", self.insert.as_ref()),
            ("update", self.update.as_ref()),
            ("delete", self.delete.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, cmd)| cmd.map(|c| (kind, c)))
    }
}

/// Builds statements for a [`TableSchema`] in a [`Dialect`].
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder<'a> {
    schema: &'a TableSchema,
    dialect: &'a dyn Dialect,
}

impl<'a> CommandBuilder<'a> {
    /// Creates a builder.
    pub fn new(schema: &'a TableSchema, dialect: &'a dyn Dialect) -> Self {
        Self { schema, dialect }
    }

    /// `SELECT` of every schema column.
    pub fn select_statement(&self) -> Statement {
        Statement::Select {
            table: self.schema.table().to_string(),
            columns: self.schema.columns().iter().map(|c| c.name.clone()).collect(),
        }
    }

    /// `INSERT` of every non-generated column, fetching the generated key.
    pub fn insert_statement(&self) -> Statement {
        Statement::Insert {
            table: self.schema.table().to_string(),
            values: self.schema.insert_columns().map(Binding::current).collect(),
            generated: self.schema.generated_key().map(Binding::current),
        }
    }

    /// `UPDATE` of every non-key, non-generated column, or `None` when the
    /// table has nothing to assign.
    pub fn update_statement(&self) -> Option<Statement> {
        let set: Vec<Binding> = self.schema.update_columns().map(Binding::current).collect();
        if set.is_empty() {
            return None;
        }
        Some(Statement::Update {
            table: self.schema.table().to_string(),
            set,
            key: self.key_bindings(),
        })
    }

    /// `DELETE` by key.
    pub fn delete_statement(&self) -> Statement {
        Statement::Delete {
            table: self.schema.table().to_string(),
            key: self.key_bindings(),
        }
    }

    /// Renders the select command.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an identifier that cannot be quoted.
    pub fn select(&self) -> SyncResult<Command> {
        self.select_statement().render(self.dialect)
    }

    /// Renders the insert template.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an identifier that cannot be quoted.
    pub fn insert(&self) -> SyncResult<Command> {
        self.insert_statement().render(self.dialect)
    }

    /// Renders the update template.
    ///
    /// # Errors
    ///
    /// Returns a validation error if every column is a key or generated.
    pub fn update(&self) -> SyncResult<Command> {
        match self.update_statement() {
            Some(statement) => statement.render(self.dialect),
            None => Err(SyncError::validation(format!(
                "cannot derive an update for {}: every column is a key or generated",
                self.schema.table()
            ))),
        }
    }

    /// Renders the delete template.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an identifier that cannot be quoted.
    pub fn delete(&self) -> SyncResult<Command> {
        self.delete_statement().render(self.dialect)
    }

    /// Renders every command the schema supports.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an identifier that cannot be quoted.
    pub fn derive_all(&self) -> SyncResult<CommandSet> {
        Ok(CommandSet {
            select: self.select()?,
            insert: Some(self.insert()?),
            update: self
                .update_statement()
                .map(|s| s.render(self.dialect))
                .transpose()?,
            delete: Some(self.delete()?),
        })
    }

    fn key_bindings(&self) -> Vec<Binding> {
        self.schema.key_columns().map(Binding::original).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Column;
    use crate::statement::{SqlServerDialect, SqliteDialect};
    use rowsync_store::{DataType, ParameterDirection, SourceVersion};

    fn employee() -> TableSchema {
        TableSchema::new(
            "Employee",
            vec![
                Column::new("Id", DataType::Integer).primary_key().auto_generated(),
                Column::new("Name", DataType::Text).unique(),
                Column::new("Salary", DataType::Decimal),
            ],
        )
        .unwrap()
    }

    #[test]
    fn derives_employee_commands() {
        let schema = employee();
        let set = CommandBuilder::new(&schema, &SqliteDialect).derive_all().unwrap();

        assert_eq!(set.select.text, "SELECT \"Id\", \"Name\", \"Salary\" FROM \"Employee\"");
        let insert = set.insert.unwrap();
        assert_eq!(
            insert.text,
            "INSERT INTO \"Employee\" (\"Name\", \"Salary\") VALUES (:p1, :p2); \
             SELECT last_insert_rowid()"
        );
        let outputs: Vec<_> = insert.outputs().map(|p| p.name.as_str()).collect();
        assert_eq!(outputs, vec![":p3"]);

        let update = set.update.unwrap();
        assert_eq!(
            update.text,
            "UPDATE \"Employee\" SET \"Name\" = :p1, \"Salary\" = :p2 WHERE \"Id\" = :p3"
        );
        assert_eq!(update.parameters[2].source_version, SourceVersion::Original);

        let delete = set.delete.unwrap();
        assert_eq!(delete.text, "DELETE FROM \"Employee\" WHERE \"Id\" = :p1");
    }

    #[test]
    fn composite_keys_are_anded() {
        let schema = TableSchema::new(
            "Assignment",
            vec![
                Column::new("EmployeeId", DataType::Integer).primary_key(),
                Column::new("ProjectId", DataType::Integer).primary_key(),
                Column::new("Role", DataType::Text),
            ],
        )
        .unwrap();
        let builder = CommandBuilder::new(&schema, &SqlServerDialect);

        let delete = builder.delete().unwrap();
        assert_eq!(
            delete.text,
            "DELETE FROM [Assignment] WHERE [EmployeeId] = @p1 AND [ProjectId] = @p2"
        );

        // Plain keys are inserted explicitly, with nothing to fetch back.
        let insert = builder.insert().unwrap();
        assert_eq!(insert.parameters.len(), 3);
        assert!(insert
            .parameters
            .iter()
            .all(|p| p.direction == ParameterDirection::In));
    }

    #[test]
    fn key_only_table_has_no_update() {
        let schema = TableSchema::new(
            "Tag",
            vec![Column::new("Label", DataType::Text).primary_key()],
        )
        .unwrap();
        let builder = CommandBuilder::new(&schema, &SqliteDialect);

        assert!(builder.update().is_err());
        let set = builder.derive_all().unwrap();
        assert!(set.update.is_none());
        assert!(set.for_state(RowState::Modified).is_none());
        assert!(set.for_state(RowState::Deleted).is_some());
        assert_eq!(set.iter().count(), 3);
    }
}
