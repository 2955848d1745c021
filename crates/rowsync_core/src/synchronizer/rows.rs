//! Binding templates to rows and reading store-assigned values back.

use crate::error::{SyncError, SyncResult};
use crate::schema::TableSchema;
use crate::snapshot::TabularSnapshot;
use rowsync_store::{Command, SourceVersion, Value};

/// Checks that every bound parameter of a template names a snapshot column.
pub(crate) fn check_template(
    kind: &str,
    template: &Command,
    snapshot: &TabularSnapshot,
) -> SyncResult<()> {
    for param in &template.parameters {
        if let Some(column) = &param.source_column {
            if snapshot.column_index(column).is_none() {
                return Err(SyncError::validation(format!(
                    "{kind} parameter {} is bound to unknown column {column}",
                    param.name
                )));
            }
        }
    }
    Ok(())
}

/// Copies a template and fills its inputs from one row.
pub(crate) fn bind_row(
    template: &Command,
    snapshot: &TabularSnapshot,
    row: usize,
) -> SyncResult<Command> {
    let source = snapshot
        .row(row)
        .ok_or_else(|| SyncError::unexpected(format!("row {row} vanished during synchronization")))?;

    let mut command = template.clone();
    for param in command.parameters.iter_mut().filter(|p| p.direction.is_input()) {
        let Some(column) = &param.source_column else {
            continue;
        };
        let index = snapshot.column_index(column).ok_or_else(|| {
            SyncError::validation(format!("parameter {} is bound to unknown column {column}", param.name))
        })?;
        param.value = source
            .version(param.source_version)
            .get(index)
            .cloned()
            .unwrap_or_default();
    }
    Ok(command)
}

/// Writes values the store assigned to bound output parameters into the row.
pub(crate) fn merge_outputs(
    snapshot: &mut TabularSnapshot,
    row: usize,
    command: &Command,
) -> SyncResult<()> {
    for param in command.outputs() {
        let Some(column) = &param.source_column else {
            continue;
        };
        if param.value.is_null() {
            continue;
        }
        let index = snapshot.column_index(column).ok_or_else(|| {
            SyncError::validation(format!("output {} is bound to unknown column {column}", param.name))
        })?;
        snapshot.merge_value(row, index, param.value.clone())?;
    }
    Ok(())
}

/// Names a row by its key, e.g. `Employee[Id=3]`.
///
/// Rows that were in the store are named by their original key; new rows
/// by their current key, or by position while the key is still unassigned.
pub(crate) fn row_label(schema: &TableSchema, snapshot: &TabularSnapshot, row: usize) -> String {
    let Some(source) = snapshot.row(row) else {
        return format!("{}[row {row}]", schema.table());
    };

    let mut parts = Vec::new();
    for column in schema.key_columns() {
        let value = snapshot
            .column_index(&column.name)
            .and_then(|i| source.version(SourceVersion::Original).get(i))
            .unwrap_or(&Value::Null);
        if !value.is_null() {
            parts.push(format!("{}={value}", column.name));
        }
    }

    if parts.is_empty() {
        format!("{}[row {row}]", schema.table())
    } else {
        format!("{}[{}]", schema.table(), parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Column;
    use rowsync_store::{DataType, Parameter};

    fn snapshot() -> TabularSnapshot {
        let mut snapshot = TabularSnapshot::new(
            "Employee",
            vec![
                Column::new("Id", DataType::Integer).primary_key().auto_generated(),
                Column::new("Name", DataType::Text),
            ],
        );
        snapshot.load_row(vec![Value::Integer(3), "Ada".into()]).unwrap();
        snapshot.insert_row([("Name", "Grace")]).unwrap();
        snapshot
    }

    #[test]
    fn binds_current_and_original_values() {
        let mut snapshot = snapshot();
        snapshot.set_value(0, "Name", "Ada Lovelace").unwrap();

        let template = Command::text("UPDATE ...")
            .with_parameter(
                Parameter::input(":p1", DataType::Text).bound_to("Name", SourceVersion::Current),
            )
            .with_parameter(
                Parameter::input(":p2", DataType::Text).bound_to("Name", SourceVersion::Original),
            );
        let bound = bind_row(&template, &snapshot, 0).unwrap();
        assert_eq!(bound.parameters[0].value, Value::Text("Ada Lovelace".into()));
        assert_eq!(bound.parameters[1].value, Value::Text("Ada".into()));
        // The template itself is untouched.
        assert_eq!(template.parameters[0].value, Value::Null);
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let template = Command::text("x").with_parameter(
            Parameter::input(":p1", DataType::Text).bound_to("Title", SourceVersion::Current),
        );
        assert!(check_template("insert", &template, &snapshot()).is_err());
    }

    #[test]
    fn outputs_merge_into_row() {
        let mut snapshot = snapshot();
        let mut command = Command::text("x").with_parameter(
            Parameter::output(":p2", DataType::Integer).bound_to("Id", SourceVersion::Current),
        );
        command.parameters[0].value = Value::Integer(4);

        merge_outputs(&mut snapshot, 1, &command).unwrap();
        assert_eq!(snapshot.value(1, "Id"), Some(&Value::Integer(4)));
    }

    #[test]
    fn labels_use_key_or_position() {
        let snapshot = snapshot();
        let schema = TableSchema::from_snapshot(&snapshot).unwrap();
        assert_eq!(row_label(&schema, &snapshot, 0), "Employee[Id=3]");
        assert_eq!(row_label(&schema, &snapshot, 1), "Employee[row 1]");
    }
}
