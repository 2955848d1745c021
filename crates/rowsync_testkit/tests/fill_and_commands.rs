//! Loading snapshots from the store and inspecting derived commands.

use rowsync_core::{
    ChangeSetSynchronizer, Column, DataType, RowState, SqlServerDialect, SynchronizationResult,
    TableSchema, TabularSnapshot, Value,
};
use rowsync_store::{Command, Decimal};
use rowsync_testkit::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn fill_loads_unchanged_typed_rows() {
    let db = TestDatabase::employees();
    db.execute(
        "INSERT INTO Employee (Name, Salary) VALUES ('Ada', '50000.50');
         INSERT INTO Employee (Name, Salary) VALUES ('Grace', NULL);",
    );

    let mut employees = employee_snapshot();
    let loaded = db.synchronizer().fill(&mut employees).unwrap();
    assert_eq!(loaded, 2);
    assert!(employees.rows().iter().all(|r| r.state() == RowState::Unchanged));
    assert_eq!(employees.value(0, "Salary"), Some(&Value::Decimal(Decimal::new(5_000_050, 2))));
    assert_eq!(employees.value(1, "Salary"), Some(&Value::Null));
    assert!(!employees.has_changes());
}

#[test]
fn fill_with_supplied_select_nulls_missing_columns() {
    let db = TestDatabase::employees();
    let _ = scenarios::seeded_employees(&db, &["Ada"]);
    let sync = db
        .synchronizer()
        .with_select_command(Command::text("SELECT id, name FROM Employee"));

    let mut employees = employee_snapshot();
    assert_eq!(sync.fill(&mut employees).unwrap(), 1);
    assert_eq!(employees.value(0, "Name"), Some(&Value::Text("Ada".into())));
    assert_eq!(employees.value(0, "Salary"), Some(&Value::Null));
}

#[test]
fn fill_reports_store_errors() {
    let db = TestDatabase::employees();
    let mut missing = TabularSnapshot::new("Missing", vec![Column::new("Id", DataType::Integer)]);
    let err = db.synchronizer().fill(&mut missing).unwrap_err();
    assert!(err.to_string().contains("Missing"), "{err}");
}

#[test]
fn loaded_rows_round_trip_through_edits() {
    let db = TestDatabase::employees();
    let mut employees = scenarios::seeded_employees(&db, &["Ada", "Grace"]);
    employees.set_value(1, "Salary", 4242).unwrap();
    let sync = db.synchronizer();
    assert!(sync.synchronize(&mut employees, true, Duration::from_secs(30)).is_success());

    let fresh = db.reload(employee_snapshot());
    assert_eq!(fresh.value(1, "Salary"), Some(&Value::Decimal(Decimal::from(4242))));
}

#[test]
fn derived_commands_follow_the_key() {
    let db = TestDatabase::employees();
    let set = db.synchronizer().derive_commands(&employee_snapshot()).unwrap();

    assert_eq!(set.select.text, "SELECT \"Id\", \"Name\", \"Salary\" FROM \"Employee\"");
    let insert = set.insert.unwrap();
    assert!(insert.text.ends_with("; SELECT last_insert_rowid()"), "{}", insert.text);
    assert_eq!(insert.outputs().count(), 1);
    assert_eq!(
        set.update.unwrap().text,
        "UPDATE \"Employee\" SET \"Name\" = :p1, \"Salary\" = :p2 WHERE \"Id\" = :p3"
    );
    assert_eq!(set.delete.unwrap().text, "DELETE FROM \"Employee\" WHERE \"Id\" = :p1");
}

#[test]
fn derived_commands_follow_the_dialect() {
    let db = TestDatabase::employees();
    let sync = ChangeSetSynchronizer::new(db.pool(1)).with_dialect(Arc::new(SqlServerDialect));
    let set = sync.derive_commands(&employee_snapshot()).unwrap();
    assert_eq!(set.delete.unwrap().text, "DELETE FROM [Employee] WHERE [Id] = @p1");
    assert!(set.insert.unwrap().text.ends_with("SELECT SCOPE_IDENTITY()"));
}

#[test]
fn explicit_schema_overrides_snapshot_metadata() {
    let db = TestDatabase::tags();
    // The snapshot carries no key; the schema supplies it.
    let mut tags = TabularSnapshot::new(
        "Tag",
        vec![
            Column::new("Label", DataType::Text),
            Column::new("Color", DataType::Text),
        ],
    );
    tags.insert_row([("Label", "urgent"), ("Color", "red")]).unwrap();

    let schema = TableSchema::new("Tag", tag_columns()).unwrap();
    let sync = db.synchronizer().with_schema(schema);
    let outcome = sync.synchronize(&mut tags, true, Duration::from_secs(30));
    assert_eq!(outcome.result, SynchronizationResult::Success);
    assert_eq!(db.count("Tag"), 1);

    tags.set_value(0, "Color", "amber").unwrap();
    assert!(sync.synchronize(&mut tags, true, Duration::from_secs(30)).is_success());
    let rows = db.query("SELECT Color FROM Tag");
    assert_eq!(rows, vec![vec![Value::Text("amber".into())]]);
}

#[test]
fn hostile_identifiers_stay_quoted() {
    let db = TestDatabase::tags();
    let mut snapshot = TabularSnapshot::new(
        "Tag\"; DROP TABLE Tag; --",
        vec![Column::new("Label", DataType::Text).primary_key()],
    );
    snapshot.insert_row([("Label", "x")]).unwrap();

    let outcome = db.synchronizer().synchronize(&mut snapshot, true, Duration::from_secs(5));
    assert_eq!(outcome.result, SynchronizationResult::Failed);
    assert_eq!(db.count("Tag"), 0);
}
