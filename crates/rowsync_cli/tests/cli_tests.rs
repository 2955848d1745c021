//! Tests that drive the `rowsync` binary.

use rowsync_store::{Command as Sql, RelationalStore, SqliteStore};
use serde_json::{json, Value as Json};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        ws.sql(
            "CREATE TABLE Employee (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                Name TEXT NOT NULL UNIQUE,
                Salary TEXT)",
        );
        ws
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("app.db")
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn sql(&self, text: &str) -> Option<Vec<Vec<rowsync_store::Value>>> {
        let mut store = SqliteStore::file(self.db());
        let mut command = Sql::text(text);
        let execution = store.execute(&mut command, None).unwrap();
        store.close().unwrap();
        execution.result_set.map(|r| r.rows)
    }

    fn write_snapshot(&self, name: &str, rows: Json) -> PathBuf {
        let path = self.path(name);
        let file = json!({
            "name": "Employee",
            "columns": [
                { "name": "Id", "type": "integer", "primary_key": true, "auto_generated": true },
                { "name": "Name", "type": "text", "unique": true },
                { "name": "Salary", "type": "decimal" }
            ],
            "rows": rows
        });
        std::fs::write(&path, serde_json::to_string_pretty(&file).unwrap()).unwrap();
        path
    }
}

fn rowsync(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rowsync"))
        .args(args)
        .output()
        .unwrap()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn read_json(path: &Path) -> Json {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn version_prints_both_crates() {
    let output = rowsync(&["version"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("rowsync CLI v"));
    assert!(text.contains("rowsync core v"));
}

#[test]
fn sync_applies_and_reconciles() {
    let ws = Workspace::new();
    let snapshot = ws.write_snapshot(
        "in.json",
        json!([
            { "state": "added", "values": { "Name": "Ada", "Salary": 50000 } },
            { "state": "added", "values": { "Name": "Grace", "Salary": "61000.25" } }
        ]),
    );
    let out = ws.path("out.json");

    let output = rowsync(&[
        "sync",
        "--db",
        arg(&ws.db()),
        "--snapshot",
        arg(&snapshot),
        "--output",
        arg(&out),
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let outcome: Json = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(outcome["result"], "success");
    assert_eq!(outcome["applied"], 2);

    let written = read_json(&out);
    assert_eq!(written["rows"][0]["state"], "unchanged");
    assert_eq!(written["rows"][0]["values"]["Id"], 1);
    assert_eq!(written["rows"][1]["values"]["Id"], 2);
    assert_eq!(written["rows"][1]["values"]["Salary"], "61000.25");

    let count = ws.sql("SELECT COUNT(*) FROM Employee").unwrap();
    assert_eq!(count[0][0], rowsync_store::Value::Integer(2));
}

#[test]
fn failed_sync_exits_with_error_and_keeps_rows_pending() {
    let ws = Workspace::new();
    ws.sql("INSERT INTO Employee (Name) VALUES ('Ada')");
    let snapshot = ws.write_snapshot(
        "in.json",
        json!([
            { "state": "added", "values": { "Name": "Grace" } },
            { "state": "added", "values": { "Name": "Ada" } }
        ]),
    );

    let output = rowsync(&["sync", "-d", arg(&ws.db()), "-s", arg(&snapshot), "-a", "1"]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Result:     failed"), "{text}");
    assert!(text.contains("Employee[row 1]"), "{text}");

    let count = ws.sql("SELECT COUNT(*) FROM Employee").unwrap();
    assert_eq!(count[0][0], rowsync_store::Value::Integer(1));
}

#[test]
fn keep_going_commits_the_good_rows() {
    let ws = Workspace::new();
    ws.sql("INSERT INTO Employee (Name) VALUES ('Ada')");
    let snapshot = ws.write_snapshot(
        "in.json",
        json!([
            { "state": "added", "values": { "Name": "Grace" } },
            { "state": "added", "values": { "Name": "Ada" } }
        ]),
    );
    let out = ws.path("out.json");

    let output = rowsync(&[
        "sync",
        "-d",
        arg(&ws.db()),
        "-s",
        arg(&snapshot),
        "--keep-going",
        "-o",
        arg(&out),
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("partial_success"));

    let written = read_json(&out);
    assert_eq!(written["rows"][0]["state"], "unchanged");
    assert_eq!(written["rows"][1]["state"], "added");
    assert!(written["rows"][1]["error"].as_str().unwrap().contains("constraint"));
}

#[test]
fn sync_requires_an_existing_database() {
    let ws = Workspace::new();
    let snapshot = ws.write_snapshot("in.json", json!([]));
    let missing = ws.path("missing.db");
    let output = rowsync(&["sync", "-d", arg(&missing), "-s", arg(&snapshot)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No database found"));
    assert!(!missing.exists());
}

#[test]
fn fill_writes_table_rows() {
    let ws = Workspace::new();
    ws.sql("INSERT INTO Employee (Name, Salary) VALUES ('Ada', '50000')");
    let snapshot = ws.write_snapshot("empty.json", json!([]));

    let output = rowsync(&["fill", "-d", arg(&ws.db()), "-s", arg(&snapshot)]);
    assert!(output.status.success());
    let filled: Json = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(filled["rows"].as_array().unwrap().len(), 1);
    assert_eq!(filled["rows"][0]["state"], "unchanged");
    assert_eq!(filled["rows"][0]["values"]["Name"], "Ada");
    assert_eq!(filled["rows"][0]["values"]["Salary"], "50000");
}

#[test]
fn commands_prints_parameterized_sql() {
    let ws = Workspace::new();
    let snapshot = ws.write_snapshot("empty.json", json!([]));

    let output = rowsync(&["commands", "-s", arg(&snapshot)]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("DELETE FROM \"Employee\" WHERE \"Id\" = :p1"), "{text}");
    assert!(text.contains("<- Id (original)"), "{text}");

    let output = rowsync(&["commands", "-s", arg(&snapshot), "--dialect", "sqlserver"]);
    assert!(stdout(&output).contains("DELETE FROM [Employee] WHERE [Id] = @p1"));

    let output = rowsync(&["commands", "-s", arg(&snapshot), "--dialect", "oracle"]);
    assert!(!output.status.success());
}

#[test]
fn inspect_summarizes_states() {
    let ws = Workspace::new();
    let snapshot = ws.write_snapshot(
        "in.json",
        json!([
            { "state": "unchanged", "values": { "Id": 1, "Name": "Ada" } },
            { "state": "deleted", "values": { "Id": 2, "Name": "Grace" } },
            { "state": "added", "values": { "Name": "Edsger" }, "error": "duplicate" }
        ]),
    );

    let output = rowsync(&["inspect", "-s", arg(&snapshot), "-f", "json"]);
    assert!(output.status.success());
    let result: Json = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(result["rows"], 3);
    assert_eq!(result["key"], json!(["Id"]));
    assert_eq!(result["states"]["deleted"], 1);
    assert_eq!(result["errors"][0]["message"], "duplicate");

    let output = rowsync(&["inspect", "-s", arg(&snapshot)]);
    assert!(stdout(&output).contains("Key: Id"));
}

#[test]
fn malformed_snapshot_is_rejected() {
    let ws = Workspace::new();
    let path = ws.path("bad.json");
    std::fs::write(&path, "{ \"name\": \"Employee\" }").unwrap();
    let output = rowsync(&["inspect", "-s", arg(&path)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing field"));
}
