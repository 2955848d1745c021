//! Property tests of synchronization against SQLite.

use proptest::prelude::*;
use rowsync_core::{RowState, SynchronizationResult, Value};
use rowsync_store::Decimal;
use rowsync_testkit::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(30);

fn table_contents(db: &TestDatabase) -> BTreeMap<String, Decimal> {
    expected_contents(&db.reload(employee_snapshot()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn inserted_rows_round_trip(employees in employees_strategy(1, 10)) {
        let db = TestDatabase::employees();
        let sync = db.synchronizer();
        let mut snapshot = employee_snapshot();
        for (name, salary) in &employees {
            snapshot
                .insert_row([("Name", Value::from(name.as_str())), ("Salary", Value::from(*salary))])
                .unwrap();
        }

        let outcome = sync.synchronize(&mut snapshot, true, TIMEOUT);
        prop_assert_eq!(outcome.result, SynchronizationResult::Success);
        prop_assert_eq!(outcome.applied, employees.len());

        let ids: HashSet<_> = snapshot
            .rows()
            .iter()
            .filter_map(|r| r.value(0).cloned())
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
            .collect();
        prop_assert_eq!(ids.len(), employees.len());

        let expected: BTreeMap<_, _> = employees.into_iter().collect();
        prop_assert_eq!(table_contents(&db), expected);
    }

    #[test]
    fn edits_are_mirrored_by_the_store(
        seed in employees_strategy(0, 6),
        edits in edits_strategy(10),
    ) {
        let db = TestDatabase::employees();
        let sync = db.synchronizer();
        let mut initial = employee_snapshot();
        for (name, salary) in &seed {
            initial
                .insert_row([("Name", Value::from(name.as_str())), ("Salary", Value::from(*salary))])
                .unwrap();
        }
        prop_assert!(sync.synchronize(&mut initial, true, TIMEOUT).is_success());

        let mut snapshot = db.reload(employee_snapshot());
        let expected = apply_edits(&mut snapshot, &edits);
        let outcome = sync.synchronize(&mut snapshot, true, TIMEOUT);

        prop_assert_eq!(outcome.result, SynchronizationResult::Success, "{}", outcome.message);
        prop_assert!(snapshot.rows().iter().all(|r| r.state() == RowState::Unchanged));
        prop_assert_eq!(expected_contents(&snapshot), expected.clone());
        prop_assert_eq!(table_contents(&db), expected);
    }

    #[test]
    fn synchronizing_twice_issues_no_statements(employees in employees_strategy(0, 5)) {
        let db = TestDatabase::employees();
        let sync = db.synchronizer();
        let mut snapshot = employee_snapshot();
        for (name, _) in &employees {
            snapshot.insert_row([("Name", name.as_str())]).unwrap();
        }
        sync.synchronize(&mut snapshot, true, TIMEOUT);

        let before = snapshot.clone();
        let outcome = sync.synchronize(&mut snapshot, true, TIMEOUT);
        prop_assert_eq!(outcome.result, SynchronizationResult::Success);
        prop_assert_eq!(outcome.statements, 0);
        prop_assert_eq!(snapshot, before);
    }
}
