//! Property-based test generators using proptest.
//!
//! Provides strategies for employee rows and for edit sequences applied to
//! a loaded snapshot, together with a plain model of what the table should
//! hold afterwards.

use proptest::prelude::*;
use rowsync_core::{RowState, TabularSnapshot};
use rowsync_store::{Decimal, Value};
use std::collections::BTreeMap;

/// Strategy for generating employee names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{2,12}").expect("Invalid regex")
}

/// Strategy for generating salaries with two decimal places.
pub fn salary_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for generating between `min` and `max` employees with distinct
/// names.
pub fn employees_strategy(
    min: usize,
    max: usize,
) -> impl Strategy<Value = Vec<(String, Decimal)>> {
    prop::collection::btree_map(name_strategy(), salary_strategy(), min..=max)
        .prop_map(|map| map.into_iter().collect())
}

/// One edit made to a snapshot before synchronizing it.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Add a new employee.
    Insert(String, Decimal),
    /// Change the salary of the row at `index % len`.
    Raise(usize, Decimal),
    /// Delete the row at `index % len`.
    Delete(usize),
}

/// Strategy for generating a single edit.
pub fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (name_strategy(), salary_strategy()).prop_map(|(n, s)| Edit::Insert(n, s)),
        (any::<usize>(), salary_strategy()).prop_map(|(i, s)| Edit::Raise(i, s)),
        any::<usize>().prop_map(Edit::Delete),
    ]
}

/// Strategy for generating edit sequences.
pub fn edits_strategy(max: usize) -> impl Strategy<Value = Vec<Edit>> {
    prop::collection::vec(edit_strategy(), 0..=max)
}

/// Applies `edits` to an `Employee` snapshot and returns the expected table
/// contents, name to salary.
///
/// Inserts of a name that is already present are skipped so every edit
/// sequence can be applied without a constraint failure.
pub fn apply_edits(snapshot: &mut TabularSnapshot, edits: &[Edit]) -> BTreeMap<String, Decimal> {
    for edit in edits {
        let live: Vec<usize> = (0..snapshot.len())
            .filter(|&i| snapshot.row(i).map(|r| r.state()) != Some(RowState::Deleted))
            .collect();
        match edit {
            Edit::Insert(name, salary) => {
                if live.iter().any(|&i| name_at(snapshot, i) == Some(name.as_str())) {
                    continue;
                }
                snapshot
                    .insert_row([
                        ("Name", Value::from(name.as_str())),
                        ("Salary", Value::from(*salary)),
                    ])
                    .expect("Failed to insert row");
            }
            Edit::Raise(index, salary) => {
                if let Some(&row) = pick(&live, *index) {
                    snapshot
                        .set_value(row, "Salary", *salary)
                        .expect("Failed to set salary");
                }
            }
            Edit::Delete(index) => {
                if let Some(&row) = pick(&live, *index) {
                    snapshot.delete_row(row).expect("Failed to delete row");
                }
            }
        }
    }
    expected_contents(snapshot)
}

fn pick(live: &[usize], index: usize) -> Option<&usize> {
    if live.is_empty() {
        None
    } else {
        live.get(index % live.len())
    }
}

fn name_at(snapshot: &TabularSnapshot, row: usize) -> Option<&str> {
    match snapshot.value(row, "Name") {
        Some(Value::Text(name)) => Some(name),
        _ => None,
    }
}

/// Name to salary of every row that is not deleted.
pub fn expected_contents(snapshot: &TabularSnapshot) -> BTreeMap<String, Decimal> {
    (0..snapshot.len())
        .filter(|&i| snapshot.row(i).map(|r| r.state()) != Some(RowState::Deleted))
        .filter_map(|i| {
            let name = name_at(snapshot, i)?.to_string();
            let salary = match snapshot.value(i, "Salary") {
                Some(Value::Decimal(d)) => *d,
                _ => Decimal::ZERO,
            };
            Some((name, salary))
        })
        .collect()
}
