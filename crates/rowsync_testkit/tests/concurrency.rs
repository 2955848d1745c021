//! One synchronizer shared by several threads.

use rowsync_core::{ChangeSetSynchronizer, IsolationLevel, SynchronizationResult};
use rowsync_testkit::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn concurrent_calls_use_separate_transactions() {
    let db = TestDatabase::employees();
    let sync = Arc::new(
        ChangeSetSynchronizer::new(db.pool(4)).with_config(
            test_config()
                .with_isolation(IsolationLevel::Serializable)
                .with_keep_connection_open(true),
        ),
    );

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let sync = Arc::clone(&sync);
            thread::spawn(move || {
                let names: Vec<String> = (0..5).map(|i| format!("T{t}E{i}")).collect();
                let refs: Vec<&str> = names.iter().map(String::as_str).collect();
                let mut snapshot = scenarios::new_employees(&refs);
                let outcome = sync.synchronize(&mut snapshot, true, Duration::from_secs(30));
                (outcome.result, snapshot.has_changes())
            })
        })
        .collect();

    for handle in handles {
        let (result, pending) = handle.join().unwrap();
        assert_eq!(result, SynchronizationResult::Success);
        assert!(!pending);
    }

    assert_eq!(db.count("Employee"), 40);
    let pool = sync.pool();
    assert!(pool.size() <= 4);
    assert_eq!(pool.idle_count(), pool.size());
    assert_eq!(sync.stats().successes, 8);
}

#[test]
fn concurrent_failure_does_not_leak_into_other_calls() {
    let db = TestDatabase::employees();
    let seeded = scenarios::seeded_employees(&db, &["Taken"]);
    assert_eq!(seeded.len(), 1);
    let sync = Arc::new(
        ChangeSetSynchronizer::new(db.pool(2))
            .with_config(test_config().with_isolation(IsolationLevel::Serializable)),
    );

    thread::scope(|s| {
        let failing = s.spawn(|| {
            let mut snapshot = scenarios::new_employees(&["Fresh", "Taken"]);
            sync.synchronize(&mut snapshot, true, Duration::from_secs(30)).result
        });
        let passing = s.spawn(|| {
            let mut snapshot = scenarios::new_employees(&["Other"]);
            sync.synchronize(&mut snapshot, true, Duration::from_secs(30)).result
        });
        assert_eq!(failing.join().unwrap(), SynchronizationResult::Failed);
        assert_eq!(passing.join().unwrap(), SynchronizationResult::Success);
    });

    assert_eq!(db.employee_names(), vec!["Other", "Taken"]);
}
