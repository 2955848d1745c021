//! Fault injection for store-level failure paths.
//!
//! [`FaultyStore`] wraps any [`RelationalStore`] and fails operations
//! according to a plan shared through a [`FaultHandle`]. The handle stays
//! with the test while the store moves into a pool. [`RecordingHook`]
//! captures what the synchronizer reports but does not escalate.

use parking_lot::Mutex;
use rowsync_core::DiagnosticHook;
use rowsync_store::{
    Command, Execution, FailureClass, IsolationLevel, RelationalStore, StoreError, StoreResult,
    Transaction,
};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct FaultPlan {
    next: VecDeque<StoreError>,
    matching: Vec<(String, StoreError)>,
    commit: Option<StoreError>,
    rollback: Option<StoreError>,
    close: Option<StoreError>,
    counters: FaultCounters,
}

/// Operations a [`FaultyStore`] has seen, failed ones included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultCounters {
    /// Calls to `execute`.
    pub executions: u32,
    /// Calls to `begin_transaction`.
    pub begins: u32,
    /// Calls to `commit`.
    pub commits: u32,
    /// Calls to `rollback`.
    pub rollbacks: u32,
    /// Calls to `close`.
    pub closes: u32,
}

/// Shared control over the faults of one or more [`FaultyStore`]s.
#[derive(Debug, Clone, Default)]
pub struct FaultHandle {
    plan: Arc<Mutex<FaultPlan>>,
}

impl FaultHandle {
    /// Creates a handle with no faults planned.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `times` executions with `error`.
    pub fn fail_next(&self, times: u32, error: StoreError) {
        let mut plan = self.plan.lock();
        for _ in 0..times {
            plan.next.push_back(error.clone());
        }
    }

    /// Fails every execution whose command text contains `needle`.
    pub fn fail_when(&self, needle: impl Into<String>, error: StoreError) {
        self.plan.lock().matching.push((needle.into(), error));
    }

    /// Fails the next commit with `error`.
    pub fn fail_commit(&self, error: StoreError) {
        self.plan.lock().commit = Some(error);
    }

    /// Fails the next rollback with `error`. The inner transaction is still
    /// rolled back.
    pub fn fail_rollback(&self, error: StoreError) {
        self.plan.lock().rollback = Some(error);
    }

    /// Fails the next close with `error`. The inner store is still closed.
    pub fn fail_close(&self, error: StoreError) {
        self.plan.lock().close = Some(error);
    }

    /// Removes every planned fault. Counters are kept.
    pub fn clear(&self) {
        let mut plan = self.plan.lock();
        plan.next.clear();
        plan.matching.clear();
        plan.commit = None;
        plan.rollback = None;
        plan.close = None;
    }

    /// Returns the counters.
    pub fn counters(&self) -> FaultCounters {
        self.plan.lock().counters
    }

    /// Returns the number of executions seen.
    pub fn executions(&self) -> u32 {
        self.counters().executions
    }

    fn on_execute(&self, text: &str) -> Option<StoreError> {
        let mut plan = self.plan.lock();
        plan.counters.executions += 1;
        if let Some(error) = plan.next.pop_front() {
            return Some(error);
        }
        plan.matching
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, error)| error.clone())
    }
}

/// A store that fails on demand.
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    faults: FaultHandle,
}

impl<S: RelationalStore> FaultyStore<S> {
    /// Wraps `inner` with a fresh handle.
    pub fn new(inner: S) -> Self {
        Self::with_handle(inner, FaultHandle::new())
    }

    /// Wraps `inner`, sharing an existing handle.
    pub fn with_handle(inner: S, faults: FaultHandle) -> Self {
        Self { inner, faults }
    }

    /// Returns the fault handle.
    pub fn handle(&self) -> FaultHandle {
        self.faults.clone()
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: RelationalStore> RelationalStore for FaultyStore<S> {
    fn open(&mut self) -> StoreResult<()> {
        self.inner.open()
    }

    fn close(&mut self) -> StoreResult<()> {
        let injected = {
            let mut plan = self.faults.plan.lock();
            plan.counters.closes += 1;
            plan.close.take()
        };
        self.inner.close()?;
        injected.map_or(Ok(()), Err)
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn begin_transaction(&mut self, isolation: IsolationLevel) -> StoreResult<Transaction> {
        self.faults.plan.lock().counters.begins += 1;
        self.inner.begin_transaction(isolation)
    }

    fn commit(&mut self, transaction: Transaction) -> StoreResult<()> {
        let injected = {
            let mut plan = self.faults.plan.lock();
            plan.counters.commits += 1;
            plan.commit.take()
        };
        match injected {
            Some(error) => Err(error),
            None => self.inner.commit(transaction),
        }
    }

    fn rollback(&mut self, transaction: Transaction) -> StoreResult<()> {
        let injected = {
            let mut plan = self.faults.plan.lock();
            plan.counters.rollbacks += 1;
            plan.rollback.take()
        };
        self.inner.rollback(transaction)?;
        injected.map_or(Ok(()), Err)
    }

    fn execute(
        &mut self,
        command: &mut Command,
        transaction: Option<&Transaction>,
    ) -> StoreResult<Execution> {
        if let Some(error) = self.faults.on_execute(&command.text) {
            return Err(error);
        }
        self.inner.execute(command, transaction)
    }

    fn classify(&self, error: &StoreError) -> FailureClass {
        self.inner.classify(error)
    }
}

/// A [`DiagnosticHook`] that records every event as a line of text.
#[derive(Debug, Default)]
pub struct RecordingHook {
    events: Mutex<Vec<String>>,
}

impl RecordingHook {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events, oldest first.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Returns the events starting with `prefix`.
    pub fn events_of(&self, prefix: &str) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl DiagnosticHook for RecordingHook {
    fn rollback_failed(&self, table: &str, error: &StoreError) {
        self.events.lock().push(format!("rollback {table}: {error}"));
    }

    fn close_failed(&self, table: &str, error: &StoreError) {
        self.events.lock().push(format!("close {table}: {error}"));
    }

    fn statement_retried(&self, operation: &str, attempt: u32, error: &StoreError) {
        self.events
            .lock()
            .push(format!("retry {attempt} {operation}: {error}"));
    }
}
