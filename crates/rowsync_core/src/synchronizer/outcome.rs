//! Results and statistics of synchronization calls.

use serde::Serialize;
use std::fmt;

/// Aggregate outcome of one synchronization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynchronizationResult {
    /// Every changed row was applied.
    Success,
    /// Some rows were applied and committed; the rest carry errors.
    PartialSuccess,
    /// Nothing was committed, or every row failed.
    Failed,
    /// The store kept failing transiently and the call gave up.
    TimedOut,
}

impl SynchronizationResult {
    /// Returns the snake_case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            SynchronizationResult::Success => "success",
            SynchronizationResult::PartialSuccess => "partial_success",
            SynchronizationResult::Failed => "failed",
            SynchronizationResult::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for SynchronizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a synchronization call reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// Aggregate result.
    pub result: SynchronizationResult,
    /// Row error messages, one per line, or the reason the call failed.
    pub message: String,
    /// Rows applied to the store and accepted.
    pub applied: usize,
    /// Rows that failed.
    pub failed: usize,
    /// Store executions made for row commands, retries included.
    pub statements: u64,
}

impl SyncOutcome {
    pub(crate) fn new(result: SynchronizationResult) -> Self {
        Self {
            result,
            message: String::new(),
            applied: 0,
            failed: 0,
            statements: 0,
        }
    }

    pub(crate) fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Returns true for [`SynchronizationResult::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result == SynchronizationResult::Success
    }
}

/// Statistics accumulated by a synchronizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Total number of calls.
    pub calls: u64,
    /// Calls that returned `Success`.
    pub successes: u64,
    /// Calls that returned `PartialSuccess`.
    pub partial_successes: u64,
    /// Calls that returned `Failed`.
    pub failures: u64,
    /// Calls that returned `TimedOut`.
    pub timeouts: u64,
    /// Rows applied and accepted.
    pub rows_applied: u64,
    /// Rows that failed.
    pub rows_failed: u64,
    /// Store executions for row commands.
    pub statements: u64,
    /// Total number of retries.
    pub retries: u64,
    /// Last failure message.
    pub last_error: Option<String>,
}

impl SyncStats {
    pub(crate) fn record(&mut self, outcome: &SyncOutcome, retries: u64) {
        self.calls += 1;
        match outcome.result {
            SynchronizationResult::Success => self.successes += 1,
            SynchronizationResult::PartialSuccess => self.partial_successes += 1,
            SynchronizationResult::Failed => self.failures += 1,
            SynchronizationResult::TimedOut => self.timeouts += 1,
        }
        self.rows_applied += outcome.applied as u64;
        self.rows_failed += outcome.failed as u64;
        self.statements += outcome.statements;
        self.retries += retries;
        if !outcome.is_success() {
            self.last_error = Some(outcome.message.clone());
        }
    }
}
