//! Bounded retry of store operations.

use crate::config::RetryConfig;
use crate::diagnostics::DiagnosticHook;
use crate::error::{SyncError, SyncResult};
use rowsync_store::{Command, Execution, RelationalStore, StoreResult, Transaction};
use std::sync::Arc;

/// A successful execution and how many tries it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    /// What the store reported.
    pub execution: Execution,
    /// Number of executions, including the successful one.
    pub attempts: u32,
}

/// Runs store operations, retrying the ones the store calls transient.
///
/// Each retry re-runs the identical operation after the configured backoff.
/// Fatal errors and exhausted attempts are returned with the attempt count.
#[derive(Clone, Default)]
pub struct CommandExecutor {
    retry: RetryConfig,
    diagnostics: Option<Arc<dyn DiagnosticHook>>,
}

impl CommandExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(retry: RetryConfig) -> Self {
        Self {
            retry,
            diagnostics: None,
        }
    }

    /// Reports retries to `hook`.
    #[must_use]
    pub fn with_diagnostics(mut self, hook: Arc<dyn DiagnosticHook>) -> Self {
        self.diagnostics = Some(hook);
        self
    }

    /// Returns the retry configuration.
    #[must_use]
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Executes `command`, enlisted in `transaction` if given.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] with the last store error and the number
    /// of executions made.
    pub fn execute<S: RelationalStore + ?Sized>(
        &self,
        store: &mut S,
        command: &mut Command,
        transaction: Option<&Transaction>,
    ) -> SyncResult<Executed> {
        let label = command.text.clone();
        self.run(store, &label, |s| s.execute(command, transaction))
            .map(|(execution, attempts)| Executed {
                execution,
                attempts,
            })
    }

    /// Runs `operation` against `store` with retries.
    ///
    /// Returns the value and the number of attempts.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] with the last store error, classified by
    /// the store, and the number of attempts made.
    pub fn run<S, T, F>(&self, store: &mut S, operation: &str, mut op: F) -> SyncResult<(T, u32)>
    where
        S: RelationalStore + ?Sized,
        F: FnMut(&mut S) -> StoreResult<T>,
    {
        let max_attempts = self.retry.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match op(store) {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(operation, attempt, "store operation succeeded after retry");
                    }
                    return Ok((value, attempt));
                }
                Err(err) => err,
            };

            let class = store.classify(&err);
            if !class.is_transient() || attempt >= max_attempts {
                return Err(SyncError::classified(err, class, attempt));
            }

            let delay = self.retry.backoff_after(attempt);
            tracing::warn!(
                operation,
                attempt,
                max_attempts,
                ?delay,
                error = %err,
                "transient store error, retrying"
            );
            if let Some(hook) = &self.diagnostics {
                hook.statement_retried(operation, attempt, &err);
            }
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("retry", &self.retry)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}
