//! Hook for failures that are reported but never escalated.

use rowsync_store::StoreError;

/// Receives failures the synchronizer swallows.
///
/// A failed rollback or close must not mask the error that caused it, so
/// the synchronizer logs it, tells the hook, and carries on. Every method
/// defaults to doing nothing.
pub trait DiagnosticHook: Send + Sync {
    /// A rollback failed; the connection has been closed.
    fn rollback_failed(&self, table: &str, error: &StoreError) {
        let _ = (table, error);
    }

    /// Closing the connection failed.
    fn close_failed(&self, table: &str, error: &StoreError) {
        let _ = (table, error);
    }

    /// A transient failure is about to be retried.
    fn statement_retried(&self, operation: &str, attempt: u32, error: &StoreError) {
        let _ = (operation, attempt, error);
    }
}
