//! Configuration for synchronization.

use rowsync_store::{IsolationLevel, DEFAULT_COMMAND_TIMEOUT};
use std::time::Duration;

/// Configuration for a [`crate::ChangeSetSynchronizer`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Roll back and report `Failed` if any row fails.
    pub rollback_all_on_error: bool,
    /// Per-statement timeout used by `synchronize_with_defaults`.
    pub command_timeout: Duration,
    /// Retry configuration for transient store errors.
    pub retry: RetryConfig,
    /// Isolation level of the synchronization transaction.
    pub isolation: IsolationLevel,
    /// Leave the connection open when the call finishes.
    pub keep_connection_open: bool,
}

impl SyncConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rollback_all_on_error: true,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            retry: RetryConfig::default(),
            isolation: IsolationLevel::ReadCommitted,
            keep_connection_open: false,
        }
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_rollback_all_on_error(mut self, rollback: bool) -> Self {
        self.rollback_all_on_error = rollback;
        self
    }

    /// Sets the per-statement timeout.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the transaction isolation level.
    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// Keeps the connection open between calls.
    #[must_use]
    pub fn with_keep_connection_open(mut self, keep: bool) -> Self {
        self.keep_connection_open = keep;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded retry of transient store errors.
///
/// The wait before retry `n` is `base_backoff * backoff_factor^(n-1)`,
/// capped at `max_backoff`, plus up to a quarter more when `jitter` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of executions, including the first. Zero acts as one.
    pub max_attempts: u32,
    /// Wait before the first retry.
    pub base_backoff: Duration,
    /// Upper bound on any single wait.
    pub max_backoff: Duration,
    /// Growth of the wait per retry.
    pub backoff_factor: f64,
    /// Spread retries of concurrent callers apart.
    pub jitter: bool,
}

impl RetryConfig {
    /// Up to `max_attempts` executions with exponential backoff from 100 ms.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter: true,
        }
    }

    /// Executes each statement once.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::immediate(1)
    }

    /// Retries without waiting. Used by tests.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_factor: 1.0,
            jitter: false,
        }
    }

    /// Sets the wait before the first retry.
    #[must_use]
    pub fn with_base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// Sets the cap on a single wait.
    #[must_use]
    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Sets the growth factor.
    #[must_use]
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Enables or disables jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns the effective attempt count.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait after `failed` executions have failed, before the next one.
    pub fn backoff_after(&self, failed: u32) -> Duration {
        if failed == 0 || self.base_backoff.is_zero() {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(failed - 1).unwrap_or(i32::MAX);
        let grown = self.base_backoff.as_secs_f64() * self.backoff_factor.powi(exponent);
        // A negative or NaN factor waits nothing rather than panicking.
        let capped = grown.max(0.0).min(self.max_backoff.as_secs_f64());
        let spread = if self.jitter { capped * 0.25 * unit_noise() } else { 0.0 };
        Duration::try_from_secs_f64(capped + spread).unwrap_or(self.max_backoff)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// A fraction in `[0, 1)` taken from a random v4 UUID.
fn unit_noise() -> f64 {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    f64::from(u16::from_le_bytes([bytes[0], bytes[1]])) / 65536.0
}
