//! A small blocking pool of relational stores.
//!
//! Each synchronization call checks a store out for its own use and returns
//! it when the guard drops, so concurrent callers never share a connection.

use crate::error::{StoreError, StoreResult};
use crate::store::RelationalStore;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

/// Creates a new store when the pool has room to grow.
pub type StoreFactory<S> = Box<dyn Fn() -> StoreResult<S> + Send + Sync>;

/// Pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of stores alive at once.
    pub max_size: usize,
    /// How long a checkout waits for a store before giving up.
    pub checkout_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 4,
            checkout_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    /// Sets the maximum pool size. A size of zero is treated as one.
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    /// Sets the checkout timeout.
    #[must_use]
    pub fn with_checkout_timeout(mut self, timeout: Duration) -> Self {
        self.checkout_timeout = timeout;
        self
    }
}

struct PoolState<S> {
    idle: Vec<S>,
    total: usize,
}

/// A pool of stores handed out one caller at a time.
///
/// # Example
///
/// ```rust
/// use rowsync_store::{PoolConfig, RelationalStore, SqliteStore, StorePool};
///
/// let pool = StorePool::new(PoolConfig::default(), || Ok(SqliteStore::memory()));
/// let mut store = pool.checkout().unwrap();
/// store.open().unwrap();
/// assert!(store.is_open());
/// ```
pub struct StorePool<S> {
    factory: Option<StoreFactory<S>>,
    config: PoolConfig,
    state: Mutex<PoolState<S>>,
    available: Condvar,
}

impl<S: RelationalStore> StorePool<S> {
    /// Creates an empty pool that builds stores on demand.
    pub fn new<F>(config: PoolConfig, factory: F) -> Self
    where
        F: Fn() -> StoreResult<S> + Send + Sync + 'static,
    {
        Self {
            factory: Some(Box::new(factory)),
            config: PoolConfig {
                max_size: config.max_size.max(1),
                ..config
            },
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                total: 0,
            }),
            available: Condvar::new(),
        }
    }

    /// Creates a pool over a fixed set of stores. It never grows.
    pub fn fixed(stores: Vec<S>) -> Self {
        let total = stores.len();
        Self {
            factory: None,
            config: PoolConfig {
                max_size: total,
                ..PoolConfig::default()
            },
            state: Mutex::new(PoolState { idle: stores, total }),
            available: Condvar::new(),
        }
    }

    /// Creates a pool holding a single store.
    pub fn single(store: S) -> Self {
        Self::fixed(vec![store])
    }

    /// Sets the checkout timeout.
    #[must_use]
    pub fn with_checkout_timeout(mut self, timeout: Duration) -> Self {
        self.config.checkout_timeout = timeout;
        self
    }

    /// Returns the pool configuration.
    #[must_use]
    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Returns the number of stores alive, checked out or idle.
    pub fn size(&self) -> usize {
        self.state.lock().total
    }

    /// Returns the number of idle stores.
    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Checks a store out, waiting up to the checkout timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PoolExhausted`] if no store frees up in time,
    /// or the factory's error if a new store cannot be created.
    pub fn checkout(&self) -> StoreResult<PooledStore<'_, S>> {
        let deadline = Instant::now() + self.config.checkout_timeout;
        let mut state = self.state.lock();

        loop {
            if let Some(store) = state.idle.pop() {
                return Ok(PooledStore::new(self, store));
            }

            if let Some(factory) = &self.factory {
                if state.total < self.config.max_size {
                    state.total += 1;
                    drop(state);
                    return match factory() {
                        Ok(store) => {
                            tracing::debug!("pool created a new store");
                            Ok(PooledStore::new(self, store))
                        }
                        Err(err) => {
                            self.state.lock().total -= 1;
                            self.available.notify_one();
                            Err(err)
                        }
                    };
                }
            }

            let timed_out = self.available.wait_until(&mut state, deadline).timed_out();
            if timed_out && state.idle.is_empty() {
                tracing::warn!(
                    waited = ?self.config.checkout_timeout,
                    size = state.total,
                    "store pool exhausted"
                );
                return Err(StoreError::PoolExhausted {
                    waited: self.config.checkout_timeout,
                });
            }
        }
    }

    fn check_in(&self, store: S) {
        self.state.lock().idle.push(store);
        self.available.notify_one();
    }
}

impl<S> fmt::Debug for StorePool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StorePool")
            .field("config", &self.config)
            .field("total", &state.total)
            .field("idle", &state.idle.len())
            .finish_non_exhaustive()
    }
}

/// A store checked out of a [`StorePool`]. Returned to the pool on drop.
pub struct PooledStore<'a, S: RelationalStore> {
    pool: &'a StorePool<S>,
    store: Option<S>,
}

impl<'a, S: RelationalStore> PooledStore<'a, S> {
    fn new(pool: &'a StorePool<S>, store: S) -> Self {
        Self {
            pool,
            store: Some(store),
        }
    }
}

impl<S: RelationalStore + fmt::Debug> fmt::Debug for PooledStore<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledStore").field(&self.store).finish()
    }
}

impl<S: RelationalStore> Deref for PooledStore<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        match &self.store {
            Some(store) => store,
            None => unreachable!("pooled store is only taken on drop"),
        }
    }
}

impl<S: RelationalStore> DerefMut for PooledStore<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        match &mut self.store {
            Some(store) => store,
            None => unreachable!("pooled store is only taken on drop"),
        }
    }
}

impl<S: RelationalStore> Drop for PooledStore<'_, S> {
    fn drop(&mut self) {
        if let Some(store) = self.store.take() {
            self.pool.check_in(store);
        }
    }
}
