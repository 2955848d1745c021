//! CLI command implementations.

pub mod derive;
pub mod fill;
pub mod inspect;
pub mod sync;

use rowsync_core::{ChangeSetSynchronizer, SyncConfig};
use rowsync_store::{SqliteStore, StorePool};
use std::path::Path;
use std::sync::Arc;

/// Opens a synchronizer over an existing database file.
fn synchronizer(
    db: &Path,
    config: SyncConfig,
) -> Result<ChangeSetSynchronizer<SqliteStore>, Box<dyn std::error::Error>> {
    if !db.exists() {
        return Err(format!("No database found at {}", db.display()).into());
    }
    let pool = Arc::new(StorePool::single(SqliteStore::file(db)));
    Ok(ChangeSetSynchronizer::new(pool).with_config(config))
}
