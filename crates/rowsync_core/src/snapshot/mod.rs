//! Change-tracked, table-shaped row collections.

mod column;
mod row;
mod table;

pub use column::Column;
pub use row::{Row, RowState};
pub use table::{SnapshotError, SnapshotResult, TabularSnapshot};
