//! The `snapshots` table and connection setup for [`SqliteStore`](crate::SqliteStore).
//!
//! One row per saved store:
//!
//! | column       | contents                                   |
//! |--------------|--------------------------------------------|
//! | `id`         | autoincrement key, becomes a [`SnapshotId`](crate::SnapshotId) |
//! | `label`      | caller-chosen name, not unique             |
//! | `digest`     | blake3 hex of `body`                       |
//! | `cells`      | live cell count at save time               |
//! | `wires`      | live wire count at save time               |
//! | `body`       | the store's JSON snapshot text             |
//! | `created_at` | SQLite `datetime('now')` at insert         |
//!
//! `idx_snapshots_label (label, id)` answers "newest snapshot for a label"
//! without a scan. The table is created by an embedded `rusqlite_migration`
//! step, so reopening an existing file is a no-op.

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

use crate::error::StorageError;

/// Column order of `snapshots`, as created by the migrations.
pub const SNAPSHOT_COLUMNS: [&str; 7] = [
    "id",
    "label",
    "digest",
    "cells",
    "wires",
    "body",
    "created_at",
];

/// Where a snapshot database lives.
#[derive(Debug, Clone, Copy)]
pub enum Location<'a> {
    File(&'a str),
    Memory,
}

fn snapshot_migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!(
        "migrations/001_initial_schema.sql"
    ))])
}

/// Opens a snapshot database, brings the `snapshots` table up to date and
/// checks its columns.
pub fn connect(location: Location<'_>) -> Result<Connection, StorageError> {
    let mut conn = match location {
        Location::File(path) => {
            let conn = Connection::open(path)?;
            // In-memory databases cannot use WAL.
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn
        }
        Location::Memory => Connection::open_in_memory()?,
    };
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    snapshot_migrations()
        .to_latest(&mut conn)
        .map_err(|e| StorageError::Migration(e.to_string()))?;
    check_snapshot_table(&conn)?;
    Ok(conn)
}

/// Fails when `snapshots` does not have exactly [`SNAPSHOT_COLUMNS`], e.g. a
/// file written by something else that happens to share the table name.
pub fn check_snapshot_table(conn: &Connection) -> Result<(), StorageError> {
    let mut stmt =
        conn.prepare("SELECT name FROM pragma_table_info('snapshots') ORDER BY cid")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    if columns != SNAPSHOT_COLUMNS {
        return Err(StorageError::Migration(format!(
            "snapshots table has columns {columns:?}, expected {SNAPSHOT_COLUMNS:?}"
        )));
    }
    Ok(())
}
