//! SQLite implementation of [`SnapshotStore`].
//!
//! Each snapshot is one row in the `snapshots` table. Bodies are stored as
//! JSON text next to their digest and live cell/wire counts, so listing
//! never parses a body.

use rusqlite::{params, Connection, OptionalExtension};

use nogan_core::Nogan;

use crate::error::StorageError;
use crate::hash::digest_hex;
use crate::schema::{connect, Location};
use crate::traits::{decode, SnapshotStore};
use crate::types::{SnapshotId, SnapshotSummary};

/// Snapshot store backed by a SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = connect(Location::File(path))?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = connect(Location::Memory)?;
        Ok(SqliteStore { conn })
    }

    /// Verifies a snapshot exists, returning an error if not.
    fn assert_snapshot_exists(&self, id: SnapshotId) -> Result<(), StorageError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM snapshots WHERE id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::SnapshotNotFound(id.0));
        }
        Ok(())
    }
}

fn count(value: i64) -> Result<usize, StorageError> {
    usize::try_from(value).map_err(|_| StorageError::IntegrityError {
        reason: format!("negative entity count {}", value),
    })
}

impl SnapshotStore for SqliteStore {
    fn save(&mut self, label: &str, nogan: &mut Nogan) -> Result<SnapshotId, StorageError> {
        let cells = nogan.cell_count() as i64;
        let wires = nogan.wire_count() as i64;
        let body = nogan.to_json()?;
        let digest = digest_hex(body);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO snapshots (label, digest, cells, wires, body) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![label, digest, cells, wires, body],
        )?;
        let id = SnapshotId(tx.last_insert_rowid());
        tx.commit()?;

        tracing::debug!(snapshot = %id, label, %digest, "saved snapshot");
        Ok(id)
    }

    fn load(&self, id: SnapshotId) -> Result<Nogan, StorageError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT body, digest FROM snapshots WHERE id = ?1",
                params![id.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (body, digest) = row.ok_or(StorageError::SnapshotNotFound(id.0))?;
        decode(id, &body, &digest)
    }

    fn list(&self) -> Result<Vec<SnapshotSummary>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, label, digest, cells, wires FROM snapshots ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        let mut result = Vec::new();
        for row in rows {
            let (id, label, digest, cells, wires) = row?;
            result.push(SnapshotSummary {
                id: SnapshotId(id),
                label,
                digest,
                cells: count(cells)?,
                wires: count(wires)?,
            });
        }
        Ok(result)
    }

    fn delete(&mut self, id: SnapshotId) -> Result<(), StorageError> {
        self.assert_snapshot_exists(id)?;
        self.conn
            .execute("DELETE FROM snapshots WHERE id = ?1", params![id.0])?;
        tracing::debug!(snapshot = %id, "deleted snapshot");
        Ok(())
    }

    fn latest(&self, label: &str) -> Result<Option<SnapshotId>, StorageError> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM snapshots WHERE label = ?1 ORDER BY id DESC LIMIT 1",
                params![label],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(SnapshotId))
    }
}
