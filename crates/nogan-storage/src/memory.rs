//! In-memory implementation of [`SnapshotStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests and sessions that do
//! not need persistence. It has the same semantics as the SQLite backend,
//! including digest checks on load.

use std::collections::BTreeMap;

use nogan_core::Nogan;

use crate::error::StorageError;
use crate::hash::digest_hex;
use crate::traits::{decode, SnapshotStore};
use crate::types::{SnapshotId, SnapshotSummary};

/// Data stored for a single snapshot.
#[derive(Debug, Clone)]
struct StoredSnapshot {
    label: String,
    digest: String,
    cells: usize,
    wires: usize,
    body: String,
}

/// Snapshot store backed by an ordered map.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    snapshots: BTreeMap<i64, StoredSnapshot>,
    next_id: i64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        InMemoryStore {
            snapshots: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn stored(&self, id: SnapshotId) -> Result<&StoredSnapshot, StorageError> {
        self.snapshots
            .get(&id.0)
            .ok_or(StorageError::SnapshotNotFound(id.0))
    }

    /// Overwrites a stored body without touching its digest.
    #[cfg(test)]
    fn corrupt(&mut self, id: SnapshotId, body: &str) {
        if let Some(snapshot) = self.snapshots.get_mut(&id.0) {
            snapshot.body = body.to_string();
        }
    }
}

impl SnapshotStore for InMemoryStore {
    fn save(&mut self, label: &str, nogan: &mut Nogan) -> Result<SnapshotId, StorageError> {
        let cells = nogan.cell_count();
        let wires = nogan.wire_count();
        let body = nogan.to_json()?.to_string();
        let digest = digest_hex(&body);

        let id = SnapshotId(self.next_id);
        self.next_id += 1;
        tracing::debug!(snapshot = %id, label, %digest, "saved snapshot");

        self.snapshots.insert(
            id.0,
            StoredSnapshot {
                label: label.to_string(),
                digest,
                cells,
                wires,
                body,
            },
        );
        Ok(id)
    }

    fn load(&self, id: SnapshotId) -> Result<Nogan, StorageError> {
        let stored = self.stored(id)?;
        decode(id, &stored.body, &stored.digest)
    }

    fn list(&self) -> Result<Vec<SnapshotSummary>, StorageError> {
        Ok(self
            .snapshots
            .iter()
            .map(|(id, stored)| SnapshotSummary {
                id: SnapshotId(*id),
                label: stored.label.clone(),
                digest: stored.digest.clone(),
                cells: stored.cells,
                wires: stored.wires,
            })
            .collect())
    }

    fn delete(&mut self, id: SnapshotId) -> Result<(), StorageError> {
        self.snapshots
            .remove(&id.0)
            .map(|_| ())
            .ok_or(StorageError::SnapshotNotFound(id.0))
    }

    fn latest(&self, label: &str) -> Result<Option<SnapshotId>, StorageError> {
        Ok(self
            .snapshots
            .iter()
            .rev()
            .find(|(_, stored)| stored.label == label)
            .map(|(id, _)| SnapshotId(*id)))
    }
}
