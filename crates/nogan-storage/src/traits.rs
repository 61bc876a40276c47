//! The [`SnapshotStore`] trait defining the storage contract for snapshots.
//!
//! All backends (InMemoryStore, SqliteStore) implement this trait and are
//! fully swappable.

use nogan_core::Nogan;

use crate::error::StorageError;
use crate::types::{SnapshotId, SnapshotSummary};

/// The storage contract for nogan snapshots.
///
/// The trait is synchronous; a store is owned by a single caller.
pub trait SnapshotStore {
    /// Saves the current state of `nogan` under `label`.
    ///
    /// Takes `&mut` so the store's cached snapshot text can be reused.
    fn save(&mut self, label: &str, nogan: &mut Nogan) -> Result<SnapshotId, StorageError>;

    /// Loads and validates a snapshot.
    ///
    /// Fails with [`StorageError::IntegrityError`] if the body no longer
    /// matches its digest.
    fn load(&self, id: SnapshotId) -> Result<Nogan, StorageError>;

    /// Lists all snapshots, oldest first.
    fn list(&self) -> Result<Vec<SnapshotSummary>, StorageError>;

    /// Deletes a snapshot.
    fn delete(&mut self, id: SnapshotId) -> Result<(), StorageError>;

    /// The newest snapshot saved under `label`, if any.
    fn latest(&self, label: &str) -> Result<Option<SnapshotId>, StorageError>;

    /// Loads the newest snapshot saved under `label`.
    fn load_latest(&self, label: &str) -> Result<Option<Nogan>, StorageError> {
        match self.latest(label)? {
            Some(id) => self.load(id).map(Some),
            None => Ok(None),
        }
    }
}

/// Parses a stored body after checking it against its digest.
pub(crate) fn decode(id: SnapshotId, body: &str, digest: &str) -> Result<Nogan, StorageError> {
    if !crate::hash::verify(body, digest) {
        return Err(StorageError::IntegrityError {
            reason: format!("snapshot {} does not match its digest", id),
        });
    }
    Ok(Nogan::from_json(body)?)
}
