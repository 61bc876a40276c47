//! Storage-layer types for snapshot identity and metadata.
//!
//! [`SnapshotId`] lives here rather than in nogan-core because a nogan only
//! gains an ID when it is persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a stored snapshot.
///
/// The inner `i64` aligns with SQLite's `INTEGER PRIMARY KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub i64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary of a stored snapshot (for listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub label: String,
    /// Hex blake3 digest of the snapshot body.
    pub digest: String,
    /// Live cells at save time.
    pub cells: usize,
    /// Live wires at save time.
    pub wires: usize,
}
