//! Core error types for nogan-core.
//!
//! Uses `thiserror` for structured, matchable variants. Every structural
//! violation names the offending id so callers can report it directly.

use crate::id::{CellId, WireId};
use thiserror::Error;

/// Errors produced by the graph store and its model types.
#[derive(Debug, Error)]
pub enum NoganError {
    /// A cell id was never allocated by this store.
    #[error("cell not found: CellId({id})", id = id.0)]
    CellNotFound { id: CellId },

    /// A wire id was never allocated by this store.
    #[error("wire not found: WireId({id})", id = id.0)]
    WireNotFound { id: WireId },

    /// The cell id was allocated but has since been archived or deleted.
    #[error("cell is retired: CellId({id})", id = id.0)]
    CellRetired { id: CellId },

    /// The wire id was allocated but has since been archived or deleted.
    #[error("wire is retired: WireId({id})", id = id.0)]
    WireRetired { id: WireId },

    /// A cell was created or restored under a parent that is not live.
    #[error("parent of cell {id} is not live: CellId({parent})", parent = parent.0)]
    ParentNotFound { id: CellId, parent: CellId },

    /// The container root cannot be archived or deleted.
    #[error("the root cell cannot be removed")]
    RootRemoval,

    /// Restoration was requested for an id that is not in the archive.
    #[error("not archived: {what}")]
    NotArchived { what: String },

    /// A cell position with a NaN or infinite coordinate.
    #[error("cell {id} has a non-finite position [{x}, {y}]")]
    InvalidPosition { id: CellId, x: f64, y: f64 },

    /// A wire timing outside of -1, 0 and 1.
    #[error("invalid timing: {value}")]
    InvalidTiming { value: i8 },

    /// A structural invariant was violated.
    #[error("nogan inconsistency: {reason}")]
    Inconsistency { reason: String },

    /// JSON serialization or deserialization of a snapshot failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
