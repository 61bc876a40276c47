//! Stable ID newtypes for nogan entities.
//!
//! Cells and wires are numbered by independent counters, so the same integer
//! can name both a cell and a wire. The distinct newtypes keep a `CellId` from
//! being used where a `WireId` is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable cell identifier. Never reused once allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellId(pub u32);

/// Stable wire identifier. Never reused once allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WireId(pub u32);

impl CellId {
    /// The container cell every nogan starts with.
    pub const ROOT: CellId = CellId(0);
}

// Display implementations -- just print the inner value.

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
