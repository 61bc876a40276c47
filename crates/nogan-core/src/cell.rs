//! Cells: the typed nodes of a nogan.
//!
//! A [`Cell`] sits in a containment tree (`parent` / `cells`) and in the
//! wiring graph (`inputs` / `outputs`). It holds at most one pulse per
//! [`Channel`] in its [`Fire`] slots.

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{CellId, WireId};
use crate::pulse::Pulse;

/// A 2D coordinate.
pub type Position = [f64; 2];

/// Adjacency list of wire ids. Most cells have only a handful of wires.
pub type WireList = SmallVec<[WireId; 4]>;

// ---------------------------------------------------------------------------
// Cell kinds
// ---------------------------------------------------------------------------

/// The type tag of a cell.
///
/// Serialized in lowercase (`"slot"`, `"recording"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// A containment root.
    Root,
    /// A cell with no behaviour of its own.
    Dummy,
    /// An open slot. Creation pulses stamp their template onto it.
    Slot,
    /// Turns raw pulses leaving it into creation pulses.
    Creation,
    Destruction,
    /// The default template stamped by a creation cell.
    Recording,
    /// Absorbs ping pulses.
    Stopper,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellKind::Root => "root",
            CellKind::Dummy => "dummy",
            CellKind::Slot => "slot",
            CellKind::Creation => "creation",
            CellKind::Destruction => "destruction",
            CellKind::Recording => "recording",
            CellKind::Stopper => "stopper",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Channels and fire slots
// ---------------------------------------------------------------------------

/// One of the three independent pulse lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// All channels, in slot order.
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        };
        f.write_str(name)
    }
}

/// The pulse currently held on each channel of a cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fire {
    pub red: Option<Pulse>,
    pub green: Option<Pulse>,
    pub blue: Option<Pulse>,
}

impl Fire {
    /// Returns the pulse held on `channel`, if any.
    pub fn get(&self, channel: Channel) -> Option<&Pulse> {
        match channel {
            Channel::Red => self.red.as_ref(),
            Channel::Green => self.green.as_ref(),
            Channel::Blue => self.blue.as_ref(),
        }
    }

    /// Replaces the pulse held on `channel`, returning the old one.
    pub fn set(&mut self, channel: Channel, pulse: Option<Pulse>) -> Option<Pulse> {
        let slot = match channel {
            Channel::Red => &mut self.red,
            Channel::Green => &mut self.green,
            Channel::Blue => &mut self.blue,
        };
        std::mem::replace(slot, pulse)
    }

    /// Returns `true` if no channel holds a pulse.
    pub fn is_empty(&self) -> bool {
        self.red.is_none() && self.green.is_none() && self.blue.is_none()
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A node in the signal graph.
///
/// Cells are only created through [`Nogan`](crate::nogan::Nogan), which keeps
/// the containment and adjacency lists consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    #[serde(rename = "type")]
    pub kind: CellKind,
    /// Containing cell. The root cell is its own parent.
    pub parent: CellId,
    pub position: Position,
    /// Child cells, in insertion order.
    #[serde(default)]
    pub cells: IndexSet<CellId>,
    /// Wires targeting this cell.
    #[serde(default)]
    pub inputs: WireList,
    /// Wires leaving this cell.
    #[serde(default)]
    pub outputs: WireList,
    #[serde(default)]
    pub fire: Fire,
}

impl Cell {
    /// Creates an unlinked cell with empty fire slots.
    pub fn new(id: CellId, kind: CellKind, parent: CellId, position: Position) -> Self {
        Cell {
            id,
            kind,
            parent,
            position,
            cells: IndexSet::new(),
            inputs: WireList::new(),
            outputs: WireList::new(),
            fire: Fire::default(),
        }
    }

    /// Returns `true` if this cell is the containment root.
    pub fn is_root(&self) -> bool {
        self.id == self.parent
    }
}
