//! Core data model for nogan signal graphs.
//!
//! A nogan is a mutable graph of typed cells joined by coloured, timed wires.
//! Pulses travel along wires on three independent channels; evaluating a
//! pulse at a cell yields a [`Peak`] and a list of deferred [`Operation`]s.
//!
//! # Modules
//!
//! - [`id`]: `CellId` / `WireId` newtypes
//! - [`cell`]: cells, cell kinds, channels and fire slots
//! - [`wire`]: wires, colours and timings
//! - [`pulse`]: pulses and cell templates
//! - [`peak`]: peaks and operations
//! - [`nogan`]: the graph store
//! - [`topology`]: petgraph-based wiring analysis
//! - [`error`]: NoganError

pub mod cell;
pub mod error;
pub mod id;
pub mod nogan;
pub mod peak;
pub mod pulse;
pub mod topology;
pub mod wire;

// Re-export commonly used types
pub use cell::{Cell, CellKind, Channel, Fire, Position};
pub use error::NoganError;
pub use id::{CellId, WireId};
pub use nogan::{Nogan, Retire};
pub use peak::{CellPatch, Operation, Operations, Peak};
pub use pulse::{CellTemplate, Pulse, PulseKind};
pub use topology::Wiring;
pub use wire::{Timing, Wire, WireColour};
