//! Wires: coloured, timed directed edges between cells.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::Channel;
use crate::error::NoganError;
use crate::id::{CellId, WireId};

/// The channel filter of a wire. `Any` carries pulses on every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireColour {
    Any,
    Blue,
    Green,
    Red,
}

impl WireColour {
    /// Returns `true` if a pulse on `channel` may travel along this wire.
    pub fn matches(self, channel: Channel) -> bool {
        match self {
            WireColour::Any => true,
            WireColour::Red => channel == Channel::Red,
            WireColour::Green => channel == Channel::Green,
            WireColour::Blue => channel == Channel::Blue,
        }
    }

    /// The single channel this colour is restricted to, or `None` for `Any`.
    pub fn channel(self) -> Option<Channel> {
        match self {
            WireColour::Any => None,
            WireColour::Red => Some(Channel::Red),
            WireColour::Green => Some(Channel::Green),
            WireColour::Blue => Some(Channel::Blue),
        }
    }
}

impl fmt::Display for WireColour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel() {
            Some(channel) => channel.fmt(f),
            None => f.write_str("any"),
        }
    }
}

/// When a wire fires relative to its source cell's own tick.
///
/// Serialized as the integers `-1`, `0` and `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Timing {
    Before,
    Now,
    After,
}

impl Timing {
    /// All timings, in phase order.
    pub const PHASES: [Timing; 3] = [Timing::Before, Timing::Now, Timing::After];

    /// Zero-based phase index within a tick.
    pub fn phase(self) -> usize {
        match self {
            Timing::Before => 0,
            Timing::Now => 1,
            Timing::After => 2,
        }
    }
}

impl TryFrom<i8> for Timing {
    type Error = NoganError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Timing::Before),
            0 => Ok(Timing::Now),
            1 => Ok(Timing::After),
            _ => Err(NoganError::InvalidTiming { value }),
        }
    }
}

impl From<Timing> for i8 {
    fn from(timing: Timing) -> i8 {
        match timing {
            Timing::Before => -1,
            Timing::Now => 0,
            Timing::After => 1,
        }
    }
}

/// A directed edge carrying pulses from `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    pub id: WireId,
    pub colour: WireColour,
    pub timing: Timing,
    pub source: CellId,
    pub target: CellId,
}

impl Wire {
    /// Returns `true` if the wire connects a cell to itself.
    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }
}
