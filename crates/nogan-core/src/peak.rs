//! Peaks and operations: the results of evaluating a behaviour.
//!
//! A [`Peak`] is the outcome of one cell's behaviour for one propagation
//! step. Behaviours never touch the store; they return [`Operation`]s inside
//! the peak, and the engine applies those after the run completes.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cell::{CellKind, Position};
use crate::id::CellId;
use crate::pulse::{CellTemplate, Pulse};

/// Operations carried by a peak. Behaviours emit zero or one in practice.
pub type Operations = SmallVec<[Operation; 1]>;

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// A partial cell template. Only the fields that are `Some` are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CellKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl From<CellTemplate> for CellPatch {
    fn from(template: CellTemplate) -> Self {
        CellPatch {
            kind: Some(template.kind),
            position: template.position,
        }
    }
}

/// A deferred store mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    /// Merge a partial template into an existing cell.
    Modify { id: CellId, template: CellPatch },
    /// The cell fired during this step.
    Fired { id: CellId },
    /// Diagnostic side effect of a spreading ping. No structural effect.
    Pong,
}

impl Operation {
    /// The cell this operation touches, if any.
    pub fn cell(&self) -> Option<CellId> {
        match self {
            Operation::Modify { id, .. } | Operation::Fired { id } => Some(*id),
            Operation::Pong => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Peaks
// ---------------------------------------------------------------------------

/// The success/failure result of one behaviour evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Peak {
    /// The pulse was absorbed. Operations are still applied.
    Failure { operations: Operations },
    /// The cell now holds `pulse`, which continues along matching wires.
    Success { operations: Operations, pulse: Pulse },
}

impl Peak {
    /// A failure with no operations: "nothing here".
    pub fn failure() -> Self {
        Peak::Failure {
            operations: Operations::new(),
        }
    }

    /// A success carrying `pulse` and no operations.
    pub fn success(pulse: Pulse) -> Self {
        Peak::Success {
            operations: Operations::new(),
            pulse,
        }
    }

    /// The peak describing what a fire slot currently holds.
    pub fn from_slot(slot: Option<&Pulse>) -> Self {
        match slot {
            Some(pulse) => Peak::success(pulse.clone()),
            None => Peak::failure(),
        }
    }

    /// Returns `true` for [`Peak::Success`].
    pub fn result(&self) -> bool {
        matches!(self, Peak::Success { .. })
    }

    /// The pulse of a successful peak.
    pub fn pulse(&self) -> Option<&Pulse> {
        match self {
            Peak::Success { pulse, .. } => Some(pulse),
            Peak::Failure { .. } => None,
        }
    }

    pub fn operations(&self) -> &[Operation] {
        match self {
            Peak::Success { operations, .. } | Peak::Failure { operations } => {
                operations.as_slice()
            }
        }
    }

    /// Replaces the operations, keeping the outcome.
    pub fn with_operations(self, operations: Operations) -> Self {
        match self {
            Peak::Success { pulse, .. } => Peak::Success { operations, pulse },
            Peak::Failure { .. } => Peak::Failure { operations },
        }
    }

    /// Replaces the pulse of a success. Failures stay failures.
    pub fn with_pulse(self, pulse: Pulse) -> Self {
        match self {
            Peak::Success { operations, .. } => Peak::Success { operations, pulse },
            failure => failure,
        }
    }
}
