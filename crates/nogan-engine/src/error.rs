//! Propagation error types.
//!
//! An absorbed pulse or a broken cycle is normal control flow and never shows
//! up here. These variants are caller defects (structural violations) or
//! behaviour defects (contract violations).

use thiserror::Error;

use nogan_core::{CellId, Channel, NoganError, PulseKind, WireColour, WireId};

/// Errors produced while planning or committing a propagation run.
#[derive(Debug, Error)]
pub enum PropagationError {
    /// The store rejected a lookup or mutation.
    #[error("store error: {0}")]
    Store(#[from] NoganError),

    /// A behaviour returned a peak that cannot be applied.
    #[error("{pulse} behaviour broke its contract at cell {target}: {reason}")]
    ContractViolation {
        pulse: PulseKind,
        target: CellId,
        reason: String,
    },

    /// A wire was fired on a channel its colour does not carry.
    #[error("wire {wire} is {colour} and cannot carry a {channel} pulse")]
    ChannelMismatch {
        wire: WireId,
        colour: WireColour,
        channel: Channel,
    },

    /// Dispatch arguments could not be encoded as a cache key.
    #[error("failed to encode dispatch key: {0}")]
    Encode(#[from] serde_json::Error),
}
