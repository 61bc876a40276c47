//! Dispatch trace recording for the propagation engine.
//!
//! When tracing is enabled via [`PropagationConfig::trace_enabled`], the
//! engine records a [`TraceEntry`] for every behaviour evaluation, in
//! evaluation order.
//!
//! [`PropagationConfig::trace_enabled`]: crate::propagate::PropagationConfig::trace_enabled

use serde::Serialize;

use nogan_core::{CellId, Channel, Pulse};

/// What a dispatch did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The behaviour failed; the pulse stops here.
    Absorbed,
    /// The behaviour succeeded with the pulse the target already held.
    Unchanged,
    /// The target now holds a new pulse, which continues along its outputs.
    Recorded,
}

/// A single behaviour evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub source: CellId,
    pub target: CellId,
    pub channel: Channel,
    /// The arriving pulse.
    pub pulse: Pulse,
    pub outcome: Outcome,
    /// Number of operations the behaviour emitted.
    pub operations: usize,
}
