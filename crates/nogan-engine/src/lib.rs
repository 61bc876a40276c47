//! Pulse propagation for nogan signal graphs.
//!
//! # Architecture
//!
//! Propagation is a work-list walk over the wiring:
//!
//! - [`Engine`] owns a [`BehaviourRegistry`] and a [`PropagationConfig`].
//! - [`Engine::plan`] and [`Engine::plan_wire`] run a pulse against a
//!   read-only [`Nogan`](nogan_core::Nogan) and return a [`Plan`].
//! - [`Plan::commit`] applies the plan's operations, then its fire writes.
//! - [`Memo`] makes every `(source, target, channel, pulse)` dispatch happen
//!   at most once per run, which also breaks wiring cycles.
//! - [`TraceEntry`] records each evaluation when tracing is enabled.
//!
//! # Usage
//!
//! ```ignore
//! let engine = Engine::new(PropagationConfig::default());
//! let commit = engine.inject(&mut nogan, cell, Channel::Red, Pulse::Raw)?;
//! for op in &commit.operations { /* ... */ }
//! ```

pub mod behave;
pub mod error;
pub mod memo;
pub mod propagate;
pub mod trace;

pub use behave::{Behaviour, BehaviourRegistry, Stimulus};
pub use error::PropagationError;
pub use memo::{DispatchKey, Lookup, Memo};
pub use propagate::{Commit, Engine, FireWrite, Plan, PropagationConfig, RunStats};
pub use trace::{Outcome, TraceEntry};
