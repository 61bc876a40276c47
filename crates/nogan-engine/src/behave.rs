//! Behaviours: one pure function per pulse kind.
//!
//! A [`Behaviour`] receives the source and target cells, the peak the target
//! currently holds (`previous`) and the incoming peak (`next`), and returns the
//! peak the target should end up with. Behaviours never mutate the store; any
//! side effect is expressed as an [`Operation`] inside the returned peak.
//!
//! The [`BehaviourRegistry`] maps each [`PulseKind`] to its behaviour. Kinds
//! without an entry fall back to [`override_pulse`].

use std::collections::HashMap;
use std::fmt;

use smallvec::smallvec;

use nogan_core::{Cell, CellKind, Operation, Peak, Pulse, PulseKind};

/// Everything a behaviour may look at.
#[derive(Debug, Clone, Copy)]
pub struct Stimulus<'a> {
    /// The cell the pulse is arriving from. Equals `target` for an injection.
    pub source: &'a Cell,
    /// The cell the pulse is arriving at.
    pub target: &'a Cell,
    /// What the target currently holds on this channel.
    pub previous: &'a Peak,
    /// The arriving pulse, as a success with no operations.
    pub next: &'a Peak,
}

/// A pure transformation from a stimulus to the resulting peak.
pub type Behaviour = fn(&Stimulus<'_>) -> Peak;

// ---------------------------------------------------------------------------
// Built-in behaviours
// ---------------------------------------------------------------------------

/// The newest pulse always wins.
pub fn override_pulse(stimulus: &Stimulus<'_>) -> Peak {
    stimulus.next.clone()
}

/// Raw pulses only spread to cells holding no pulse.
///
/// A raw pulse leaving a creation cell becomes a creation pulse stamping a
/// recording cell.
pub fn raw(stimulus: &Stimulus<'_>) -> Peak {
    if stimulus.previous.result() {
        return stimulus.previous.clone();
    }
    match stimulus.source.kind {
        CellKind::Creation => stimulus.next.clone().with_pulse(Pulse::default_creation()),
        _ => stimulus.next.clone(),
    }
}

/// Diagnostic probe: emits a pong wherever it spreads.
///
/// Stopper cells absorb it, and a cell already holding a ping is left alone.
pub fn ping(stimulus: &Stimulus<'_>) -> Peak {
    if stimulus.target.kind == CellKind::Stopper {
        return stimulus.previous.clone();
    }
    if matches!(stimulus.previous.pulse(), Some(Pulse::Ping)) {
        return stimulus.previous.clone();
    }
    stimulus
        .next
        .clone()
        .with_operations(smallvec![Operation::Pong])
}

/// Creation pulses rewrite the first slot they reach into their template and
/// stop there. Anywhere else they override.
pub fn creation(stimulus: &Stimulus<'_>) -> Peak {
    if stimulus.target.kind == CellKind::Slot {
        if let Some(Pulse::Creation { template }) = stimulus.next.pulse() {
            return Peak::Failure {
                operations: smallvec![Operation::Modify {
                    id: stimulus.target.id,
                    template: template.clone().into(),
                }],
            };
        }
    }
    stimulus.next.clone()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps pulse kinds to behaviours.
#[derive(Clone)]
pub struct BehaviourRegistry {
    behaviours: HashMap<PulseKind, Behaviour>,
}

impl Default for BehaviourRegistry {
    /// The built-in behaviours: raw, ping, creation, and override for
    /// destruction.
    fn default() -> Self {
        let mut registry = BehaviourRegistry::empty();
        registry.register(PulseKind::Raw, raw);
        registry.register(PulseKind::Ping, ping);
        registry.register(PulseKind::Creation, creation);
        registry.register(PulseKind::Destruction, override_pulse);
        registry
    }
}

impl BehaviourRegistry {
    /// A registry where every kind overrides.
    pub fn empty() -> Self {
        BehaviourRegistry {
            behaviours: HashMap::new(),
        }
    }

    /// Adds or replaces the behaviour for `kind`, returning the old one.
    pub fn register(&mut self, kind: PulseKind, behaviour: Behaviour) -> Option<Behaviour> {
        self.behaviours.insert(kind, behaviour)
    }

    /// Returns `true` if `kind` has its own behaviour.
    pub fn is_registered(&self, kind: PulseKind) -> bool {
        self.behaviours.contains_key(&kind)
    }

    /// The behaviour for `kind`, falling back to [`override_pulse`].
    pub fn behaviour(&self, kind: PulseKind) -> Behaviour {
        self.behaviours
            .get(&kind)
            .copied()
            .unwrap_or(override_pulse)
    }

    /// Evaluates the behaviour selected by the arriving pulse.
    pub fn evaluate(&self, stimulus: &Stimulus<'_>) -> Peak {
        match stimulus.next.pulse() {
            Some(pulse) => (self.behaviour(pulse.kind()))(stimulus),
            None => override_pulse(stimulus),
        }
    }
}

impl fmt::Debug for BehaviourRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<String> = self.behaviours.keys().map(|k| k.to_string()).collect();
        kinds.sort();
        f.debug_struct("BehaviourRegistry")
            .field("registered", &kinds)
            .finish()
    }
}
