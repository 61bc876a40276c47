//! The pulse propagation engine.
//!
//! A run starts from one injected pulse and walks the wiring with an explicit
//! work list. Every visited `(source, target, channel, pulse)` is dispatched
//! at most once through the [`Memo`] cache, so wiring cycles terminate.
//!
//! # Phases
//!
//! The work list holds one FIFO queue per [`Timing`]. The earliest non-empty
//! queue is always drained first, so a `-1` wire scheduled by any dispatch
//! runs before pending `0` work, which runs before pending `1` work. Within
//! a queue, work is ordered by scheduling; a cell schedules its outputs in
//! ascending wire id.
//!
//! # Plan and commit
//!
//! Planning only reads the store. It produces a [`Plan`]: the operations in
//! the order they were emitted, plus the pulses to write into fire slots.
//! [`Plan::commit`] applies both. Dropping a plan abandons the run with no
//! mutation.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

use nogan_core::{
    Cell, CellId, Channel, Nogan, Operation, Peak, Pulse, PulseKind, Timing, WireId,
};

use crate::behave::{BehaviourRegistry, Stimulus};
use crate::error::PropagationError;
use crate::memo::{DispatchKey, Lookup, Memo};
use crate::trace::{Outcome, TraceEntry};

/// Configuration for the propagation engine.
#[derive(Debug, Clone, Default)]
pub struct PropagationConfig {
    /// Whether to record a [`TraceEntry`] per dispatch.
    pub trace_enabled: bool,
}

/// Counters describing one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Behaviour evaluations. At most one per distinct dispatch key.
    pub evaluations: usize,
    /// Dispatches skipped because the key was already final.
    pub cache_hits: usize,
    /// Dispatches skipped because the key was still pending.
    pub cycles_broken: usize,
}

/// A pulse to write into a fire slot at commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireWrite {
    pub cell: CellId,
    pub channel: Channel,
    pub pulse: Pulse,
}

/// The uncommitted result of a propagation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    /// Operations in the order they were produced.
    pub operations: Vec<Operation>,
    /// Final pulse per touched `(cell, channel)`, in cell then channel order.
    pub writes: Vec<FireWrite>,
    pub stats: RunStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEntry>>,
}

/// A plan that has been applied to a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commit {
    pub operations: Vec<Operation>,
    pub writes: Vec<FireWrite>,
    pub stats: RunStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEntry>>,
}

impl Plan {
    /// Applies the operations in order, then writes the fire slots.
    ///
    /// Every referenced cell is checked before anything is mutated, so a plan
    /// made stale by an intervening edit fails without touching the store.
    pub fn commit(self, nogan: &mut Nogan) -> Result<Commit, PropagationError> {
        for id in self
            .operations
            .iter()
            .filter_map(Operation::cell)
            .chain(self.writes.iter().map(|write| write.cell))
        {
            nogan.cell(id)?;
        }

        nogan.clear_fired();
        for operation in &self.operations {
            nogan.apply_operation(operation)?;
        }
        for write in &self.writes {
            nogan.set_fire(write.cell, write.channel, Some(write.pulse.clone()))?;
        }

        tracing::debug!(
            operations = self.operations.len(),
            writes = self.writes.len(),
            evaluations = self.stats.evaluations,
            "committed propagation"
        );

        Ok(Commit {
            operations: self.operations,
            writes: self.writes,
            stats: self.stats,
            trace: self.trace,
        })
    }

    /// Returns `true` if committing would change nothing but the fired set.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.writes.is_empty()
    }
}

/// Runs pulses through a nogan using a behaviour registry.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    registry: BehaviourRegistry,
    config: PropagationConfig,
}

impl Engine {
    /// An engine with the built-in behaviours.
    pub fn new(config: PropagationConfig) -> Self {
        Engine {
            registry: BehaviourRegistry::default(),
            config,
        }
    }

    pub fn with_registry(registry: BehaviourRegistry, config: PropagationConfig) -> Self {
        Engine { registry, config }
    }

    pub fn registry(&self) -> &BehaviourRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BehaviourRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Plans the run started by injecting `pulse` at `target` on `channel`.
    ///
    /// The target is dispatched first, as its own source.
    pub fn plan(
        &self,
        nogan: &Nogan,
        target: CellId,
        channel: Channel,
        pulse: Pulse,
    ) -> Result<Plan, PropagationError> {
        nogan.cell(target)?;
        tracing::debug!(cell = %target, %channel, pulse = %pulse.kind(), "injecting pulse");

        let mut run = Run::new(nogan, &self.registry, &self.config);
        run.schedule(target, target, channel, pulse, Timing::Now)?;
        run.finish()
    }

    /// Plans the run started by firing `wire` with `pulse` on `channel`.
    ///
    /// The wire's target is dispatched first, with the wire's source as
    /// source, in the wire's timing phase.
    pub fn plan_wire(
        &self,
        nogan: &Nogan,
        wire: WireId,
        channel: Channel,
        pulse: Pulse,
    ) -> Result<Plan, PropagationError> {
        let wire = nogan.wire(wire)?;
        if !wire.colour.matches(channel) {
            return Err(PropagationError::ChannelMismatch {
                wire: wire.id,
                colour: wire.colour,
                channel,
            });
        }
        tracing::debug!(wire = %wire.id, %channel, pulse = %pulse.kind(), "firing wire");

        let mut run = Run::new(nogan, &self.registry, &self.config);
        run.schedule(wire.source, wire.target, channel, pulse, wire.timing)?;
        run.finish()
    }

    /// Injects a pulse and commits the run.
    pub fn inject(
        &self,
        nogan: &mut Nogan,
        target: CellId,
        channel: Channel,
        pulse: Pulse,
    ) -> Result<Commit, PropagationError> {
        self.plan(nogan, target, channel, pulse)?.commit(nogan)
    }

    /// Fires a wire and commits the run.
    pub fn fire_wire(
        &self,
        nogan: &mut Nogan,
        wire: WireId,
        channel: Channel,
        pulse: Pulse,
    ) -> Result<Commit, PropagationError> {
        self.plan_wire(nogan, wire, channel, pulse)?.commit(nogan)
    }
}

// ---------------------------------------------------------------------------
// A single run
// ---------------------------------------------------------------------------

/// A scheduled dispatch. Its key is already reserved in the memo.
#[derive(Debug)]
struct Task {
    key: DispatchKey,
    source: CellId,
    target: CellId,
    channel: Channel,
    pulse: Pulse,
}

struct Run<'a> {
    nogan: &'a Nogan,
    registry: &'a BehaviourRegistry,
    memo: Memo<DispatchKey, Peak>,
    /// One queue per timing phase.
    phases: [VecDeque<Task>; 3],
    /// Pulses recorded so far, overlaying the store's fire slots.
    pending: BTreeMap<(CellId, Channel), Pulse>,
    fired: BTreeSet<CellId>,
    operations: Vec<Operation>,
    stats: RunStats,
    trace: Option<Vec<TraceEntry>>,
}

impl<'a> Run<'a> {
    fn new(nogan: &'a Nogan, registry: &'a BehaviourRegistry, config: &PropagationConfig) -> Self {
        Run {
            nogan,
            registry,
            memo: Memo::new(),
            phases: Default::default(),
            pending: BTreeMap::new(),
            fired: BTreeSet::new(),
            operations: Vec::new(),
            stats: RunStats::default(),
            trace: config.trace_enabled.then(Vec::new),
        }
    }

    /// Queues a dispatch unless its key has been seen this run.
    fn schedule(
        &mut self,
        source: CellId,
        target: CellId,
        channel: Channel,
        pulse: Pulse,
        timing: Timing,
    ) -> Result<(), PropagationError> {
        let key = DispatchKey::encode(source, target, channel, &pulse)?;
        match self.memo.query(&key) {
            Lookup::Absent => {
                self.memo.reserve(key.clone());
                self.phases[timing.phase()].push_back(Task {
                    key,
                    source,
                    target,
                    channel,
                    pulse,
                });
            }
            Lookup::InProgress => {
                // Looped back onto a pending dispatch: no new information.
                self.stats.cycles_broken += 1;
                tracing::trace!(source = %source, target = %target, %channel, "dispatch already pending");
            }
            Lookup::Final(_) => {
                self.stats.cache_hits += 1;
                tracing::trace!(source = %source, target = %target, %channel, "dispatch already final");
            }
        }
        Ok(())
    }

    fn next_task(&mut self) -> Option<Task> {
        self.phases.iter_mut().find_map(VecDeque::pop_front)
    }

    fn finish(mut self) -> Result<Plan, PropagationError> {
        while let Some(task) = self.next_task() {
            self.dispatch(task)?;
        }
        debug_assert_eq!(self.memo.pending(), 0);

        let writes = self
            .pending
            .into_iter()
            .map(|((cell, channel), pulse)| FireWrite {
                cell,
                channel,
                pulse,
            })
            .collect();

        Ok(Plan {
            operations: self.operations,
            writes,
            stats: self.stats,
            trace: self.trace,
        })
    }

    /// What `cell` holds on `channel`, counting pulses recorded this run.
    fn current(&self, cell: &Cell, channel: Channel) -> Peak {
        Peak::from_slot(
            self.pending
                .get(&(cell.id, channel))
                .or_else(|| cell.fire.get(channel)),
        )
    }

    fn dispatch(&mut self, task: Task) -> Result<(), PropagationError> {
        let nogan = self.nogan;
        let registry = self.registry;
        let source = nogan.cell(task.source)?;
        let target = nogan.cell(task.target)?;
        let kind = task.pulse.kind();

        let previous = self.current(target, task.channel);
        let next = Peak::success(task.pulse.clone());
        let peak = registry.evaluate(&Stimulus {
            source,
            target,
            previous: &previous,
            next: &next,
        });
        self.check_contract(&peak, kind, target.id)?;
        self.stats.evaluations += 1;

        self.operations.extend(peak.operations().iter().cloned());

        let outcome = match peak.pulse() {
            None => Outcome::Absorbed,
            Some(pulse) if previous.pulse() == Some(pulse) => Outcome::Unchanged,
            Some(pulse) => {
                self.record(target.id, task.channel, pulse.clone());
                for wire in nogan.outputs_of(target.id)? {
                    if wire.colour.matches(task.channel) {
                        self.schedule(target.id, wire.target, task.channel, pulse.clone(), wire.timing)?;
                    }
                }
                Outcome::Recorded
            }
        };

        tracing::trace!(
            source = %task.source,
            target = %task.target,
            channel = %task.channel,
            pulse = %kind,
            ?outcome,
            "dispatched"
        );
        if let Some(trace) = self.trace.as_mut() {
            trace.push(TraceEntry {
                source: task.source,
                target: task.target,
                channel: task.channel,
                pulse: task.pulse,
                outcome,
                operations: peak.operations().len(),
            });
        }

        self.memo.store(task.key, peak);
        Ok(())
    }

    fn record(&mut self, cell: CellId, channel: Channel, pulse: Pulse) {
        self.pending.insert((cell, channel), pulse);
        if self.fired.insert(cell) {
            self.operations.push(Operation::Fired { id: cell });
        }
    }

    /// Rejects peaks whose operations point at cells that are not live.
    fn check_contract(
        &self,
        peak: &Peak,
        pulse: PulseKind,
        target: CellId,
    ) -> Result<(), PropagationError> {
        for operation in peak.operations() {
            if let Some(id) = operation.cell() {
                if !self.nogan.is_live_cell(id) {
                    return Err(PropagationError::ContractViolation {
                        pulse,
                        target,
                        reason: format!("operation targets cell {} which is not live", id),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nogan_core::{CellKind, WireColour};

    fn engine() -> Engine {
        Engine::new(PropagationConfig {
            trace_enabled: true,
        })
    }

    fn dummy(nogan: &mut Nogan) -> CellId {
        nogan
            .create_cell(CellKind::Dummy, [0.0, 0.0], CellId::ROOT)
            .unwrap()
    }

    #[test]
    fn injection_records_pulse_and_fired() {
        let mut nogan = Nogan::new();
        let a = dummy(&mut nogan);
        let commit = engine()
            .inject(&mut nogan, a, Channel::Green, Pulse::Raw)
            .unwrap();

        assert_eq!(commit.operations, vec![Operation::Fired { id: a }]);
        assert_eq!(nogan.fire(a, Channel::Green).unwrap(), Some(&Pulse::Raw));
        assert_eq!(nogan.fire(a, Channel::Red).unwrap(), None);
        assert!(nogan.fired().contains(&a));
    }

    #[test]
    fn wire_colour_filters_channels() {
        let mut nogan = Nogan::new();
        let a = dummy(&mut nogan);
        let b = dummy(&mut nogan);
        let c = dummy(&mut nogan);
        nogan.create_wire(WireColour::Red, Timing::Now, a, b).unwrap();
        nogan.create_wire(WireColour::Blue, Timing::Now, a, c).unwrap();

        engine()
            .inject(&mut nogan, a, Channel::Red, Pulse::Destruction)
            .unwrap();
        assert_eq!(nogan.fire(b, Channel::Red).unwrap(), Some(&Pulse::Destruction));
        assert_eq!(nogan.fire(c, Channel::Red).unwrap(), None);
    }

    #[test]
    fn phases_run_before_now_after() {
        let mut nogan = Nogan::new();
        let a = dummy(&mut nogan);
        let after = dummy(&mut nogan);
        let before = dummy(&mut nogan);
        let now = dummy(&mut nogan);
        nogan.create_wire(WireColour::Any, Timing::After, a, after).unwrap();
        nogan.create_wire(WireColour::Any, Timing::Before, a, before).unwrap();
        nogan.create_wire(WireColour::Any, Timing::Now, a, now).unwrap();

        let plan = engine().plan(&nogan, a, Channel::Red, Pulse::Raw).unwrap();
        let order: Vec<CellId> = plan.trace.unwrap().iter().map(|e| e.target).collect();
        assert_eq!(order, vec![a, before, now, after]);
    }

    #[test]
    fn same_timing_ties_break_by_wire_id() {
        let mut nogan = Nogan::new();
        let a = dummy(&mut nogan);
        let b = dummy(&mut nogan);
        let c = dummy(&mut nogan);
        // Created in reverse so wire ids and cell ids disagree.
        nogan.create_wire(WireColour::Any, Timing::Now, a, c).unwrap();
        nogan.create_wire(WireColour::Any, Timing::Now, a, b).unwrap();

        let plan = engine().plan(&nogan, a, Channel::Blue, Pulse::Raw).unwrap();
        let order: Vec<CellId> = plan.trace.unwrap().iter().map(|e| e.target).collect();
        assert_eq!(order, vec![a, c, b]);
    }

    #[test]
    fn plan_does_not_mutate_until_commit() {
        let mut nogan = Nogan::new();
        let a = dummy(&mut nogan);
        let plan = engine()
            .plan(&nogan, a, Channel::Red, Pulse::Ping)
            .unwrap();
        assert_eq!(nogan.fire(a, Channel::Red).unwrap(), None);
        assert!(!plan.is_empty());

        drop(plan);
        assert_eq!(nogan.fire(a, Channel::Red).unwrap(), None);
        assert!(nogan.fired().is_empty());
    }

    #[test]
    fn stale_plan_fails_without_mutation() {
        let mut nogan = Nogan::new();
        let a = dummy(&mut nogan);
        let b = dummy(&mut nogan);
        nogan.create_wire(WireColour::Any, Timing::Now, a, b).unwrap();

        let plan = engine().plan(&nogan, a, Channel::Red, Pulse::Raw).unwrap();
        nogan.delete_cell(b, nogan_core::Retire::Delete).unwrap();

        assert!(plan.commit(&mut nogan).is_err());
        assert_eq!(nogan.fire(a, Channel::Red).unwrap(), None);
    }

    #[test]
    fn unknown_target_is_a_structural_error() {
        let nogan = Nogan::new();
        let err = engine()
            .plan(&nogan, CellId(12), Channel::Red, Pulse::Raw)
            .unwrap_err();
        assert!(matches!(err, PropagationError::Store(_)));
    }

    #[test]
    fn firing_wire_on_wrong_channel_is_rejected() {
        let mut nogan = Nogan::new();
        let a = dummy(&mut nogan);
        let b = dummy(&mut nogan);
        let w = nogan.create_wire(WireColour::Green, Timing::Now, a, b).unwrap();
        let err = engine()
            .plan_wire(&nogan, w, Channel::Red, Pulse::Raw)
            .unwrap_err();
        assert!(matches!(err, PropagationError::ChannelMismatch { .. }));
    }

    #[test]
    fn contract_violation_is_rejected() {
        fn rogue(_: &Stimulus<'_>) -> Peak {
            Peak::Failure {
                operations: smallvec::smallvec![Operation::Fired { id: CellId(999) }],
            }
        }

        let mut registry = BehaviourRegistry::default();
        registry.register(PulseKind::Destruction, rogue);
        let engine = Engine::with_registry(registry, PropagationConfig::default());

        let mut nogan = Nogan::new();
        let a = dummy(&mut nogan);
        let err = engine
            .inject(&mut nogan, a, Channel::Red, Pulse::Destruction)
            .unwrap_err();
        assert!(matches!(
            err,
            PropagationError::ContractViolation {
                pulse: PulseKind::Destruction,
                ..
            }
        ));
        assert!(nogan.fired().is_empty());
    }

    #[test]
    fn parallel_wires_dispatch_once() {
        let mut nogan = Nogan::new();
        let a = dummy(&mut nogan);
        let b = dummy(&mut nogan);
        nogan.create_wire(WireColour::Any, Timing::Now, a, b).unwrap();
        nogan.create_wire(WireColour::Red, Timing::After, a, b).unwrap();

        let plan = engine().plan(&nogan, a, Channel::Red, Pulse::Raw).unwrap();
        assert_eq!(plan.stats.evaluations, 2);
        assert_eq!(plan.stats.cycles_broken, 1);
    }
}
