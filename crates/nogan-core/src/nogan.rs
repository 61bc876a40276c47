//! Nogan: the graph store owning every cell and wire.
//!
//! [`Nogan`] is the single entry point for constructing and mutating a signal
//! graph. It allocates ids, keeps the containment tree and the wire adjacency
//! lists consistent, and records tombstones for retired ids.
//!
//! # Ids and tombstones
//!
//! Cells and wires are numbered by independent, monotonically increasing
//! counters. Ids are never reused. Retiring an entity leaves a `None`
//! tombstone in its map and records the id either as *archived* (the body is
//! kept so it can be restored) or *deleted* (permanent).
//!
//! # Snapshots
//!
//! The whole store serializes to JSON. [`Nogan::to_json`] caches the text
//! until the next mutation; [`Nogan::from_json`] validates every structural
//! invariant before handing the store back.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellKind, Channel, Fire, Position};
use crate::error::NoganError;
use crate::id::{CellId, WireId};
use crate::peak::Operation;
use crate::pulse::Pulse;
use crate::wire::{Timing, Wire, WireColour};

/// How an entity is retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retire {
    /// Soft delete: the body is kept and the id can be restored.
    Archive,
    /// Permanent: the id is never live again.
    Delete,
}

/// The graph store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nogan {
    next_cell: u32,
    next_wire: u32,
    /// Every allocated cell id. `None` marks a tombstone.
    cells: BTreeMap<CellId, Option<Cell>>,
    /// Every allocated wire id. `None` marks a tombstone.
    wires: BTreeMap<WireId, Option<Wire>>,
    archived_cells: BTreeMap<CellId, Cell>,
    archived_wires: BTreeMap<WireId, Wire>,
    deleted_cells: BTreeSet<CellId>,
    deleted_wires: BTreeSet<WireId>,
    /// Wires archived by a cell's cascade, filed under the archived cell
    /// that will bring them back.
    #[serde(default)]
    archived_with: BTreeMap<CellId, Vec<WireId>>,
    /// Cells that fired during the last committed step.
    #[serde(default)]
    fired: BTreeSet<CellId>,
    /// Cached JSON snapshot, cleared by every mutation.
    #[serde(skip)]
    json: Option<String>,
}

impl Default for Nogan {
    fn default() -> Self {
        Self::new()
    }
}

impl Nogan {
    /// Creates a store holding only the root cell ([`CellId::ROOT`]).
    pub fn new() -> Self {
        let root = Cell::new(CellId::ROOT, CellKind::Root, CellId::ROOT, [0.0, 0.0]);
        let mut cells = BTreeMap::new();
        cells.insert(CellId::ROOT, Some(root));

        Nogan {
            next_cell: 1,
            next_wire: 0,
            cells,
            wires: BTreeMap::new(),
            archived_cells: BTreeMap::new(),
            archived_wires: BTreeMap::new(),
            deleted_cells: BTreeSet::new(),
            deleted_wires: BTreeSet::new(),
            archived_with: BTreeMap::new(),
            fired: BTreeSet::new(),
            json: None,
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Looks up a live cell, distinguishing unknown ids from retired ones.
    pub fn cell(&self, id: CellId) -> Result<&Cell, NoganError> {
        match self.cells.get(&id) {
            Some(Some(cell)) => Ok(cell),
            Some(None) => Err(NoganError::CellRetired { id }),
            None => Err(NoganError::CellNotFound { id }),
        }
    }

    /// Looks up a live wire, distinguishing unknown ids from retired ones.
    pub fn wire(&self, id: WireId) -> Result<&Wire, NoganError> {
        match self.wires.get(&id) {
            Some(Some(wire)) => Ok(wire),
            Some(None) => Err(NoganError::WireRetired { id }),
            None => Err(NoganError::WireNotFound { id }),
        }
    }

    /// Returns the live cell with `id`, if any.
    pub fn get_cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(&id).and_then(Option::as_ref)
    }

    /// Returns the live wire with `id`, if any.
    pub fn get_wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(&id).and_then(Option::as_ref)
    }

    pub fn is_live_cell(&self, id: CellId) -> bool {
        self.get_cell(id).is_some()
    }

    pub fn is_live_wire(&self, id: WireId) -> bool {
        self.get_wire(id).is_some()
    }

    /// Iterates live cells in ascending id order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.values().filter_map(Option::as_ref)
    }

    /// Iterates live wires in ascending id order.
    pub fn wires(&self) -> impl Iterator<Item = &Wire> + '_ {
        self.wires.values().filter_map(Option::as_ref)
    }

    /// Number of live cells, root included.
    pub fn cell_count(&self) -> usize {
        self.cells().count()
    }

    /// Number of live wires.
    pub fn wire_count(&self) -> usize {
        self.wires().count()
    }

    /// The id the next created cell will receive.
    pub fn next_cell(&self) -> CellId {
        CellId(self.next_cell)
    }

    /// The id the next created wire will receive.
    pub fn next_wire(&self) -> WireId {
        WireId(self.next_wire)
    }

    pub fn archived_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.archived_cells.keys().copied()
    }

    pub fn archived_wires(&self) -> impl Iterator<Item = WireId> + '_ {
        self.archived_wires.keys().copied()
    }

    pub fn deleted_cells(&self) -> &BTreeSet<CellId> {
        &self.deleted_cells
    }

    pub fn deleted_wires(&self) -> &BTreeSet<WireId> {
        &self.deleted_wires
    }

    /// Cells that fired during the last committed step.
    pub fn fired(&self) -> &BTreeSet<CellId> {
        &self.fired
    }

    /// The pulse held by cell `id` on `channel`.
    pub fn fire(&self, id: CellId, channel: Channel) -> Result<Option<&Pulse>, NoganError> {
        Ok(self.cell(id)?.fire.get(channel))
    }

    /// Live wires leaving cell `id`, in ascending wire id order.
    ///
    /// Ascending id is the committed tie-break between wires of equal timing.
    pub fn outputs_of(&self, id: CellId) -> Result<Vec<&Wire>, NoganError> {
        let cell = self.cell(id)?;
        let mut wires = cell
            .outputs
            .iter()
            .map(|&wire| self.wire(wire))
            .collect::<Result<Vec<_>, _>>()?;
        wires.sort_by_key(|wire| wire.id);
        Ok(wires)
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Allocates a cell under `parent` and links it into the parent's children.
    pub fn create_cell(
        &mut self,
        kind: CellKind,
        position: Position,
        parent: CellId,
    ) -> Result<CellId, NoganError> {
        let id = CellId(self.next_cell);
        check_position(id, position)?;
        if !self.is_live_cell(parent) {
            return Err(NoganError::ParentNotFound { id, parent });
        }
        self.next_cell += 1;

        self.cells
            .insert(id, Some(Cell::new(id, kind, parent, position)));
        self.cell_mut(parent)?.cells.insert(id);
        self.invalidate();

        tracing::debug!(cell = %id, %kind, parent = %parent, "created cell");

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(id)
    }

    /// Allocates a wire and appends it to `source.outputs` and `target.inputs`.
    pub fn create_wire(
        &mut self,
        colour: WireColour,
        timing: Timing,
        source: CellId,
        target: CellId,
    ) -> Result<WireId, NoganError> {
        self.cell(source)?;
        self.cell(target)?;

        let id = WireId(self.next_wire);
        self.next_wire += 1;

        self.wires.insert(
            id,
            Some(Wire {
                id,
                colour,
                timing,
                source,
                target,
            }),
        );
        self.cell_mut(source)?.outputs.push(id);
        self.cell_mut(target)?.inputs.push(id);
        self.invalidate();

        tracing::debug!(wire = %id, %colour, source = %source, target = %target, "created wire");

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Retirement and restoration
    // -----------------------------------------------------------------------

    /// Retires a cell, its descendants, and every wire touching any of them.
    ///
    /// The root cell cannot be retired.
    pub fn delete_cell(&mut self, id: CellId, mode: Retire) -> Result<(), NoganError> {
        let cell = self.cell(id)?;
        if cell.is_root() {
            return Err(NoganError::RootRemoval);
        }
        let parent = cell.parent;

        self.retire_subtree(id, mode)?;
        self.cell_mut(parent)?.cells.shift_remove(&id);
        self.invalidate();

        tracing::debug!(cell = %id, ?mode, "retired cell");

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(())
    }

    /// Retires a single wire, unlinking it from both endpoints.
    pub fn delete_wire(&mut self, id: WireId, mode: Retire) -> Result<(), NoganError> {
        self.wire(id)?;
        self.retire_wire(id, mode)?;
        self.invalidate();

        tracing::debug!(wire = %id, ?mode, "retired wire");

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(())
    }

    /// Brings an archived cell back, with its archived descendants and every
    /// archived wire whose endpoints are live again.
    pub fn restore_cell(&mut self, id: CellId) -> Result<(), NoganError> {
        if !self.archived_cells.contains_key(&id) {
            return Err(match self.cells.get(&id) {
                None => NoganError::CellNotFound { id },
                Some(None) => NoganError::CellRetired { id },
                Some(Some(_)) => NoganError::NotArchived {
                    what: format!("cell {} is live", id),
                },
            });
        }
        let parent = self.archived_cells[&id].parent;
        if !self.is_live_cell(parent) {
            return Err(NoganError::ParentNotFound { id, parent });
        }

        let mut restored = BTreeSet::new();
        self.unarchive_subtree(id, &mut restored);
        self.cell_mut(parent)?.cells.insert(id);

        // Only wires retired by a cascade come back; a wire archived on its
        // own stays archived.
        let wires: Vec<WireId> = restored
            .iter()
            .filter_map(|cell| self.archived_with.remove(cell))
            .flatten()
            .collect();
        for wire in wires {
            let Some(body) = self.archived_wires.get(&wire) else {
                continue;
            };
            let waiting_on = [body.source, body.target]
                .into_iter()
                .find(|cell| !self.is_live_cell(*cell));
            match waiting_on {
                None => self.unarchive_wire(wire)?,
                // The other endpoint is still archived: it brings the wire back.
                Some(cell) if self.archived_cells.contains_key(&cell) => {
                    self.archived_with.entry(cell).or_default().push(wire);
                }
                Some(_) => {}
            }
        }
        self.invalidate();

        tracing::debug!(cell = %id, restored = restored.len(), "restored cell");

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(())
    }

    /// Brings an archived wire back. Both endpoints must be live.
    pub fn restore_wire(&mut self, id: WireId) -> Result<(), NoganError> {
        let wire = match self.archived_wires.get(&id) {
            Some(wire) => wire,
            None => {
                return Err(match self.wires.get(&id) {
                    None => NoganError::WireNotFound { id },
                    Some(None) => NoganError::WireRetired { id },
                    Some(Some(_)) => NoganError::NotArchived {
                        what: format!("wire {} is live", id),
                    },
                })
            }
        };
        self.cell(wire.source)?;
        self.cell(wire.target)?;

        self.unarchive_wire(id)?;
        self.invalidate();

        tracing::debug!(wire = %id, "restored wire");

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(())
    }

    fn retire_subtree(&mut self, id: CellId, mode: Retire) -> Result<(), NoganError> {
        let cell = self.cell(id)?;
        let children: Vec<CellId> = cell.cells.iter().copied().collect();
        let wires: Vec<WireId> = cell.inputs.iter().chain(&cell.outputs).copied().collect();

        for child in children {
            self.retire_subtree(child, mode)?;
        }
        let mut cascaded = Vec::new();
        for wire in wires {
            // A looping wire is listed in both inputs and outputs.
            if self.is_live_wire(wire) {
                self.retire_wire(wire, mode)?;
                cascaded.push(wire);
            }
        }
        if mode == Retire::Archive && !cascaded.is_empty() {
            self.archived_with.insert(id, cascaded);
        }

        let cell = self
            .cells
            .insert(id, None)
            .flatten()
            .ok_or(NoganError::CellNotFound { id })?;
        self.fired.remove(&id);
        match mode {
            Retire::Archive => {
                self.archived_cells.insert(id, cell);
            }
            Retire::Delete => {
                self.deleted_cells.insert(id);
            }
        }
        Ok(())
    }

    fn retire_wire(&mut self, id: WireId, mode: Retire) -> Result<(), NoganError> {
        let wire = self
            .wires
            .insert(id, None)
            .flatten()
            .ok_or(NoganError::WireNotFound { id })?;

        if let Some(Some(source)) = self.cells.get_mut(&wire.source) {
            source.outputs.retain(|w| *w != id);
        }
        if let Some(Some(target)) = self.cells.get_mut(&wire.target) {
            target.inputs.retain(|w| *w != id);
        }

        match mode {
            Retire::Archive => {
                self.archived_wires.insert(id, wire);
            }
            Retire::Delete => {
                self.deleted_wires.insert(id);
            }
        }
        Ok(())
    }

    fn unarchive_subtree(&mut self, id: CellId, restored: &mut BTreeSet<CellId>) {
        let Some(mut cell) = self.archived_cells.remove(&id) else {
            return;
        };
        // Adjacency is rebuilt as wires come back.
        cell.inputs.clear();
        cell.outputs.clear();
        let children: Vec<CellId> = cell.cells.iter().copied().collect();
        cell.cells.clear();
        self.cells.insert(id, Some(cell));
        restored.insert(id);

        for child in children {
            if self.archived_cells.contains_key(&child) {
                self.unarchive_subtree(child, restored);
                if let Some(Some(cell)) = self.cells.get_mut(&id) {
                    cell.cells.insert(child);
                }
            }
        }
    }

    fn unarchive_wire(&mut self, id: WireId) -> Result<(), NoganError> {
        let wire = self
            .archived_wires
            .remove(&id)
            .ok_or_else(|| NoganError::NotArchived {
                what: format!("wire {}", id),
            })?;
        self.cell_mut(wire.source)?.outputs.push(id);
        self.cell_mut(wire.target)?.inputs.push(id);
        self.wires.insert(id, Some(wire));

        self.archived_with.retain(|_, wires| {
            wires.retain(|w| *w != id);
            !wires.is_empty()
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Operations and fire slots
    // -----------------------------------------------------------------------

    /// Applies one operation immediately.
    ///
    /// `Modify` merges the template into the cell; changing the cell's type
    /// clears its fire slots. `Fired` records the cell in [`Nogan::fired`].
    pub fn apply_operation(&mut self, operation: &Operation) -> Result<(), NoganError> {
        match operation {
            Operation::Modify { id, template } => {
                if let Some(position) = template.position {
                    check_position(*id, position)?;
                }
                let cell = self.cell_mut(*id)?;
                if let Some(kind) = template.kind {
                    if kind != cell.kind {
                        cell.kind = kind;
                        cell.fire = Fire::default();
                    }
                }
                if let Some(position) = template.position {
                    cell.position = position;
                }
                tracing::trace!(cell = %id, "modified cell");
            }
            Operation::Fired { id } => {
                self.cell(*id)?;
                self.fired.insert(*id);
            }
            Operation::Pong => {
                tracing::trace!("pong");
                return Ok(());
            }
        }
        self.invalidate();
        Ok(())
    }

    /// Replaces the pulse held by cell `id` on `channel`, returning the old one.
    pub fn set_fire(
        &mut self,
        id: CellId,
        channel: Channel,
        pulse: Option<Pulse>,
    ) -> Result<Option<Pulse>, NoganError> {
        let old = self.cell_mut(id)?.fire.set(channel, pulse);
        self.invalidate();
        Ok(old)
    }

    /// Forgets which cells fired, starting a new step.
    pub fn clear_fired(&mut self) {
        if !self.fired.is_empty() {
            self.fired.clear();
            self.invalidate();
        }
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Serializes the whole store, reusing the cached text when unchanged.
    pub fn to_json(&mut self) -> Result<&str, NoganError> {
        let json = match self.json.take() {
            Some(json) => json,
            None => serde_json::to_string(self)?,
        };
        Ok(self.json.insert(json).as_str())
    }

    /// The cached snapshot, if no mutation happened since the last
    /// [`Nogan::to_json`].
    pub fn cached_json(&self) -> Option<&str> {
        self.json.as_deref()
    }

    /// Parses and validates a snapshot.
    pub fn from_json(json: &str) -> Result<Self, NoganError> {
        let nogan: Nogan = serde_json::from_str(json)?;
        nogan.validate()?;
        Ok(nogan)
    }

    /// Replaces this store wholesale with a parsed snapshot.
    pub fn restore_json(&mut self, json: &str) -> Result<(), NoganError> {
        *self = Nogan::from_json(json)?;
        tracing::debug!(cells = self.cell_count(), wires = self.wire_count(), "restored snapshot");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Checks every structural invariant, reporting the first violation.
    pub fn validate(&self) -> Result<(), NoganError> {
        let inconsistent = |reason: String| Err(NoganError::Inconsistency { reason });

        match self.get_cell(CellId::ROOT) {
            Some(root) if root.parent == CellId::ROOT => {}
            _ => return inconsistent(format!("root cell {} is missing", CellId::ROOT)),
        }

        for (&id, cell) in &self.cells {
            if id.0 >= self.next_cell {
                return inconsistent(format!("cell {} is beyond the cell counter", id));
            }
            let Some(cell) = cell else {
                let archived = self.archived_cells.contains_key(&id);
                let deleted = self.deleted_cells.contains(&id);
                if archived == deleted {
                    return inconsistent(format!(
                        "retired cell {} must be exactly one of archived or deleted",
                        id
                    ));
                }
                continue;
            };
            if cell.id != id {
                return inconsistent(format!("cell stored under {} claims id {}", id, cell.id));
            }
            check_position(id, cell.position)?;
            if cell.is_root() != (id == CellId::ROOT) {
                return inconsistent(format!("only cell {} may be its own parent", CellId::ROOT));
            }
            let Some(parent) = self.get_cell(cell.parent) else {
                return Err(NoganError::ParentNotFound {
                    id,
                    parent: cell.parent,
                });
            };
            if !cell.is_root() && !parent.cells.contains(&id) {
                return inconsistent(format!(
                    "cell {} is missing from the children of {}",
                    id, cell.parent
                ));
            }
            for child in &cell.cells {
                match self.get_cell(*child) {
                    Some(c) if c.parent == id => {}
                    _ => {
                        return inconsistent(format!(
                            "cell {} lists {} as a child that does not point back",
                            id, child
                        ))
                    }
                }
            }
            for wire in &cell.inputs {
                match self.get_wire(*wire) {
                    Some(w) if w.target == id => {}
                    _ => return inconsistent(format!("cell {} has a stale input {}", id, wire)),
                }
            }
            for wire in &cell.outputs {
                match self.get_wire(*wire) {
                    Some(w) if w.source == id => {}
                    _ => return inconsistent(format!("cell {} has a stale output {}", id, wire)),
                }
            }
        }

        for (&id, wire) in &self.wires {
            if id.0 >= self.next_wire {
                return inconsistent(format!("wire {} is beyond the wire counter", id));
            }
            let Some(wire) = wire else {
                let archived = self.archived_wires.contains_key(&id);
                let deleted = self.deleted_wires.contains(&id);
                if archived == deleted {
                    return inconsistent(format!(
                        "retired wire {} must be exactly one of archived or deleted",
                        id
                    ));
                }
                continue;
            };
            if wire.id != id {
                return inconsistent(format!("wire stored under {} claims id {}", id, wire.id));
            }
            match self.get_cell(wire.source) {
                Some(source) if source.outputs.contains(&id) => {}
                _ => {
                    return inconsistent(format!(
                        "wire {} has a dead or unlinked source {}",
                        id, wire.source
                    ))
                }
            }
            match self.get_cell(wire.target) {
                Some(target) if target.inputs.contains(&id) => {}
                _ => {
                    return inconsistent(format!(
                        "wire {} has a dead or unlinked target {}",
                        id, wire.target
                    ))
                }
            }
        }

        // Every live cell must reach the root through its parents.
        let mut rooted = BTreeSet::from([CellId::ROOT]);
        for cell in self.cells() {
            let mut path = BTreeSet::new();
            let mut current = cell.id;
            while !rooted.contains(&current) {
                if !path.insert(current) {
                    return inconsistent(format!("cell {} sits on a parent cycle", current));
                }
                match self.get_cell(current) {
                    Some(c) => current = c.parent,
                    None => {
                        return inconsistent(format!("cell {} is detached from the root", cell.id))
                    }
                }
            }
            rooted.extend(path);
        }

        for id in &self.fired {
            if !self.is_live_cell(*id) {
                return inconsistent(format!("fired cell {} is not live", id));
            }
        }

        for id in self.archived_cells.keys().chain(&self.deleted_cells) {
            if !matches!(self.cells.get(id), Some(None)) {
                return inconsistent(format!("retired cell {} is not tombstoned", id));
            }
        }
        for (cell, wires) in &self.archived_with {
            if !self.archived_cells.contains_key(cell) {
                return inconsistent(format!(
                    "cell {} holds cascade wires but is not archived",
                    cell
                ));
            }
            if let Some(wire) = wires.iter().find(|w| !self.archived_wires.contains_key(w)) {
                return inconsistent(format!(
                    "cascade wire {} of cell {} is not archived",
                    wire, cell
                ));
            }
        }
        for id in self.archived_wires.keys().chain(&self.deleted_wires) {
            if !matches!(self.wires.get(id), Some(None)) {
                return inconsistent(format!("retired wire {} is not tombstoned", id));
            }
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn cell_mut(&mut self, id: CellId) -> Result<&mut Cell, NoganError> {
        match self.cells.get_mut(&id) {
            Some(Some(cell)) => Ok(cell),
            Some(None) => Err(NoganError::CellRetired { id }),
            None => Err(NoganError::CellNotFound { id }),
        }
    }

    fn invalidate(&mut self) {
        self.json = None;
    }

    /// Panics on the first invariant violation.
    ///
    /// Only called in debug builds (via `cfg(debug_assertions)`).
    #[cfg(debug_assertions)]
    fn assert_consistency(&self) {
        if let Err(err) = self.validate() {
            panic!("nogan invariant violated: {}", err);
        }
    }
}

fn check_position(id: CellId, position: Position) -> Result<(), NoganError> {
    let [x, y] = position;
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(NoganError::InvalidPosition { id, x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peak::CellPatch;
    use crate::pulse::CellTemplate;

    /// root(0) > a(1), b(2); wire 0: a -> b.
    fn pair() -> (Nogan, CellId, CellId, WireId) {
        let mut nogan = Nogan::new();
        let a = nogan
            .create_cell(CellKind::Dummy, [0.0, 0.0], CellId::ROOT)
            .unwrap();
        let b = nogan
            .create_cell(CellKind::Slot, [10.0, 0.0], CellId::ROOT)
            .unwrap();
        let w = nogan
            .create_wire(WireColour::Any, Timing::Now, a, b)
            .unwrap();
        (nogan, a, b, w)
    }

    #[test]
    fn new_store_has_only_root() {
        let nogan = Nogan::new();
        assert_eq!(nogan.cell_count(), 1);
        assert_eq!(nogan.wire_count(), 0);
        let root = nogan.cell(CellId::ROOT).unwrap();
        assert_eq!(root.kind, CellKind::Root);
        assert!(root.is_root());
        assert_eq!(nogan.next_cell(), CellId(1));
        assert_eq!(nogan.next_wire(), WireId(0));
        nogan.validate().unwrap();
    }

    #[test]
    fn create_links_parent_and_adjacency() {
        let (nogan, a, b, w) = pair();
        let root = nogan.cell(CellId::ROOT).unwrap();
        assert_eq!(root.cells.iter().copied().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(nogan.cell(a).unwrap().outputs.as_slice(), &[w]);
        assert_eq!(nogan.cell(b).unwrap().inputs.as_slice(), &[w]);
        let wire = nogan.wire(w).unwrap();
        assert_eq!((wire.source, wire.target), (a, b));
    }

    #[test]
    fn create_cell_under_missing_parent_fails() {
        let mut nogan = Nogan::new();
        let err = nogan
            .create_cell(CellKind::Dummy, [0.0, 0.0], CellId(40))
            .unwrap_err();
        assert!(matches!(err, NoganError::ParentNotFound { parent: CellId(40), .. }));
        // The failed call did not consume an id.
        assert_eq!(nogan.next_cell(), CellId(1));
    }

    #[test]
    fn create_wire_to_missing_cell_fails() {
        let mut nogan = Nogan::new();
        let err = nogan
            .create_wire(WireColour::Red, Timing::Now, CellId::ROOT, CellId(9))
            .unwrap_err();
        assert!(matches!(err, NoganError::CellNotFound { id: CellId(9) }));
        assert_eq!(nogan.wire_count(), 0);
    }

    #[test]
    fn delete_cell_tombstones_and_unlinks() {
        let (mut nogan, a, b, w) = pair();
        nogan.delete_cell(b, Retire::Delete).unwrap();

        assert!(nogan.get_cell(b).is_none());
        assert!(matches!(nogan.cell(b), Err(NoganError::CellRetired { .. })));
        assert!(nogan.deleted_cells().contains(&b));
        // The wire touching b went with it.
        assert!(nogan.deleted_wires().contains(&w));
        assert!(nogan.cell(a).unwrap().outputs.is_empty());
        assert!(!nogan.cell(CellId::ROOT).unwrap().cells.contains(&b));
        nogan.validate().unwrap();
    }

    #[test]
    fn deleted_ids_are_never_reused() {
        let (mut nogan, _a, b, _w) = pair();
        nogan.delete_cell(b, Retire::Delete).unwrap();

        let fresh = nogan
            .create_cell(CellKind::Slot, [10.0, 0.0], CellId::ROOT)
            .unwrap();
        assert_ne!(fresh, b);
        assert!(fresh > b);
        assert!(nogan.get_cell(b).is_none());
        // Deleted cells cannot be restored.
        assert!(matches!(
            nogan.restore_cell(b),
            Err(NoganError::CellRetired { .. })
        ));
        assert!(nogan
            .apply_operation(&Operation::Modify {
                id: b,
                template: CellPatch::default(),
            })
            .is_err());
    }

    #[test]
    fn delete_cascades_to_children() {
        let mut nogan = Nogan::new();
        let outer = nogan
            .create_cell(CellKind::Dummy, [0.0, 0.0], CellId::ROOT)
            .unwrap();
        let inner = nogan.create_cell(CellKind::Dummy, [1.0, 1.0], outer).unwrap();
        let other = nogan
            .create_cell(CellKind::Dummy, [5.0, 5.0], CellId::ROOT)
            .unwrap();
        let w = nogan
            .create_wire(WireColour::Blue, Timing::After, other, inner)
            .unwrap();

        nogan.delete_cell(outer, Retire::Archive).unwrap();
        assert!(nogan.get_cell(inner).is_none());
        assert!(nogan.archived_cells().any(|id| id == inner));
        assert!(nogan.archived_wires().any(|id| id == w));
        assert!(nogan.cell(other).unwrap().outputs.is_empty());
        nogan.validate().unwrap();
    }

    #[test]
    fn archive_then_restore_round_trip() {
        let mut nogan = Nogan::new();
        let outer = nogan
            .create_cell(CellKind::Dummy, [0.0, 0.0], CellId::ROOT)
            .unwrap();
        let inner = nogan.create_cell(CellKind::Slot, [1.0, 1.0], outer).unwrap();
        let other = nogan
            .create_cell(CellKind::Dummy, [5.0, 5.0], CellId::ROOT)
            .unwrap();
        let w = nogan
            .create_wire(WireColour::Any, Timing::Now, other, inner)
            .unwrap();

        nogan.delete_cell(outer, Retire::Archive).unwrap();
        nogan.restore_cell(outer).unwrap();

        assert!(nogan.cell(outer).unwrap().cells.contains(&inner));
        assert_eq!(nogan.cell(inner).unwrap().inputs.as_slice(), &[w]);
        assert_eq!(nogan.cell(other).unwrap().outputs.as_slice(), &[w]);
        assert_eq!(nogan.archived_cells().count(), 0);
        assert_eq!(nogan.archived_wires().count(), 0);
        nogan.validate().unwrap();
    }

    #[test]
    fn restore_wire_requires_live_endpoints() {
        let (mut nogan, a, b, w) = pair();
        nogan.delete_wire(w, Retire::Archive).unwrap();
        assert!(nogan.cell(a).unwrap().outputs.is_empty());

        nogan.delete_cell(b, Retire::Delete).unwrap();
        assert!(matches!(
            nogan.restore_wire(w),
            Err(NoganError::CellRetired { .. })
        ));
    }

    #[test]
    fn restore_live_cell_is_rejected() {
        let (mut nogan, a, _b, _w) = pair();
        assert!(matches!(
            nogan.restore_cell(a),
            Err(NoganError::NotArchived { .. })
        ));
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut nogan = Nogan::new();
        assert!(matches!(
            nogan.delete_cell(CellId::ROOT, Retire::Delete),
            Err(NoganError::RootRemoval)
        ));
    }

    #[test]
    fn self_loop_is_retired_once() {
        let mut nogan = Nogan::new();
        let a = nogan
            .create_cell(CellKind::Dummy, [0.0, 0.0], CellId::ROOT)
            .unwrap();
        let w = nogan
            .create_wire(WireColour::Any, Timing::Now, a, a)
            .unwrap();
        nogan.delete_cell(a, Retire::Delete).unwrap();
        assert!(nogan.deleted_wires().contains(&w));
        nogan.validate().unwrap();
    }

    #[test]
    fn modify_changes_type_and_clears_fire() {
        let (mut nogan, _a, b, _w) = pair();
        nogan.set_fire(b, Channel::Red, Some(Pulse::Raw)).unwrap();

        let template = CellTemplate {
            kind: CellKind::Recording,
            position: Some([3.0, 4.0]),
        };
        nogan
            .apply_operation(&Operation::Modify {
                id: b,
                template: template.into(),
            })
            .unwrap();

        let cell = nogan.cell(b).unwrap();
        assert_eq!(cell.kind, CellKind::Recording);
        assert_eq!(cell.position, [3.0, 4.0]);
        assert!(cell.fire.is_empty());
    }

    #[test]
    fn modify_position_only_keeps_fire() {
        let (mut nogan, a, _b, _w) = pair();
        nogan.set_fire(a, Channel::Blue, Some(Pulse::Ping)).unwrap();
        nogan
            .apply_operation(&Operation::Modify {
                id: a,
                template: CellPatch {
                    kind: None,
                    position: Some([7.0, 7.0]),
                },
            })
            .unwrap();
        assert_eq!(nogan.fire(a, Channel::Blue).unwrap(), Some(&Pulse::Ping));
        assert_eq!(nogan.cell(a).unwrap().position, [7.0, 7.0]);
    }

    #[test]
    fn fired_operation_records_cell() {
        let (mut nogan, a, _b, _w) = pair();
        nogan.apply_operation(&Operation::Fired { id: a }).unwrap();
        nogan.apply_operation(&Operation::Pong).unwrap();
        assert!(nogan.fired().contains(&a));
        nogan.clear_fired();
        assert!(nogan.fired().is_empty());
    }

    #[test]
    fn outputs_sorted_by_wire_id() {
        let mut nogan = Nogan::new();
        let a = nogan
            .create_cell(CellKind::Dummy, [0.0, 0.0], CellId::ROOT)
            .unwrap();
        let b = nogan
            .create_cell(CellKind::Dummy, [0.0, 0.0], CellId::ROOT)
            .unwrap();
        let w0 = nogan.create_wire(WireColour::Red, Timing::Now, a, b).unwrap();
        let w1 = nogan.create_wire(WireColour::Green, Timing::Now, a, b).unwrap();
        let w2 = nogan.create_wire(WireColour::Blue, Timing::Now, a, b).unwrap();
        nogan.delete_wire(w1, Retire::Archive).unwrap();
        nogan.restore_wire(w1).unwrap();

        // Restoring appended w1 last; outputs_of still reports id order.
        assert_eq!(nogan.cell(a).unwrap().outputs.as_slice(), &[w0, w2, w1]);
        let ids: Vec<WireId> = nogan.outputs_of(a).unwrap().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![w0, w1, w2]);
    }

    #[test]
    fn json_cache_invalidated_by_mutation() {
        let (mut nogan, a, _b, _w) = pair();
        let first = nogan.to_json().unwrap().to_string();
        assert_eq!(nogan.cached_json(), Some(first.as_str()));

        nogan.set_fire(a, Channel::Green, Some(Pulse::Raw)).unwrap();
        assert!(nogan.cached_json().is_none());
        let second = nogan.to_json().unwrap().to_string();
        assert_ne!(first, second);
    }

    #[test]
    fn snapshot_restores_equivalent_store() {
        let (mut nogan, a, b, w) = pair();
        nogan.delete_wire(w, Retire::Archive).unwrap();
        nogan.set_fire(a, Channel::Red, Some(Pulse::Destruction)).unwrap();
        let json = nogan.to_json().unwrap().to_string();

        let back = Nogan::from_json(&json).unwrap();
        assert_eq!(back.next_cell(), nogan.next_cell());
        assert_eq!(back.next_wire(), nogan.next_wire());
        assert_eq!(back.cell(b).unwrap(), nogan.cell(b).unwrap());
        assert_eq!(back.fire(a, Channel::Red).unwrap(), Some(&Pulse::Destruction));
        assert_eq!(back.archived_wires().collect::<Vec<_>>(), vec![w]);
    }

    #[test]
    fn snapshot_field_names() {
        let (mut nogan, _a, _b, _w) = pair();
        let value: serde_json::Value = serde_json::from_str(nogan.to_json().unwrap()).unwrap();
        for key in [
            "nextCell",
            "nextWire",
            "cells",
            "wires",
            "archivedCells",
            "archivedWires",
            "deletedCells",
            "deletedWires",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(value["cells"]["2"]["type"], "slot");
    }

    #[test]
    fn corrupt_snapshot_is_rejected() {
        let (mut nogan, _a, _b, _w) = pair();
        let mut value: serde_json::Value =
            serde_json::from_str(nogan.to_json().unwrap()).unwrap();
        // Point the wire at a cell that was never allocated.
        value["wires"]["0"]["target"] = serde_json::json!(77);
        let err = Nogan::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, NoganError::Inconsistency { .. }));
    }

    #[test]
    fn parent_cycle_snapshot_is_rejected() {
        let mut nogan = Nogan::new();
        let a = nogan
            .create_cell(CellKind::Dummy, [0.0, 0.0], CellId::ROOT)
            .unwrap();
        let b = nogan.create_cell(CellKind::Dummy, [1.0, 0.0], a).unwrap();
        let mut value: serde_json::Value =
            serde_json::from_str(nogan.to_json().unwrap()).unwrap();
        // a and b adopt each other and leave the root.
        value["cells"]["0"]["cells"] = serde_json::json!([]);
        value["cells"][a.0.to_string()]["parent"] = serde_json::json!(b.0);
        value["cells"][b.0.to_string()]["cells"] = serde_json::json!([a.0]);

        let err = Nogan::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, NoganError::Inconsistency { .. }));
    }

    #[test]
    fn snapshot_without_root_is_rejected() {
        let (mut nogan, _a, _b, _w) = pair();
        let mut value: serde_json::Value =
            serde_json::from_str(nogan.to_json().unwrap()).unwrap();
        value["cells"]["0"] = serde_json::Value::Null;
        value["deletedCells"] = serde_json::json!([0]);
        let err = Nogan::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, NoganError::Inconsistency { .. }));
    }

    #[test]
    fn fired_must_name_live_cells() {
        let (mut nogan, _a, _b, _w) = pair();
        let mut value: serde_json::Value =
            serde_json::from_str(nogan.to_json().unwrap()).unwrap();
        value["fired"] = serde_json::json!([9]);
        let err = Nogan::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, NoganError::Inconsistency { .. }));
    }

    #[test]
    fn separately_archived_wire_stays_archived() {
        let (mut nogan, a, b, w) = pair();
        let other = nogan
            .create_wire(WireColour::Red, Timing::After, b, a)
            .unwrap();
        nogan.delete_wire(w, Retire::Archive).unwrap();
        nogan.delete_cell(a, Retire::Archive).unwrap();

        nogan.restore_cell(a).unwrap();
        assert!(!nogan.is_live_wire(w));
        assert!(nogan.is_live_wire(other));
        assert!(nogan.archived_wires().any(|id| id == w));

        nogan.restore_wire(w).unwrap();
        assert_eq!(nogan.cell(a).unwrap().outputs.as_slice(), &[w]);
        nogan.validate().unwrap();
    }

    #[test]
    fn cascade_wire_waits_for_archived_endpoint() {
        let (mut nogan, a, b, w) = pair();
        nogan.delete_cell(a, Retire::Archive).unwrap();
        nogan.delete_cell(b, Retire::Archive).unwrap();

        nogan.restore_cell(a).unwrap();
        assert!(!nogan.is_live_wire(w));
        nogan.validate().unwrap();

        nogan.restore_cell(b).unwrap();
        assert!(nogan.is_live_wire(w));
        nogan.validate().unwrap();
    }

    #[test]
    fn non_finite_positions_are_rejected() {
        let mut nogan = Nogan::new();
        let err = nogan
            .create_cell(CellKind::Dummy, [f64::NAN, 0.0], CellId::ROOT)
            .unwrap_err();
        assert!(matches!(err, NoganError::InvalidPosition { .. }));
        assert_eq!(nogan.next_cell(), CellId(1));

        let a = nogan
            .create_cell(CellKind::Dummy, [3.0, 4.0], CellId::ROOT)
            .unwrap();
        let err = nogan
            .apply_operation(&Operation::Modify {
                id: a,
                template: CellPatch {
                    kind: Some(CellKind::Slot),
                    position: Some([0.0, f64::INFINITY]),
                },
            })
            .unwrap_err();
        assert!(matches!(err, NoganError::InvalidPosition { .. }));
        let cell = nogan.cell(a).unwrap();
        assert_eq!((cell.kind, cell.position), (CellKind::Dummy, [3.0, 4.0]));
        Nogan::from_json(nogan.to_json().unwrap()).unwrap();
    }

    // ---- random edit sequences ----

    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Edit {
        Cell { parent: usize },
        Wire { source: usize, target: usize },
        RetireCell { cell: usize, archive: bool },
        RetireWire { wire: usize, archive: bool },
        RestoreCell { cell: usize },
        RestoreWire { wire: usize },
    }

    fn edit_strategy() -> impl Strategy<Value = Edit> {
        prop_oneof![
            (0usize..16).prop_map(|parent| Edit::Cell { parent }),
            (0usize..16, 0usize..16).prop_map(|(source, target)| Edit::Wire { source, target }),
            (0usize..16, any::<bool>()).prop_map(|(cell, archive)| Edit::RetireCell { cell, archive }),
            (0usize..16, any::<bool>()).prop_map(|(wire, archive)| Edit::RetireWire { wire, archive }),
            (0usize..16).prop_map(|cell| Edit::RestoreCell { cell }),
            (0usize..16).prop_map(|wire| Edit::RestoreWire { wire }),
        ]
    }

    fn mode(archive: bool) -> Retire {
        if archive {
            Retire::Archive
        } else {
            Retire::Delete
        }
    }

    proptest! {
        #[test]
        fn edits_preserve_invariants(edits in proptest::collection::vec(edit_strategy(), 0..40)) {
            let mut nogan = Nogan::new();
            for edit in edits {
                let cell = |i: usize, n: &Nogan| CellId((i as u32) % n.next_cell().0);
                let wire = |i: usize, n: &Nogan| WireId((i as u32) % n.next_wire().0.max(1));
                // Errors are expected for retired or unknown ids; only the
                // invariants matter here.
                let _ = match edit {
                    Edit::Cell { parent } => {
                        let parent = cell(parent, &nogan);
                        nogan.create_cell(CellKind::Dummy, [0.0, 0.0], parent).map(|_| ())
                    }
                    Edit::Wire { source, target } => {
                        let (source, target) = (cell(source, &nogan), cell(target, &nogan));
                        nogan.create_wire(WireColour::Any, Timing::Now, source, target).map(|_| ())
                    }
                    Edit::RetireCell { cell: c, archive } => {
                        let c = cell(c, &nogan);
                        nogan.delete_cell(c, mode(archive))
                    }
                    Edit::RetireWire { wire: w, archive } => {
                        let w = wire(w, &nogan);
                        nogan.delete_wire(w, mode(archive))
                    }
                    Edit::RestoreCell { cell: c } => {
                        let c = cell(c, &nogan);
                        nogan.restore_cell(c)
                    }
                    Edit::RestoreWire { wire: w } => {
                        let w = wire(w, &nogan);
                        nogan.restore_wire(w)
                    }
                };

                prop_assert!(nogan.validate().is_ok());
                prop_assert!(nogan.is_live_cell(CellId::ROOT));
                for id in nogan.deleted_cells() {
                    prop_assert!(!nogan.is_live_cell(*id));
                }
                for id in nogan.deleted_wires() {
                    prop_assert!(!nogan.is_live_wire(*id));
                }
            }
        }
    }
}
