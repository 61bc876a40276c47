//! Read-only wiring analysis on top of petgraph.
//!
//! Propagation itself walks the store directly; this module exists for
//! tooling that wants to know where the feedback loops are before pulses are
//! injected.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::id::{CellId, WireId};
use crate::nogan::Nogan;

/// A petgraph view of the live wiring: one node per live cell, one edge per
/// live wire.
pub struct Wiring {
    graph: DiGraph<CellId, WireId, u32>,
    index: HashMap<CellId, NodeIndex<u32>>,
}

impl Wiring {
    /// Builds the view. Cells and wires are added in ascending id order.
    pub fn new(nogan: &Nogan) -> Self {
        let mut graph = DiGraph::default();
        let mut index = HashMap::new();
        for cell in nogan.cells() {
            index.insert(cell.id, graph.add_node(cell.id));
        }
        for wire in nogan.wires() {
            if let (Some(&source), Some(&target)) = (index.get(&wire.source), index.get(&wire.target)) {
                graph.add_edge(source, target, wire.id);
            }
        }
        Wiring { graph, index }
    }

    /// Returns the underlying graph.
    pub fn graph(&self) -> &DiGraph<CellId, WireId, u32> {
        &self.graph
    }

    /// Returns the graph node for a live cell.
    pub fn node(&self, cell: CellId) -> Option<NodeIndex<u32>> {
        self.index.get(&cell).copied()
    }

    /// Groups of cells that can reach each other along wires.
    ///
    /// Only groups that actually loop are reported: two or more cells, or a
    /// single cell with a wire to itself. Each group is sorted, and groups are
    /// ordered by their smallest cell id.
    pub fn feedback_loops(&self) -> Vec<Vec<CellId>> {
        let mut loops: Vec<Vec<CellId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&n| self.graph.contains_edge(n, n))
            })
            .map(|component| {
                let mut cells: Vec<CellId> =
                    component.into_iter().map(|n| self.graph[n]).collect();
                cells.sort();
                cells
            })
            .collect();
        loops.sort();
        loops
    }

    /// Returns `true` if `cell` sits on any feedback loop.
    pub fn is_on_loop(&self, cell: CellId) -> bool {
        self.feedback_loops()
            .iter()
            .any(|group| group.binary_search(&cell).is_ok())
    }
}
