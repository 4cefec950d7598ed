//! Static graph metrics: degree centrality, topological sort, and density.
//!
//! # Overview
//!
//! These are Phase 1 metrics: synchronous, linear-time and computed on every
//! analysis before any Phase 2 task starts. Critical-path slack reuses the
//! topological order produced here.
//!
//! Topological order uses Kahn's algorithm with a min-heap of ready nodes,
//! so among the issues that are ready at the same time the smallest ID goes
//! first and the order is fully deterministic. On a cyclic graph the order
//! covers only the nodes Kahn could release (the acyclic part upstream of
//! every cycle) and `has_cycles` is set.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::instrument;

use crate::graph::build::Graph;
use crate::graph::index::Adjacency;

// ---------------------------------------------------------------------------
// Degree Centrality
// ---------------------------------------------------------------------------

/// Per-node degree centrality, indexed by dense node index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegreeCentrality {
    /// How many issues block this one.
    pub in_degree: Vec<usize>,
    /// How many issues this one blocks.
    pub out_degree: Vec<usize>,
}

#[must_use]
pub fn degree_centrality(adj: &Adjacency) -> DegreeCentrality {
    let n = adj.node_count();
    DegreeCentrality {
        in_degree: (0..n).map(|v| adj.in_degree(v)).collect(),
        out_degree: (0..n).map(|v| adj.out_degree(v)).collect(),
    }
}

// ---------------------------------------------------------------------------
// Topological Sort
// ---------------------------------------------------------------------------

/// Result of Kahn's algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologicalOrder {
    /// Dense indices, blockers first. Partial when `has_cycles`.
    pub order: Vec<usize>,
    pub has_cycles: bool,
}

impl TopologicalOrder {
    /// `true` if every node was placed.
    #[must_use]
    pub fn is_complete(&self, node_count: usize) -> bool {
        self.order.len() == node_count
    }
}

#[must_use]
pub fn topological_order(adj: &Adjacency) -> TopologicalOrder {
    let n = adj.node_count();
    let mut remaining: Vec<usize> = (0..n).map(|v| adj.in_degree(v)).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = remaining
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(v, _)| Reverse(v))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(v)) = ready.pop() {
        order.push(v);
        for &w in adj.successors(v) {
            remaining[w] -= 1;
            if remaining[w] == 0 {
                ready.push(Reverse(w));
            }
        }
    }

    let has_cycles = order.len() < n;
    TopologicalOrder { order, has_cycles }
}

// ---------------------------------------------------------------------------
// Graph Density
// ---------------------------------------------------------------------------

/// Directed density `m / (n (n - 1))`; 0 for fewer than two nodes.
#[must_use]
pub fn density(node_count: usize, edge_count: usize) -> f64 {
    if node_count < 2 {
        return 0.0;
    }
    let max_edges = (node_count * (node_count - 1)) as f64;
    edge_count as f64 / max_edges
}

// ---------------------------------------------------------------------------
// Phase 1 bundle
// ---------------------------------------------------------------------------

/// Everything Phase 1 computes.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase1 {
    pub degree: DegreeCentrality,
    pub topo: TopologicalOrder,
    pub density: f64,
}

#[must_use]
#[instrument(skip(graph), fields(nodes = graph.node_count()))]
pub fn phase1(graph: &Graph) -> Phase1 {
    let adj = graph.adjacency();
    Phase1 {
        degree: degree_centrality(adj),
        topo: topological_order(adj),
        density: density(graph.node_count(), graph.edge_count()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
