//! Critical path analysis for the dependency graph.
//!
//! # Overview
//!
//! The critical path is the *longest* dependency chain in the project.
//! Items on it have **zero slack**: any delay on them delays the earliest
//! possible completion of everything.
//!
//! # Definitions
//!
//! Every item contributes one step.
//!
//! | Term     | Definition |
//! |----------|------------|
//! | `depth`  | Items on the longest chain *ending* at this item, itself included (1 for an unblocked item). |
//! | `tail`   | Items on the longest chain *starting* at this item, itself included. |
//! | `longest`| Max `depth` over all items. |
//! | `slack`  | `longest − (depth + tail − 1)`; zero on a critical path. |
//!
//! # Algorithm
//!
//! 1. **Forward pass** over the Phase 1 topological order: `depth(v) = 1 +
//!    max depth(u)` over blockers `u`.
//! 2. **Backward pass** over the reversed order: `tail(v) = 1 + max tail(w)`
//!    over blocked items `w`.
//! 3. **Path reconstruction**: from the deepest item (smallest ID on ties)
//!    walk back through blockers whose depth is exactly one less.
//!
//! When the graph has cycles the order is partial. Items outside it get
//! depth and slack 0, successors outside the order are ignored by the
//! backward pass, and the result is flagged as partial.

#![allow(clippy::module_name_repetitions)]

use tracing::{debug, instrument};

use crate::deadline::Deadline;
use crate::graph::index::Adjacency;

/// Items processed between deadline checks.
pub const DEADLINE_STRIDE: usize = 1024;

/// Result of critical path analysis, indexed by dense node index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalPathResult {
    pub depth: Vec<usize>,
    pub slack: Vec<usize>,
    /// Length of the longest chain, in items.
    pub longest: usize,
    /// One longest chain, blockers first.
    pub path: Vec<usize>,
    /// Items outside the topological order (members of or downstream of a
    /// cycle).
    pub unordered: usize,
    pub interrupted: bool,
}

impl CriticalPathResult {
    fn interrupted(n: usize) -> Self {
        Self {
            depth: vec![0; n],
            slack: vec![0; n],
            longest: 0,
            path: Vec::new(),
            unordered: 0,
            interrupted: true,
        }
    }
}

#[must_use]
#[instrument(skip(adj, order, deadline), fields(nodes = adj.node_count()))]
pub fn critical_path(adj: &Adjacency, order: &[usize], deadline: &Deadline) -> CriticalPathResult {
    let n = adj.node_count();
    let mut depth = vec![0_usize; n];
    let mut tail = vec![0_usize; n];

    // --- Forward pass ---
    // Kahn only releases a node after all its blockers, so every blocker of
    // an ordered node is itself ordered and already has its depth.
    for (i, &v) in order.iter().enumerate() {
        if i % DEADLINE_STRIDE == 0 && deadline.expired() {
            return CriticalPathResult::interrupted(n);
        }
        depth[v] = 1 + adj
            .predecessors(v)
            .iter()
            .map(|&u| depth[u])
            .max()
            .unwrap_or(0);
    }

    // --- Backward pass ---
    for &v in order.iter().rev() {
        tail[v] = 1 + adj
            .successors(v)
            .iter()
            .map(|&w| tail[w])
            .max()
            .unwrap_or(0);
    }

    let longest = depth.iter().copied().max().unwrap_or(0);
    let slack: Vec<usize> = (0..n)
        .map(|v| {
            if depth[v] == 0 {
                0
            } else {
                longest.saturating_sub(depth[v] + tail[v] - 1)
            }
        })
        .collect();

    let path = reconstruct(adj, &depth, longest);
    let unordered = n - order.len();

    debug!(longest, unordered, "critical path computed");

    CriticalPathResult {
        depth,
        slack,
        longest,
        path,
        unordered,
        interrupted: false,
    }
}

// ---------------------------------------------------------------------------
// Path reconstruction helper
// ---------------------------------------------------------------------------

fn reconstruct(adj: &Adjacency, depth: &[usize], longest: usize) -> Vec<usize> {
    let Some(sink) = depth.iter().position(|&d| d == longest && d > 0) else {
        return Vec::new();
    };

    let mut path = vec![sink];
    let mut current = sink;
    while depth[current] > 1 {
        let want = depth[current] - 1;
        match adj.predecessors(current).iter().find(|&&u| depth[u] == want) {
            Some(&u) => {
                path.push(u);
                current = u;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
