//! HITS (Hyperlink-Induced Topic Search) algorithm.
//!
//! # Overview
//!
//! HITS computes two scores for each node:
//!
//! - **Hub score**: how much a node points to good authorities. In the
//!   dependency graph, a hub is an item that blocks many important items.
//! - **Authority score**: how much a node is pointed to by good hubs. An
//!   authority is an item that many important blockers feed into.
//!
//! # Algorithm
//!
//! Iterative power method (Kleinberg, 1999):
//!
//! 1. Initialize all hub and authority scores to `1/√n`.
//! 2. Authority update: `auth(v) = Σ hub(u)` for all `u → v`.
//! 3. Hub update: `hub(v) = Σ auth(w)` for all `v → w`.
//! 4. Normalize both vectors to unit L2 norm.
//! 5. Repeat until the combined L2 change of both vectors is below the
//!    tolerance, the iteration cap is hit, or the deadline expires.

use tracing::{debug, instrument};

use crate::deadline::Deadline;
use crate::graph::index::Adjacency;
use crate::metrics::power::{IterationLimits, Termination, iterate, l2_distance, normalize_l2};

/// Result of the HITS algorithm, indexed by dense node index.
#[derive(Debug, Clone, PartialEq)]
pub struct HitsResult {
    pub hubs: Vec<f64>,
    pub authorities: Vec<f64>,
    pub termination: Termination,
}

#[must_use]
#[instrument(skip(adj, limits, deadline), fields(nodes = adj.node_count()))]
pub fn hits(adj: &Adjacency, limits: &IterationLimits, deadline: &Deadline) -> HitsResult {
    let n = adj.node_count();
    if n == 0 {
        return HitsResult {
            hubs: Vec::new(),
            authorities: Vec::new(),
            termination: Termination::Converged { iterations: 0 },
        };
    }

    let init = 1.0 / (n as f64).sqrt();
    let mut hub = vec![init; n];
    let mut auth = vec![init; n];
    let mut next_hub = vec![0.0_f64; n];
    let mut next_auth = vec![0.0_f64; n];

    let termination = iterate(limits, deadline, || {
        for (v, slot) in next_auth.iter_mut().enumerate() {
            *slot = adj.predecessors(v).iter().map(|&u| hub[u]).sum();
        }
        for (v, slot) in next_hub.iter_mut().enumerate() {
            *slot = adj.successors(v).iter().map(|&w| next_auth[w]).sum();
        }
        normalize_l2(&mut next_auth);
        normalize_l2(&mut next_hub);

        let change = l2_distance(&auth, &next_auth) + l2_distance(&hub, &next_hub);
        std::mem::swap(&mut auth, &mut next_auth);
        std::mem::swap(&mut hub, &mut next_hub);
        change
    });

    debug!(iterations = termination.iterations(), "hits finished");

    HitsResult {
        hubs: hub,
        authorities: auth,
        termination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::MetricStatus;

    fn run(n: usize, edges: &[(usize, usize)]) -> HitsResult {
        hits(
            &Adjacency::from_edges(n, edges),
            &IterationLimits::default(),
            &Deadline::never(),
        )
    }

    #[test]
    fn empty_graph() {
        let result = run(0, &[]);
        assert!(result.hubs.is_empty());
        assert!(result.authorities.is_empty());
    }

    #[test]
    fn fan_in_target_is_the_authority() {
        // 0, 1, 2 all block 3
        let result = run(4, &[(0, 3), (1, 3), (2, 3)]);
        assert_eq!(result.termination.status(), MetricStatus::Computed);
        assert!((result.authorities[3] - 1.0).abs() < 1e-9);
        for source in 0..3 {
            assert!(result.authorities[source].abs() < 1e-9);
            assert!((result.hubs[source] - 1.0 / 3.0_f64.sqrt()).abs() < 1e-9);
        }
        assert!(result.hubs[3].abs() < 1e-9);
    }

    #[test]
    fn edgeless_graph_settles_to_zero() {
        let result = run(3, &[]);
        assert_eq!(result.termination.status(), MetricStatus::Computed);
        assert!(result.hubs.iter().all(|h| h.abs() < 1e-12));
    }
}
