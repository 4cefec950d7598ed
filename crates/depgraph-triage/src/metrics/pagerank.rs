//! PageRank over the blocking graph.
//!
//! # Overview
//!
//! PageRank identifies items that unblock the most downstream work: rank
//! flows along `blocker → blocked` edges, so an issue accumulates score from
//! everything upstream of it.
//!
//! # Algorithm
//!
//! Power method in pull form, one pass over the predecessor rows per step:
//!
//! ```text
//! PR(v) = (1 - d) / N + d * D / N + d * Σ PR(u) / out_degree(u)   for each u → v
//! ```
//!
//! where `d` is the damping factor and `D` the total rank held by dangling
//! nodes (no outgoing edges), redistributed uniformly. Pulling over sorted
//! predecessor rows makes every sum run in the same order on every call.
//! Each step preserves `Σ PR = 1`. Convergence is measured as the L1 norm
//! of the change.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::deadline::Deadline;
use crate::graph::index::Adjacency;
use crate::metrics::power::{IterationLimits, Termination, iterate, l1_distance};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for PageRank computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRankConfig {
    /// Probability of following an edge rather than teleporting.
    /// Default: 0.85.
    pub damping: f64,
    /// L1 convergence threshold. Default: 1e-6.
    pub tolerance: f64,
    /// Default: 1000.
    pub max_iter: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1e-6,
            max_iter: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Scores from a power-method metric, indexed by dense node index.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerResult {
    pub values: Vec<f64>,
    pub termination: Termination,
}

// ---------------------------------------------------------------------------
// PageRank
// ---------------------------------------------------------------------------

#[must_use]
#[instrument(skip(adj, config, deadline), fields(nodes = adj.node_count()))]
pub fn pagerank(adj: &Adjacency, config: &PageRankConfig, deadline: &Deadline) -> PowerResult {
    let n = adj.node_count();
    if n == 0 {
        return PowerResult {
            values: Vec::new(),
            termination: Termination::Converged { iterations: 0 },
        };
    }

    let n_f64 = n as f64;
    let d = config.damping;
    let out_share: Vec<f64> = (0..n)
        .map(|u| match adj.out_degree(u) {
            0 => 0.0,
            k => 1.0 / k as f64,
        })
        .collect();
    let dangling: Vec<usize> = (0..n).filter(|&u| adj.out_degree(u) == 0).collect();

    let mut ranks = vec![1.0 / n_f64; n];
    let mut next = vec![0.0_f64; n];

    let limits = IterationLimits {
        tolerance: config.tolerance,
        max_iter: config.max_iter,
    };
    let termination = iterate(&limits, deadline, || {
        let dangling_mass: f64 = dangling.iter().map(|&u| ranks[u]).sum();
        let base = (1.0 - d) / n_f64 + d * dangling_mass / n_f64;

        for (v, slot) in next.iter_mut().enumerate() {
            let inflow: f64 = adj
                .predecessors(v)
                .iter()
                .map(|&u| ranks[u] * out_share[u])
                .sum();
            *slot = base + d * inflow;
        }

        let change = l1_distance(&ranks, &next);
        std::mem::swap(&mut ranks, &mut next);
        change
    });

    debug!(
        iterations = termination.iterations(),
        ?termination,
        "pagerank finished"
    );

    PowerResult {
        values: ranks,
        termination,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::MetricStatus;

    fn run(n: usize, edges: &[(usize, usize)]) -> PowerResult {
        pagerank(
            &Adjacency::from_edges(n, edges),
            &PageRankConfig::default(),
            &Deadline::never(),
        )
    }

    #[test]
    fn empty_graph_has_no_scores() {
        let result = run(0, &[]);
        assert!(result.values.is_empty());
        assert_eq!(result.termination.status(), MetricStatus::Computed);
    }

    #[test]
    fn isolated_nodes_are_uniform() {
        let result = run(4, &[]);
        for v in &result.values {
            assert!((v - 0.25).abs() < 1e-12);
        }
        assert_eq!(result.termination, Termination::Converged { iterations: 1 });
    }

    #[test]
    fn chain_rank_increases_toward_the_sink() {
        // 0 → 1 → 2 → 3
        let result = run(4, &[(0, 1), (1, 2), (2, 3)]);
        let r = &result.values;
        assert!(r[3] > r[2] && r[2] > r[1] && r[1] > r[0], "ranks: {r:?}");
        let sum: f64 = r.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn two_cycle_is_symmetric() {
        let result = run(2, &[(0, 1), (1, 0)]);
        assert!((result.values[0] - 0.5).abs() < 1e-9);
        assert!((result.values[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn iteration_cap_reports_approximated() {
        let adj = Adjacency::from_edges(3, &[(0, 1), (1, 2)]);
        let config = PageRankConfig {
            max_iter: 1,
            ..PageRankConfig::default()
        };
        let result = pagerank(&adj, &config, &Deadline::never());
        assert_eq!(result.termination, Termination::Capped { iterations: 1 });
        let sum: f64 = result.values.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
