//! Eigenvector centrality via power iteration.
//!
//! # Overview
//!
//! Eigenvector centrality scores a node by the scores of its neighbours: an
//! issue tangled up with other central issues is central itself.
//!
//! # Algorithm
//!
//! A blocking graph is mostly acyclic, and on a DAG the directed adjacency
//! matrix is nilpotent, so plain power iteration collapses to zero. We
//! therefore iterate on the **undirected** view, shifted by the identity:
//!
//! ```text
//! x'(v) = x(v) + Σ x(u)   for u adjacent to v
//! x'    = x' / ‖x'‖₂
//! ```
//!
//! The shift (`A + I`) keeps the same eigenvectors but makes the dominant
//! eigenvalue strictly largest in magnitude, so bipartite graphs (chains,
//! stars) converge instead of oscillating between two vectors.

use tracing::{debug, instrument};

use crate::deadline::Deadline;
use crate::graph::index::UndirectedView;
use crate::metrics::pagerank::PowerResult;
use crate::metrics::power::{IterationLimits, Termination, iterate, l2_distance, normalize_l2};

#[must_use]
#[instrument(skip(view, limits, deadline), fields(nodes = view.node_count()))]
pub fn eigenvector_centrality(
    view: &UndirectedView,
    limits: &IterationLimits,
    deadline: &Deadline,
) -> PowerResult {
    let n = view.node_count();
    if n == 0 {
        return PowerResult {
            values: Vec::new(),
            termination: Termination::Converged { iterations: 0 },
        };
    }

    let mut scores = vec![1.0 / (n as f64).sqrt(); n];
    let mut next = vec![0.0_f64; n];

    let termination = iterate(limits, deadline, || {
        for (v, slot) in next.iter_mut().enumerate() {
            *slot = scores[v] + view.neighbors(v).iter().map(|&u| scores[u]).sum::<f64>();
        }
        normalize_l2(&mut next);
        let change = l2_distance(&scores, &next);
        std::mem::swap(&mut scores, &mut next);
        change
    });

    debug!(iterations = termination.iterations(), "eigenvector finished");

    PowerResult {
        values: scores,
        termination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::index::Adjacency;
    use crate::snapshot::MetricStatus;

    fn run(n: usize, edges: &[(usize, usize)]) -> PowerResult {
        let view = UndirectedView::from_adjacency(&Adjacency::from_edges(n, edges));
        eigenvector_centrality(&view, &IterationLimits::default(), &Deadline::never())
    }

    #[test]
    fn star_center_dominates() {
        // 0 blocks 1..=4
        let result = run(5, &[(0, 1), (0, 2), (0, 3), (0, 4)]);
        assert_eq!(result.termination.status(), MetricStatus::Computed);
        let r = &result.values;
        for leaf in 1..5 {
            assert!(r[0] > r[leaf]);
            assert!((r[leaf] - r[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn chain_converges_despite_bipartite_structure() {
        let result = run(4, &[(0, 1), (1, 2), (2, 3)]);
        assert_eq!(result.termination.status(), MetricStatus::Computed);
        let r = &result.values;
        // Symmetric chain: inner nodes tie, ends tie.
        assert!((r[0] - r[3]).abs() < 1e-5);
        assert!((r[1] - r[2]).abs() < 1e-5);
        assert!(r[1] > r[0]);
    }

    #[test]
    fn edgeless_graph_keeps_uniform_scores() {
        let result = run(3, &[]);
        assert_eq!(result.termination, Termination::Converged { iterations: 1 });
        let norm: f64 = result.values.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }
}
