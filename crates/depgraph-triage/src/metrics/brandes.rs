//! Single-source Brandes accumulation over reusable scratch buffers.
//!
//! # Overview
//!
//! Brandes' algorithm (2001) computes betweenness as a sum of per-source
//! dependency vectors. For one source `s`:
//!
//! 1. BFS from `s` recording `dist`, the number of shortest paths `sigma`,
//!    and each node's shortest-path predecessors.
//! 2. Walk the BFS order backwards accumulating
//!    `delta(v) += sigma(v) / sigma(w) * (1 + delta(w))` for each
//!    predecessor `v` of `w`, and add `delta(w)` to `w`'s total.
//!
//! # Scratch Layout
//!
//! Every array is dense and sized once per graph, so a worker allocates one
//! [`BrandesScratch`] and reuses it across all of its sources:
//!
//! - `order` is both the BFS queue (read head advances through it) and the
//!   stack for the backward pass (iterated in reverse).
//! - Predecessors live in one flat buffer of `edge_count` slots. Node `w`'s
//!   predecessors occupy its in-edge row of the CSR layout, since every
//!   shortest-path predecessor is an in-neighbour; `pred_len[w]` counts the
//!   filled prefix.
//! - Between runs only the nodes the previous BFS reached are reset, so the
//!   cost of a source is proportional to what it reaches, not to `n`.
//!
//! Successor rows are sorted by node index (ID order), so the BFS order,
//! the predecessor lists and every floating-point sum are identical on every
//! call for the same source.

use crate::graph::index::Adjacency;

const UNSEEN: usize = usize::MAX;

/// Per-worker buffers for repeated single-source runs.
#[derive(Debug, Clone)]
pub struct BrandesScratch {
    sigma: Vec<f64>,
    dist: Vec<usize>,
    delta: Vec<f64>,
    preds: Vec<usize>,
    pred_len: Vec<usize>,
    order: Vec<usize>,
}

impl BrandesScratch {
    #[must_use]
    pub fn new(adj: &Adjacency) -> Self {
        let n = adj.node_count();
        Self {
            sigma: vec![0.0; n],
            dist: vec![UNSEEN; n],
            delta: vec![0.0; n],
            preds: vec![0; adj.edge_count()],
            pred_len: vec![0; n],
            order: Vec::with_capacity(n),
        }
    }

    /// Add the dependency of every node on `source` into `totals`.
    ///
    /// Returns the number of nodes the BFS reached, `source` included.
    pub fn accumulate(&mut self, adj: &Adjacency, source: usize, totals: &mut [f64]) -> usize {
        let Self {
            sigma,
            dist,
            delta,
            preds,
            pred_len,
            order,
        } = self;

        for &v in order.iter() {
            sigma[v] = 0.0;
            dist[v] = UNSEEN;
            delta[v] = 0.0;
            pred_len[v] = 0;
        }
        order.clear();

        sigma[source] = 1.0;
        dist[source] = 0;
        order.push(source);

        let mut head = 0;
        while head < order.len() {
            let v = order[head];
            head += 1;
            let next = dist[v] + 1;
            for &w in adj.successors(v) {
                if dist[w] == UNSEEN {
                    dist[w] = next;
                    order.push(w);
                }
                if dist[w] == next {
                    sigma[w] += sigma[v];
                    preds[adj.predecessor_offset(w) + pred_len[w]] = v;
                    pred_len[w] += 1;
                }
            }
        }

        for &w in order.iter().rev() {
            let start = adj.predecessor_offset(w);
            let coeff = (1.0 + delta[w]) / sigma[w];
            for &v in &preds[start..start + pred_len[w]] {
                delta[v] += sigma[v] * coeff;
            }
            if w != source {
                totals[w] += delta[w];
            }
        }

        order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(n: usize, edges: &[(usize, usize)]) -> Vec<f64> {
        let adj = Adjacency::from_edges(n, edges);
        let mut scratch = BrandesScratch::new(&adj);
        let mut totals = vec![0.0; n];
        for s in 0..n {
            scratch.accumulate(&adj, s, &mut totals);
        }
        totals
    }

    #[test]
    fn chain_middle_nodes_carry_paths() {
        // 0 → 1 → 2 → 3: node 1 sits on (0,2),(0,3); node 2 on (0,3),(1,3).
        let bc = exact(4, &[(0, 1), (1, 2), (2, 3)]);
        assert_eq!(bc, vec![0.0, 2.0, 2.0, 0.0]);
    }

    #[test]
    fn diamond_splits_paths_evenly() {
        // 0 → {1, 2} → 3: two shortest paths from 0 to 3.
        let bc = exact(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert!((bc[1] - 0.5).abs() < 1e-12);
        assert!((bc[2] - 0.5).abs() < 1e-12);
        assert!(bc[0].abs() < 1e-12 && bc[3].abs() < 1e-12);
    }

    #[test]
    fn scratch_reuse_matches_fresh_buffers() {
        let edges = [(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (1, 4)];
        let adj = Adjacency::from_edges(5, &edges);

        let mut reused = BrandesScratch::new(&adj);
        let mut reused_totals = vec![0.0; 5];
        let mut fresh_totals = vec![0.0; 5];
        for s in [3, 0, 4, 2, 1] {
            reused.accumulate(&adj, s, &mut reused_totals);
            BrandesScratch::new(&adj).accumulate(&adj, s, &mut fresh_totals);
        }
        assert_eq!(reused_totals, fresh_totals);
    }

    #[test]
    fn reach_count_includes_source() {
        let adj = Adjacency::from_edges(3, &[(0, 1)]);
        let mut scratch = BrandesScratch::new(&adj);
        let mut totals = vec![0.0; 3];
        assert_eq!(scratch.accumulate(&adj, 0, &mut totals), 2);
        assert_eq!(scratch.accumulate(&adj, 2, &mut totals), 1);
    }
}
