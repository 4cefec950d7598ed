//! Dense adjacency built once per graph.
//!
//! # Overview
//!
//! Nodes are addressed by their dense index (position in the ID-sorted node
//! list), so every per-node quantity in the engine is a plain `Vec` indexed
//! by that number. Adjacency is stored in compressed sparse row form:
//!
//! ```text
//! offsets: [0, 2, 3, 3]      node v's neighbours are
//! targets: [1, 2, 2]         targets[offsets[v]..offsets[v + 1]]
//! ```
//!
//! Neighbour slices are sorted ascending, which is also ID order, so every
//! traversal in the engine visits neighbours deterministically.
//!
//! [`Adjacency`] keeps both directions of the blocking edges.
//! [`UndirectedView`] is the symmetric closure (deduplicated, no self-loops)
//! used by k-core, articulation points and eigenvector centrality.

/// Compressed sparse rows over dense node indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Csr {
    offsets: Vec<usize>,
    targets: Vec<usize>,
}

impl Csr {
    /// Build from `(row, column)` pairs that are sorted and deduplicated.
    fn from_sorted_pairs(node_count: usize, pairs: &[(usize, usize)]) -> Self {
        let mut offsets = vec![0; node_count + 1];
        for &(row, _) in pairs {
            offsets[row + 1] += 1;
        }
        for v in 0..node_count {
            offsets[v + 1] += offsets[v];
        }
        let targets = pairs.iter().map(|&(_, col)| col).collect();
        Self { offsets, targets }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.targets.len()
    }

    /// Sorted neighbours of `v`.
    #[must_use]
    pub fn row(&self, v: usize) -> &[usize] {
        &self.targets[self.offsets[v]..self.offsets[v + 1]]
    }

    /// Start of `v`'s row in the flat target array.
    #[must_use]
    pub fn offset(&self, v: usize) -> usize {
        self.offsets[v]
    }

    #[must_use]
    pub fn degree(&self, v: usize) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }
}

/// Blocking-edge adjacency in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Adjacency {
    outgoing: Csr,
    incoming: Csr,
}

impl Adjacency {
    /// Build from deduplicated `blocker → blocked` pairs in any order.
    #[must_use]
    pub fn from_edges(node_count: usize, edges: &[(usize, usize)]) -> Self {
        let mut forward: Vec<(usize, usize)> = edges.to_vec();
        forward.sort_unstable();
        forward.dedup();

        let mut backward: Vec<(usize, usize)> = forward.iter().map(|&(u, v)| (v, u)).collect();
        backward.sort_unstable();

        Self {
            outgoing: Csr::from_sorted_pairs(node_count, &forward),
            incoming: Csr::from_sorted_pairs(node_count, &backward),
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.outgoing.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.outgoing.entry_count()
    }

    /// Issues that `v` blocks, ascending.
    #[must_use]
    pub fn successors(&self, v: usize) -> &[usize] {
        self.outgoing.row(v)
    }

    /// Issues that block `v`, ascending.
    #[must_use]
    pub fn predecessors(&self, v: usize) -> &[usize] {
        self.incoming.row(v)
    }

    #[must_use]
    pub fn out_degree(&self, v: usize) -> usize {
        self.outgoing.degree(v)
    }

    #[must_use]
    pub fn in_degree(&self, v: usize) -> usize {
        self.incoming.degree(v)
    }

    /// Position of `v`'s predecessor row in a buffer of `edge_count` slots.
    #[must_use]
    pub fn predecessor_offset(&self, v: usize) -> usize {
        self.incoming.offset(v)
    }

    /// Iterate all edges as `(blocker, blocked)` in ascending order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.node_count())
            .flat_map(move |u| self.successors(u).iter().map(move |&v| (u, v)))
    }
}

/// Symmetric closure of the blocking edges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UndirectedView {
    adj: Csr,
}

impl UndirectedView {
    #[must_use]
    pub fn from_adjacency(adjacency: &Adjacency) -> Self {
        let mut pairs: Vec<(usize, usize)> = Vec::with_capacity(adjacency.edge_count() * 2);
        for (u, v) in adjacency.edges() {
            if u != v {
                pairs.push((u, v));
                pairs.push((v, u));
            }
        }
        pairs.sort_unstable();
        pairs.dedup();
        Self {
            adj: Csr::from_sorted_pairs(adjacency.node_count(), &pairs),
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.adj.node_count()
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adj.entry_count() / 2
    }

    #[must_use]
    pub fn neighbors(&self, v: usize) -> &[usize] {
        self.adj.row(v)
    }

    #[must_use]
    pub fn degree(&self, v: usize) -> usize {
        self.adj.degree(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_sorted_and_deduplicated() {
        let adj = Adjacency::from_edges(4, &[(0, 3), (0, 1), (0, 3), (2, 1)]);
        assert_eq!(adj.edge_count(), 3);
        assert_eq!(adj.successors(0), &[1, 3]);
        assert_eq!(adj.predecessors(1), &[0, 2]);
        assert_eq!(adj.successors(3), &[] as &[usize]);
        assert_eq!(adj.in_degree(3), 1);
    }

    #[test]
    fn predecessor_offsets_partition_the_edge_buffer() {
        let adj = Adjacency::from_edges(3, &[(0, 2), (1, 2), (0, 1)]);
        assert_eq!(adj.predecessor_offset(0), 0);
        assert_eq!(adj.predecessor_offset(1), 0);
        assert_eq!(adj.predecessor_offset(2), 1);
        assert_eq!(adj.predecessor_offset(2) + adj.in_degree(2), adj.edge_count());
    }

    #[test]
    fn undirected_view_merges_reciprocal_edges() {
        // 0 ⇄ 1 is one undirected edge.
        let adj = Adjacency::from_edges(3, &[(0, 1), (1, 0), (1, 2)]);
        let view = UndirectedView::from_adjacency(&adj);
        assert_eq!(view.edge_count(), 2);
        assert_eq!(view.neighbors(1), &[0, 2]);
        assert_eq!(view.degree(0), 1);
    }

    #[test]
    fn empty_graph_has_no_rows() {
        let adj = Adjacency::from_edges(0, &[]);
        assert_eq!(adj.node_count(), 0);
        assert_eq!(adj.edges().count(), 0);
    }
}
