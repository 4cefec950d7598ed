//! Basic graph statistics for the dependency graph.
//!
//! # Statistics Provided
//!
//! - **node_count** / **edge_count**: issues and distinct blocking edges.
//! - **density**: `edge_count / (node_count * (node_count - 1))`, 0 for
//!   graphs with fewer than two nodes.
//! - **weakly_connected_component_count**: components of the blocking graph
//!   with direction ignored.
//! - **isolated_node_count**: issues with no blocking edge in either
//!   direction.
//! - **max_in_degree** / **max_out_degree**: the most-blocked and the most
//!   blocking issue.
//! - **orphan / self-loop / duplicate counts**: input the builder repaired.

use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

use crate::graph::build::Graph;
use crate::graph::index::Adjacency;
use crate::metrics::basic::density;

/// Summary statistics for a dependency graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    /// Distinct blocking edges after repair.
    pub edge_count: usize,
    /// `parent-child` edges, which never feed metrics.
    pub hierarchy_edge_count: usize,
    pub density: f64,
    pub weakly_connected_component_count: usize,
    pub isolated_node_count: usize,
    pub max_in_degree: usize,
    pub max_out_degree: usize,
    /// Dependencies dropped because an endpoint was missing.
    pub orphan_edge_count: usize,
    pub self_loop_count: usize,
    pub duplicate_edge_count: usize,
}

impl GraphStats {
    #[must_use]
    pub fn from_graph(graph: &Graph) -> Self {
        let adj = graph.adjacency();
        let n = graph.node_count();

        let isolated_node_count = (0..n)
            .filter(|&v| adj.in_degree(v) == 0 && adj.out_degree(v) == 0)
            .count();
        let max_in_degree = (0..n).map(|v| adj.in_degree(v)).max().unwrap_or(0);
        let max_out_degree = (0..n).map(|v| adj.out_degree(v)).max().unwrap_or(0);

        Self {
            node_count: n,
            edge_count: graph.edge_count(),
            hierarchy_edge_count: graph.hierarchy_edge_count(),
            density: density(n, graph.edge_count()),
            weakly_connected_component_count: weak_components(adj),
            isolated_node_count,
            max_in_degree,
            max_out_degree,
            orphan_edge_count: graph.orphan_count(),
            self_loop_count: graph.self_loop_count(),
            duplicate_edge_count: graph.duplicate_edge_count(),
        }
    }

    /// `true` if the graph has no blocking edges.
    #[must_use]
    pub const fn is_flat(&self) -> bool {
        self.edge_count == 0
    }
}

/// Components of the blocking edges with direction ignored.
fn weak_components(adj: &Adjacency) -> usize {
    let mut sets = UnionFind::<usize>::new(adj.node_count());
    let mut components = adj.node_count();
    for (a, b) in adj.edges() {
        if sets.union(a, b) {
            components -= 1;
        }
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgraph_core::{Dependency, Issue};

    fn stats(nodes: &[&str], edges: &[(&str, &str)]) -> GraphStats {
        let issues: Vec<Issue> = nodes.iter().map(|id| Issue::new(*id)).collect();
        let deps: Vec<Dependency> = edges.iter().map(|(a, b)| Dependency::blocks(*a, *b)).collect();
        GraphStats::from_graph(&Graph::build(&issues, &deps))
    }

    #[test]
    fn empty_graph_stats() {
        let s = stats(&[], &[]);
        assert_eq!(s.node_count, 0);
        assert!(s.density.abs() < f64::EPSILON);
        assert_eq!(s.weakly_connected_component_count, 0);
        assert_eq!(s.max_in_degree, 0);
        assert!(s.is_flat());
    }

    #[test]
    fn single_node_no_edges() {
        let s = stats(&["A"], &[]);
        assert_eq!(s.isolated_node_count, 1);
        assert_eq!(s.weakly_connected_component_count, 1);
    }

    #[test]
    fn density_two_node_one_edge() {
        let s = stats(&["A", "B"], &[("A", "B")]);
        assert!((s.density - 0.5).abs() < 1e-10);
        assert!(!s.is_flat());
    }

    #[test]
    fn disjoint_components_and_isolated_nodes() {
        let s = stats(&["A", "B", "C", "D", "E"], &[("A", "B"), ("C", "D")]);
        assert_eq!(s.weakly_connected_component_count, 3);
        assert_eq!(s.isolated_node_count, 1);
    }

    #[test]
    fn edge_direction_does_not_split_components() {
        // A → B ← C and D → E → D form two weak components.
        let s = stats(
            &["A", "B", "C", "D", "E"],
            &[("A", "B"), ("C", "B"), ("D", "E"), ("E", "D")],
        );
        assert_eq!(s.weakly_connected_component_count, 2);
        assert_eq!(s.isolated_node_count, 0);
    }

    #[test]
    fn max_degree_correct() {
        // Hub: A→C, B→C, D→C, C→E
        let s = stats(
            &["A", "B", "C", "D", "E"],
            &[("A", "C"), ("B", "C"), ("D", "C"), ("C", "E")],
        );
        assert_eq!(s.max_in_degree, 3);
        assert_eq!(s.max_out_degree, 1);
    }

    #[test]
    fn repaired_input_is_counted() {
        let s = stats(&["A", "B"], &[("A", "B"), ("A", "B"), ("A", "Z"), ("B", "B")]);
        assert_eq!(s.edge_count, 1);
        assert_eq!(s.orphan_edge_count, 1);
        assert_eq!(s.self_loop_count, 1);
        assert_eq!(s.duplicate_edge_count, 1);
    }
}
