//! Undirected structure: k-core decomposition and articulation points.
//!
//! Both run on the [`UndirectedView`] built once with the graph, so no
//! second graph object is ever materialized.
//!
//! # K-core
//!
//! Batagelj–Zaveršnik (2003) bin-sort peeling, O(n + m). Vertices are kept
//! in an array bucketed by current degree; processing them in order and
//! decrementing the degree of each higher-degree neighbour (moving it one
//! bucket down with a swap) leaves every vertex's final degree equal to its
//! core number.
//!
//! # Articulation points
//!
//! Iterative Hopcroft–Tarjan DFS with discovery times and low-links. A
//! non-root `p` is a cut vertex if some DFS child `c` has
//! `low[c] ≥ disc[p]`; a root is one if it has more than one DFS child.
//!
//! Both scans poll the deadline every [`DEADLINE_STRIDE`] vertices and
//! report an incomplete result when it expires.

use fixedbitset::FixedBitSet;
use tracing::{debug, instrument};

use crate::deadline::Deadline;
use crate::graph::index::UndirectedView;

/// Vertices processed between deadline checks.
pub const DEADLINE_STRIDE: usize = 1024;

const UNSEEN: usize = usize::MAX;

// ---------------------------------------------------------------------------
// K-core
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KCore {
    /// Core number per dense index; meaningful only when `complete`.
    pub core: Vec<usize>,
    pub complete: bool,
}

#[must_use]
#[instrument(skip(view, deadline), fields(nodes = view.node_count()))]
pub fn k_core(view: &UndirectedView, deadline: &Deadline) -> KCore {
    let n = view.node_count();
    let mut deg: Vec<usize> = (0..n).map(|v| view.degree(v)).collect();
    let max_deg = deg.iter().copied().max().unwrap_or(0);

    // bin[d] = start of the degree-d bucket in `vert`.
    let mut bin = vec![0_usize; max_deg + 1];
    for &d in &deg {
        bin[d] += 1;
    }
    let mut start = 0;
    for slot in &mut bin {
        let count = *slot;
        *slot = start;
        start += count;
    }

    let mut pos = vec![0_usize; n];
    let mut vert = vec![0_usize; n];
    for v in 0..n {
        pos[v] = bin[deg[v]];
        vert[pos[v]] = v;
        bin[deg[v]] += 1;
    }
    for d in (1..=max_deg).rev() {
        bin[d] = bin[d - 1];
    }
    if let Some(first) = bin.first_mut() {
        *first = 0;
    }

    for i in 0..n {
        if i % DEADLINE_STRIDE == 0 && deadline.expired() {
            debug!(processed = i, "k-core stopped at deadline");
            return KCore {
                core: deg,
                complete: false,
            };
        }
        let v = vert[i];
        for &u in view.neighbors(v) {
            if deg[u] > deg[v] {
                let du = deg[u];
                let pu = pos[u];
                let pw = bin[du];
                let w = vert[pw];
                if u != w {
                    pos[u] = pw;
                    vert[pu] = w;
                    pos[w] = pu;
                    vert[pw] = u;
                }
                bin[du] += 1;
                deg[u] -= 1;
            }
        }
    }

    KCore {
        core: deg,
        complete: true,
    }
}

// ---------------------------------------------------------------------------
// Articulation points
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticulationPoints {
    /// Cut vertices, ascending. When `complete` is false this holds every
    /// cut vertex of the components finished before the deadline, plus the
    /// non-root cut vertices the interrupted component had already
    /// confirmed through a finished DFS subtree. Every listed vertex is a
    /// real cut vertex; some may be missing.
    pub points: Vec<usize>,
    pub complete: bool,
}

#[must_use]
#[instrument(skip(view, deadline), fields(nodes = view.node_count()))]
pub fn articulation_points(view: &UndirectedView, deadline: &Deadline) -> ArticulationPoints {
    let n = view.node_count();
    let mut disc = vec![UNSEEN; n];
    let mut low = vec![0_usize; n];
    let mut parent = vec![UNSEEN; n];
    let mut cut = FixedBitSet::with_capacity(n);
    let mut frames: Vec<(usize, usize)> = Vec::new();
    let mut timer = 0_usize;
    let mut complete = true;

    'roots: for root in 0..n {
        if disc[root] != UNSEEN {
            continue;
        }
        disc[root] = timer;
        low[root] = timer;
        timer += 1;
        frames.push((root, 0));
        let mut root_children = 0;

        while let Some(&(v, i)) = frames.last() {
            let neighbors = view.neighbors(v);
            if i < neighbors.len() {
                let top = frames.len() - 1;
                frames[top].1 += 1;
                let w = neighbors[i];
                if disc[w] == UNSEEN {
                    if timer % DEADLINE_STRIDE == 0 && deadline.expired() {
                        complete = false;
                        break 'roots;
                    }
                    parent[w] = v;
                    disc[w] = timer;
                    low[w] = timer;
                    timer += 1;
                    if v == root {
                        root_children += 1;
                    }
                    frames.push((w, 0));
                } else if w != parent[v] {
                    low[v] = low[v].min(disc[w]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(p, _)) = frames.last() {
                low[p] = low[p].min(low[v]);
                if p != root && low[v] >= disc[p] {
                    cut.insert(p);
                }
            }
        }

        if root_children > 1 {
            cut.insert(root);
        }
    }

    let points: Vec<usize> = cut.ones().collect();
    debug!(points = points.len(), complete, "articulation scan finished");
    ArticulationPoints { points, complete }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::index::Adjacency;
    use std::time::Duration;

    fn view(n: usize, edges: &[(usize, usize)]) -> UndirectedView {
        UndirectedView::from_adjacency(&Adjacency::from_edges(n, edges))
    }

    #[test]
    fn k_core_of_triangle_with_tail() {
        // Triangle 0-1-2 plus tail 2-3.
        let v = view(4, &[(0, 1), (1, 2), (2, 0), (2, 3)]);
        let kc = k_core(&v, &Deadline::never());
        assert!(kc.complete);
        assert_eq!(kc.core, vec![2, 2, 2, 1]);
    }

    #[test]
    fn k_core_of_clique_and_isolated() {
        // K4 on 0..4, node 4 isolated.
        let mut edges = Vec::new();
        for a in 0..4 {
            for b in (a + 1)..4 {
                edges.push((a, b));
            }
        }
        let kc = k_core(&view(5, &edges), &Deadline::never());
        assert_eq!(kc.core, vec![3, 3, 3, 3, 0]);
    }

    #[test]
    fn k_core_ignores_edge_direction_and_reciprocals() {
        let kc = k_core(&view(2, &[(0, 1), (1, 0)]), &Deadline::never());
        assert_eq!(kc.core, vec![1, 1]);
    }

    #[test]
    fn chain_interior_nodes_are_cut_vertices() {
        let ap = articulation_points(&view(4, &[(0, 1), (1, 2), (2, 3)]), &Deadline::never());
        assert!(ap.complete);
        assert_eq!(ap.points, vec![1, 2]);
    }

    #[test]
    fn cycle_has_no_cut_vertices() {
        let ap = articulation_points(&view(3, &[(0, 1), (1, 2), (2, 0)]), &Deadline::never());
        assert!(ap.points.is_empty());
    }

    #[test]
    fn star_root_is_a_cut_vertex() {
        let ap = articulation_points(&view(4, &[(0, 1), (0, 2), (0, 3)]), &Deadline::never());
        assert_eq!(ap.points, vec![0]);
    }

    #[test]
    fn bowtie_center() {
        // Two triangles sharing node 2.
        let edges = [(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 2)];
        let ap = articulation_points(&view(5, &edges), &Deadline::never());
        assert_eq!(ap.points, vec![2]);
    }

    #[test]
    fn expired_deadline_marks_incomplete() {
        let kc = k_core(&view(3, &[(0, 1)]), &Deadline::after(Duration::ZERO));
        assert!(!kc.complete);
    }

    #[test]
    fn interrupted_scan_keeps_cut_vertices_of_finished_subtrees() {
        // 0 - 1 - 2 with a long tail 1 - 3 - 4 - ... The leaf 2 finishes
        // before the tail reaches the first deadline poll.
        let n = DEADLINE_STRIDE + 100;
        let mut edges = vec![(0, 1), (1, 2), (1, 3)];
        edges.extend((3..n - 1).map(|v| (v, v + 1)));
        let ap = articulation_points(&view(n, &edges), &Deadline::after(Duration::ZERO));
        assert!(!ap.complete);
        assert_eq!(ap.points, vec![1]);
    }
}
