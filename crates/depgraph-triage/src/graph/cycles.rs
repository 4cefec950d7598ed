//! Bounded cycle detection for dependency graphs.
//!
//! # Edge Direction
//!
//! The triage graph uses edge direction `blocker → blocked`. A cycle means a
//! set of issues that transitively block each other and can never start.
//!
//! # Algorithm
//!
//! Iterative Tarjan SCC over the dense adjacency (no recursion, so deep
//! chains cannot overflow the stack). Every SCC with more than one member is
//! a cycle. For each one we report:
//!
//! - `members`: the SCC, sorted by ID.
//! - `path`: one closed directed walk through real edges, starting and
//!   ending at the smallest member, found by BFS restricted to the SCC.
//!
//! # Budget
//!
//! The scan stops early, keeping the cycles found so far, when either the
//! deadline expires (checked every [`DEADLINE_STRIDE`] visited nodes) or a
//! cycle beyond `max_cycles` is found. Memory is bounded by `O(n + m)` plus
//! at most `max_cycles` reported cycles.

use fixedbitset::FixedBitSet;
use std::collections::VecDeque;
use tracing::{debug, instrument};

use crate::deadline::Deadline;
use crate::graph::index::Adjacency;

/// Nodes visited between deadline checks.
pub const DEADLINE_STRIDE: usize = 256;

const UNVISITED: usize = usize::MAX;

/// One dependency cycle, in dense node indices.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cycle {
    /// SCC members, ascending.
    pub members: Vec<usize>,
    /// Closed walk `members[0] → … → members[0]`.
    pub path: Vec<usize>,
}

/// Why a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleScanEnd {
    Complete,
    /// More cycles exist than `max_cycles`.
    CountCapped,
    DeadlineExceeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleScan {
    /// Cycles found, sorted by member list.
    pub cycles: Vec<Cycle>,
    pub end: CycleScanEnd,
    /// Nodes the DFS reached before stopping.
    pub visited: usize,
}

#[must_use]
#[instrument(skip(adj, deadline), fields(nodes = adj.node_count()))]
pub fn detect_cycles(adj: &Adjacency, max_cycles: usize, deadline: &Deadline) -> CycleScan {
    let n = adj.node_count();
    let mut tarjan = Tarjan::new(n);
    let mut witness = WitnessSearch::new(n);
    let mut cycles = Vec::new();
    let mut end = CycleScanEnd::Complete;

    'roots: for root in 0..n {
        if tarjan.index[root] != UNVISITED {
            continue;
        }
        if tarjan.visit(root, deadline) {
            end = CycleScanEnd::DeadlineExceeded;
            break;
        }

        while let Some(&(v, pos)) = tarjan.call.last() {
            let succ = adj.successors(v);
            if pos < succ.len() {
                let top = tarjan.call.len() - 1;
                tarjan.call[top].1 += 1;
                let w = succ[pos];
                if tarjan.index[w] == UNVISITED {
                    if tarjan.visit(w, deadline) {
                        end = CycleScanEnd::DeadlineExceeded;
                        break 'roots;
                    }
                } else if tarjan.on_stack.contains(w) {
                    tarjan.low[v] = tarjan.low[v].min(tarjan.index[w]);
                }
                continue;
            }

            tarjan.call.pop();
            if let Some(&(parent, _)) = tarjan.call.last() {
                tarjan.low[parent] = tarjan.low[parent].min(tarjan.low[v]);
            }
            if tarjan.low[v] != tarjan.index[v] {
                continue;
            }

            let component = tarjan.pop_component(v);
            if component.len() < 2 {
                continue;
            }
            if cycles.len() == max_cycles {
                end = CycleScanEnd::CountCapped;
                break 'roots;
            }
            let path = witness.closed_walk(adj, &component);
            cycles.push(Cycle {
                members: component,
                path,
            });
        }
    }

    cycles.sort_unstable();
    debug!(cycles = cycles.len(), ?end, visited = tarjan.counter, "cycle scan finished");

    CycleScan {
        cycles,
        end,
        visited: tarjan.counter,
    }
}

// ---------------------------------------------------------------------------
// Tarjan state
// ---------------------------------------------------------------------------

struct Tarjan {
    index: Vec<usize>,
    low: Vec<usize>,
    on_stack: FixedBitSet,
    stack: Vec<usize>,
    /// DFS frames: node and position in its successor row.
    call: Vec<(usize, usize)>,
    counter: usize,
}

impl Tarjan {
    fn new(n: usize) -> Self {
        Self {
            index: vec![UNVISITED; n],
            low: vec![0; n],
            on_stack: FixedBitSet::with_capacity(n),
            stack: Vec::new(),
            call: Vec::new(),
            counter: 0,
        }
    }

    /// Enter `v`. Returns `true` if the deadline expired instead.
    fn visit(&mut self, v: usize, deadline: &Deadline) -> bool {
        if self.counter % DEADLINE_STRIDE == 0 && deadline.expired() {
            return true;
        }
        self.index[v] = self.counter;
        self.low[v] = self.counter;
        self.counter += 1;
        self.stack.push(v);
        self.on_stack.insert(v);
        self.call.push((v, 0));
        false
    }

    /// Pop the SCC rooted at `root`, sorted ascending.
    fn pop_component(&mut self, root: usize) -> Vec<usize> {
        let mut component = Vec::new();
        while let Some(w) = self.stack.pop() {
            self.on_stack.set(w, false);
            component.push(w);
            if w == root {
                break;
            }
        }
        component.sort_unstable();
        component
    }
}

// ---------------------------------------------------------------------------
// Witness path
// ---------------------------------------------------------------------------

/// BFS buffers reused across components; `stamp` marks membership and
/// visitation per component without clearing.
struct WitnessSearch {
    member_stamp: Vec<usize>,
    seen_stamp: Vec<usize>,
    parent: Vec<usize>,
    queue: VecDeque<usize>,
    stamp: usize,
}

impl WitnessSearch {
    fn new(n: usize) -> Self {
        Self {
            member_stamp: vec![0; n],
            seen_stamp: vec![0; n],
            parent: vec![UNVISITED; n],
            queue: VecDeque::new(),
            stamp: 0,
        }
    }

    /// Shortest closed walk from the smallest member back to itself.
    fn closed_walk(&mut self, adj: &Adjacency, members: &[usize]) -> Vec<usize> {
        self.stamp += 1;
        let stamp = self.stamp;
        for &m in members {
            self.member_stamp[m] = stamp;
        }

        let start = members[0];
        self.queue.clear();
        self.queue.push_back(start);
        self.seen_stamp[start] = stamp;

        while let Some(v) = self.queue.pop_front() {
            for &w in adj.successors(v) {
                if w == start {
                    let mut back = Vec::new();
                    let mut cursor = v;
                    while cursor != start {
                        back.push(cursor);
                        cursor = self.parent[cursor];
                    }
                    let mut path = Vec::with_capacity(back.len() + 2);
                    path.push(start);
                    path.extend(back.into_iter().rev());
                    path.push(start);
                    return path;
                }
                if self.member_stamp[w] == stamp && self.seen_stamp[w] != stamp {
                    self.seen_stamp[w] = stamp;
                    self.parent[w] = v;
                    self.queue.push_back(w);
                }
            }
        }

        // Unreachable for a genuine SCC of two or more nodes.
        members.to_vec()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::algo::tarjan_scc;
    use petgraph::graph::{DiGraph, NodeIndex};
    use std::time::Duration;

    fn scan(n: usize, edges: &[(usize, usize)]) -> CycleScan {
        detect_cycles(&Adjacency::from_edges(n, edges), 100, &Deadline::never())
    }

    #[test]
    fn dag_has_no_cycles() {
        let result = scan(4, &[(0, 1), (1, 2), (0, 3)]);
        assert!(result.cycles.is_empty());
        assert_eq!(result.end, CycleScanEnd::Complete);
        assert_eq!(result.visited, 4);
    }

    #[test]
    fn triangle_with_isolated_node() {
        // 0 → 1 → 2 → 0, 3 isolated
        let result = scan(4, &[(0, 1), (1, 2), (2, 0)]);
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.cycles[0].members, vec![0, 1, 2]);
        assert_eq!(result.cycles[0].path, vec![0, 1, 2, 0]);
    }

    #[test]
    fn witness_path_uses_real_edges() {
        // 0 → 2 → 1 → 0 plus a chord 2 → 0
        let adj = Adjacency::from_edges(3, &[(0, 2), (2, 1), (1, 0), (2, 0)]);
        let result = detect_cycles(&adj, 10, &Deadline::never());
        let path = &result.cycles[0].path;
        assert_eq!(path.first(), path.last());
        assert_eq!(path, &vec![0, 2, 0]);
        for pair in path.windows(2) {
            assert!(adj.successors(pair[0]).contains(&pair[1]));
        }
    }

    #[test]
    fn matches_petgraph_scc_membership() {
        let edges = [(0, 1), (1, 0), (2, 3), (3, 4), (4, 2), (4, 5), (6, 5)];
        let result = scan(7, &edges);

        let mut pg = DiGraph::<(), ()>::new();
        for _ in 0..7 {
            pg.add_node(());
        }
        for &(a, b) in &edges {
            pg.add_edge(NodeIndex::new(a), NodeIndex::new(b), ());
        }
        let mut expected: Vec<Vec<usize>> = tarjan_scc(&pg)
            .into_iter()
            .filter(|c| c.len() > 1)
            .map(|c| {
                let mut ids: Vec<usize> = c.into_iter().map(NodeIndex::index).collect();
                ids.sort_unstable();
                ids
            })
            .collect();
        expected.sort_unstable();

        let found: Vec<Vec<usize>> = result.cycles.into_iter().map(|c| c.members).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn count_cap_keeps_found_cycles() {
        // Three disjoint 2-cycles.
        let edges = [(0, 1), (1, 0), (2, 3), (3, 2), (4, 5), (5, 4)];
        let result = detect_cycles(&Adjacency::from_edges(6, &edges), 2, &Deadline::never());
        assert_eq!(result.end, CycleScanEnd::CountCapped);
        assert_eq!(result.cycles.len(), 2);
    }

    #[test]
    fn expired_deadline_stops_before_visiting() {
        let result = detect_cycles(
            &Adjacency::from_edges(3, &[(0, 1), (1, 0)]),
            10,
            &Deadline::after(Duration::ZERO),
        );
        assert_eq!(result.end, CycleScanEnd::DeadlineExceeded);
        assert!(result.cycles.is_empty());
    }

    #[test]
    fn long_chain_does_not_recurse() {
        let n = 100_000;
        let edges: Vec<(usize, usize)> = (0..n - 1).map(|i| (i, i + 1)).collect();
        let result = scan(n, &edges);
        assert!(result.cycles.is_empty());
        assert_eq!(result.visited, n);
    }
}
