//! Graph construction from issue and dependency records.
//!
//! # Overview
//!
//! [`GraphBuilder`] turns the loader's issue list and dependency list into
//! an immutable [`Graph`]. Construction is O(n log n + m log m) and never
//! fails: malformed input is repaired and reported as [`GraphWarning`]s.
//!
//! ## Edge Direction
//!
//! An edge `A → B` means "A **blocks** B": A must be finished before B can
//! start. Topological order therefore lists blockers first.
//!
//! ## Input Repair
//!
//! | Input                               | Handling                                  |
//! |-------------------------------------|-------------------------------------------|
//! | Same issue ID twice                 | merged, last attributes win               |
//! | Dependency to/from a missing issue  | dropped, [`ErrorCode::OrphanEdge`]        |
//! | Issue depending on itself           | dropped, [`ErrorCode::SelfDependency`]    |
//! | Same dependency twice               | kept once, [`ErrorCode::DuplicateEdge`]   |
//!
//! [`GraphBuilder::build_strict`] turns the orphan case into an error for
//! callers that prefer to validate.
//!
//! ## Only Blocking Edges
//!
//! `parent-child` edges are validated and counted but excluded from the
//! adjacency every metric runs on.
//!
//! ## Cache Invalidation
//!
//! [`Graph::content_hash`] is a BLAKE3 hash of the sorted node IDs and the
//! sorted blocking edge list, so it changes exactly when metric input changes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use depgraph_core::{Dependency, ErrorCode, Issue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::AnalysisError;
use crate::graph::index::{Adjacency, UndirectedView};

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// A non-fatal problem found while building the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphWarning {
    pub code: ErrorCode,
    /// The issue ID or `source -> target` pair the warning is about.
    pub subject: String,
    pub detail: String,
}

impl GraphWarning {
    fn orphan(dep: &Dependency, missing: &str) -> Self {
        Self {
            code: ErrorCode::OrphanEdge,
            subject: format!("{} -> {}", dep.source, dep.target),
            detail: format!("{} edge references missing issue '{missing}'", dep.kind),
        }
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Immutable dependency graph with a dense node index.
///
/// Node `i` is the `i`-th issue in ascending ID order in every view:
/// the blocking [`Adjacency`] and its [`UndirectedView`].
#[derive(Debug, Clone)]
pub struct Graph {
    issues: Vec<Issue>,
    index: HashMap<String, usize>,
    blocking: Adjacency,
    undirected: UndirectedView,
    hierarchy_edge_count: usize,
    warnings: Vec<GraphWarning>,
    orphan_count: usize,
    self_loop_count: usize,
    duplicate_edge_count: usize,
    content_hash: String,
}

impl Graph {
    /// Shorthand for `GraphBuilder::new().issues(..).dependencies(..).build()`.
    #[must_use]
    pub fn build(issues: &[Issue], dependencies: &[Dependency]) -> Self {
        GraphBuilder::new()
            .issues(issues.iter().cloned())
            .dependencies(dependencies.iter().cloned())
            .build()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.issues.len()
    }

    /// Number of distinct blocking edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.blocking.edge_count()
    }

    #[must_use]
    pub fn hierarchy_edge_count(&self) -> usize {
        self.hierarchy_edge_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues in dense-index (ascending ID) order.
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    #[must_use]
    pub fn issue(&self, v: usize) -> &Issue {
        &self.issues[v]
    }

    #[must_use]
    pub fn id(&self, v: usize) -> &str {
        &self.issues[v].id
    }

    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Dense blocking adjacency every metric runs on.
    #[must_use]
    pub const fn adjacency(&self) -> &Adjacency {
        &self.blocking
    }

    #[must_use]
    pub const fn undirected(&self) -> &UndirectedView {
        &self.undirected
    }

    #[must_use]
    pub fn warnings(&self) -> &[GraphWarning] {
        &self.warnings
    }

    #[must_use]
    pub const fn orphan_count(&self) -> usize {
        self.orphan_count
    }

    #[must_use]
    pub const fn self_loop_count(&self) -> usize {
        self.self_loop_count
    }

    #[must_use]
    pub const fn duplicate_edge_count(&self) -> usize {
        self.duplicate_edge_count
    }

    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// IDs of the issues blocking `id`, ascending. Empty for unknown IDs.
    #[must_use]
    pub fn blockers(&self, id: &str) -> Vec<&str> {
        self.index_of(id).map_or_else(Vec::new, |v| {
            self.blocking
                .predecessors(v)
                .iter()
                .map(|&u| self.id(u))
                .collect()
        })
    }

    /// Blockers of `id` that are not closed yet.
    #[must_use]
    pub fn open_blockers(&self, id: &str) -> Vec<&str> {
        self.index_of(id).map_or_else(Vec::new, |v| {
            self.blocking
                .predecessors(v)
                .iter()
                .filter(|&&u| !self.issues[u].status.is_closed())
                .map(|&u| self.id(u))
                .collect()
        })
    }

    /// Issues that can be worked on now: not closed and every blocker closed.
    ///
    /// Dependencies on missing issues were dropped at build time and so
    /// never block.
    #[must_use]
    pub fn actionable(&self) -> Vec<&str> {
        (0..self.node_count())
            .filter(|&v| !self.issues[v].status.is_closed())
            .filter(|&v| {
                self.blocking
                    .predecessors(v)
                    .iter()
                    .all(|&u| self.issues[u].status.is_closed())
            })
            .map(|v| self.id(v))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// GraphBuilder
// ---------------------------------------------------------------------------

/// Collects issues and dependencies, then builds a [`Graph`].
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    issues: Vec<Issue>,
    dependencies: Vec<Dependency>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    #[must_use]
    pub fn issues(mut self, issues: impl IntoIterator<Item = Issue>) -> Self {
        self.issues.extend(issues);
        self
    }

    #[must_use]
    pub fn dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    #[must_use]
    pub fn dependencies(mut self, dependencies: impl IntoIterator<Item = Dependency>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Build the graph, repairing malformed input and recording warnings.
    #[must_use]
    #[instrument(skip(self), fields(issues = self.issues.len(), dependencies = self.dependencies.len()))]
    pub fn build(self) -> Graph {
        let mut warnings = Vec::new();

        // Step 1: merge issues by ID, last write wins. BTreeMap gives the
        // dense order for free.
        let mut merged: BTreeMap<String, Issue> = BTreeMap::new();
        for issue in self.issues {
            if let Some(previous) = merged.insert(issue.id.clone(), issue) {
                warnings.push(GraphWarning {
                    code: ErrorCode::DuplicateIssue,
                    subject: previous.id,
                    detail: "issue supplied more than once; later attributes kept".to_string(),
                });
            }
        }
        let issues: Vec<Issue> = merged.into_values().collect();
        let index: HashMap<String, usize> = issues
            .iter()
            .enumerate()
            .map(|(i, issue)| (issue.id.clone(), i))
            .collect();

        // Step 2: resolve dependencies against the node set.
        let mut blocking: BTreeSet<(usize, usize)> = BTreeSet::new();
        let mut hierarchy: BTreeSet<(usize, usize)> = BTreeSet::new();
        let mut orphan_count = 0;
        let mut self_loop_count = 0;
        let mut duplicate_edge_count = 0;

        for dep in &self.dependencies {
            let (from, to) = match (index.get(&dep.source), index.get(&dep.target)) {
                (Some(&from), Some(&to)) => (from, to),
                (from, _) => {
                    let missing = if from.is_none() { &dep.source } else { &dep.target };
                    warn!(source = %dep.source, target = %dep.target, "dropping dependency on missing issue");
                    warnings.push(GraphWarning::orphan(dep, missing));
                    orphan_count += 1;
                    continue;
                }
            };

            if from == to {
                self_loop_count += 1;
                warnings.push(GraphWarning {
                    code: ErrorCode::SelfDependency,
                    subject: dep.source.clone(),
                    detail: format!("{} edge from an issue to itself dropped", dep.kind),
                });
                continue;
            }

            let set = if dep.kind.is_blocking() {
                &mut blocking
            } else {
                &mut hierarchy
            };
            if !set.insert((from, to)) {
                duplicate_edge_count += 1;
                warnings.push(GraphWarning {
                    code: ErrorCode::DuplicateEdge,
                    subject: format!("{} -> {}", dep.source, dep.target),
                    detail: format!("{} edge supplied more than once", dep.kind),
                });
            }
        }

        let edges: Vec<(usize, usize)> = blocking.into_iter().collect();
        let content_hash = compute_content_hash(&issues, &edges);

        // Step 3: dense adjacency and the undirected view over it.
        let adjacency = Adjacency::from_edges(issues.len(), &edges);
        let undirected = UndirectedView::from_adjacency(&adjacency);

        debug!(
            nodes = issues.len(),
            edges = edges.len(),
            orphans = orphan_count,
            "graph built"
        );

        Graph {
            issues,
            index,
            blocking: adjacency,
            undirected,
            hierarchy_edge_count: hierarchy.len(),
            warnings,
            orphan_count,
            self_loop_count,
            duplicate_edge_count,
            content_hash,
        }
    }

    /// Like [`build`](Self::build), but reject dependencies on missing issues.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::OrphanEdge`] for the first dependency whose
    /// source or target is not among the supplied issues.
    pub fn build_strict(self) -> Result<Graph, AnalysisError> {
        let known: BTreeSet<&str> = self.issues.iter().map(|i| i.id.as_str()).collect();
        if let Some(dep) = self
            .dependencies
            .iter()
            .find(|d| !known.contains(d.source.as_str()) || !known.contains(d.target.as_str()))
        {
            let missing = if known.contains(dep.source.as_str()) {
                dep.target.clone()
            } else {
                dep.source.clone()
            };
            return Err(AnalysisError::OrphanEdge {
                from: dep.source.clone(),
                to: dep.target.clone(),
                missing,
            });
        }
        Ok(self.build())
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn compute_content_hash(issues: &[Issue], edges: &[(usize, usize)]) -> String {
    let mut hasher = blake3::Hasher::new();
    for issue in issues {
        hasher.update(b"n\x00");
        hasher.update(issue.id.as_bytes());
        hasher.update(b"\x00");
    }
    for &(from, to) in edges {
        hasher.update(b"e\x00");
        hasher.update(issues[from].id.as_bytes());
        hasher.update(b"\x00");
        hasher.update(issues[to].id.as_bytes());
        hasher.update(b"\x00");
    }
    format!("blake3:{}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
