#![forbid(unsafe_code)]
//! depgraph-triage: structural and centrality analytics for issue
//! dependency graphs.
//!
//! # Pipeline
//!
//! 1. [`Graph::build`] turns issues and dependencies into an immutable graph
//!    with a dense index, dropping (and reporting) orphan, self-loop and
//!    duplicate edges.
//! 2. [`AnalysisConfig::for_size`] picks betweenness mode, budgets, the
//!    cycle cap, pool width and the metrics too costly to run from the
//!    graph's size and density.
//! 3. Phase 1 computes degree, Kahn topological order and density.
//! 4. Phase 2 runs PageRank, betweenness, eigenvector, HITS, cycles, k-core,
//!    articulation points and critical path concurrently on a bounded set
//!    of task threads, each under its own deadline. Betweenness pivots fan
//!    out over a separate bounded rayon pool.
//! 5. Everything lands in a [`Snapshot`] whose per-metric status says which
//!    parts are trustworthy.
//!
//! ```no_run
//! use depgraph_core::{Dependency, Issue};
//! use depgraph_triage::{Analyzer, MetricKind};
//!
//! let issues = vec![Issue::new("a"), Issue::new("b")];
//! let deps = vec![Dependency::blocks("a", "b")];
//! let snapshot = Analyzer::adaptive().analyze(&issues, &deps);
//! println!("{:?}", snapshot.status(MetricKind::PageRank));
//! ```

pub mod analyzer;
pub mod config;
pub mod deadline;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod observe;
pub mod pool;
pub mod snapshot;

pub use analyzer::Analyzer;
pub use config::{AnalysisConfig, EnabledMetrics, MetricBudgets, MetricKind, SampleSizePolicy};
pub use deadline::Deadline;
pub use error::{AnalysisError, MetricFailure};
pub use graph::{Graph, GraphBuilder, GraphStats, GraphWarning};
pub use metrics::betweenness::BetweennessMode;
pub use observe::{Counter, Observability, TimingReport};
pub use pool::WorkerPool;
pub use snapshot::{CycleInfo, MetricOutcome, MetricStatus, MetricValue, Snapshot};
