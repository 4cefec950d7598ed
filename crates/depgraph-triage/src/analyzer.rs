//! Top-level façade: graph → config → Phase 1 → Phase 2 → [`Snapshot`].
//!
//! # Overview
//!
//! [`Analyzer`] is a pure function from (issues, dependencies, config) to a
//! snapshot. It never fails once constructed: every problem found during
//! analysis ends up in the snapshot, either as a graph warning or as a
//! per-metric [`MetricOutcome`].
//!
//! # Phase 2
//!
//! Each enabled metric becomes one task run by [`run_scoped`] on at most
//! `concurrency` threads. Betweenness fans its pivot batches out over the
//! separate rayon [`WorkerPool`]; no other task touches that pool, so a
//! metric never ends up running inside another metric's join. Tasks share
//! the read-only [`Graph`] and Phase 1 results and each returns its own
//! report, so there is no locking. A task runs against the earlier of
//! `start + budget` and the global deadline of the call, and a panic inside
//! one task is caught and recorded against that metric alone.
//!
//! Once every task has reported, results are validated (finite values, PageRank
//! mass, betweenness bounds) and merged into the snapshot in
//! [`MetricKind`] order. A metric failing validation is reported as skipped
//! with its values cleared.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use depgraph_core::{Dependency, ErrorCode, Issue};
use tracing::{debug, instrument, warn};

use crate::config::{AnalysisConfig, MetricKind, PHASE2_TIMEOUT_VAR, SKIP_PHASE2_VAR};
use crate::deadline::Deadline;
use crate::error::{AnalysisError, MetricFailure};
use crate::graph::build::Graph;
use crate::graph::critical_path::{CriticalPathResult, critical_path};
use crate::graph::cycles::{CycleScan, CycleScanEnd, detect_cycles};
use crate::graph::stats::GraphStats;
use crate::graph::structure::{ArticulationPoints, KCore, articulation_points, k_core};
use crate::metrics::basic::{Phase1, phase1};
use crate::metrics::betweenness::{
    BetweennessPlan, BetweennessResult, betweenness, max_betweenness,
};
use crate::metrics::eigenvector::eigenvector_centrality;
use crate::metrics::hits::{HitsResult, hits};
use crate::metrics::pagerank::{PowerResult, pagerank};
use crate::metrics::power::Termination;
use crate::observe::{Counter, Observability};
use crate::pool::{WorkerPool, run_scoped};
use crate::snapshot::{CycleInfo, MetricOutcome, MetricStatus, MetricValue, Snapshot};

/// Allowed distance of the PageRank sum from 1.
pub const PAGERANK_SUM_TOLERANCE: f64 = 1e-5;

/// Runs analyses with either a fixed config or one selected per graph.
pub struct Analyzer {
    config: Option<AnalysisConfig>,
    overrides: BTreeMap<&'static str, String>,
    pool: Option<WorkerPool>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::adaptive()
    }
}

impl Analyzer {
    /// An analyzer that selects its config from each graph's size.
    #[must_use]
    pub const fn adaptive() -> Self {
        Self {
            config: None,
            overrides: BTreeMap::new(),
            pool: None,
        }
    }

    /// Like [`adaptive`](Self::adaptive), with the skip and timeout tunables
    /// read once through `lookup` and applied to every selected config.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidOverride`] for an unparseable value.
    pub fn adaptive_with_overrides<F>(lookup: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides: BTreeMap<&'static str, String> = [SKIP_PHASE2_VAR, PHASE2_TIMEOUT_VAR]
            .into_iter()
            .filter_map(|name| lookup(name).map(|value| (name, value)))
            .collect();
        AnalysisConfig::default().apply_overrides(|name| overrides.get(name).cloned())?;
        Ok(Self {
            overrides,
            ..Self::adaptive()
        })
    }

    /// An analyzer with a fixed config and its own worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] if the config fails
    /// validation, or [`AnalysisError::WorkerPool`] if its pool cannot be
    /// started.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let pool = WorkerPool::new(config.concurrency)?;
        Ok(Self {
            config: Some(config),
            overrides: BTreeMap::new(),
            pool: Some(pool),
        })
    }

    /// The config an analysis of `graph` would run with.
    #[must_use]
    pub fn config_for(&self, graph: &Graph) -> AnalysisConfig {
        if let Some(config) = &self.config {
            return config.clone();
        }
        let mut config = AnalysisConfig::for_size(graph.node_count(), graph.edge_count());
        if let Err(err) = config.apply_overrides(|name| self.overrides.get(name).cloned()) {
            warn!(%err, "ignoring analysis override");
        }
        config
    }

    #[must_use]
    pub fn analyze(&self, issues: &[Issue], dependencies: &[Dependency]) -> Snapshot {
        self.analyze_observed(issues, dependencies, &Observability::disabled())
    }

    /// [`analyze`](Self::analyze), recording timings and counters into `obs`.
    #[must_use]
    #[instrument(skip_all, fields(issues = issues.len(), dependencies = dependencies.len()))]
    pub fn analyze_observed(
        &self,
        issues: &[Issue],
        dependencies: &[Dependency],
        obs: &Observability,
    ) -> Snapshot {
        let graph = obs.timed("graph_build", || Graph::build(issues, dependencies));
        self.analyze_graph(&graph, obs)
    }

    /// Analyze an already built graph.
    #[must_use]
    #[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count()))]
    pub fn analyze_graph(&self, graph: &Graph, obs: &Observability) -> Snapshot {
        let config = self.config_for(graph);
        obs.add(
            Counter::DroppedEdges,
            count(graph.orphan_count() + graph.self_loop_count() + graph.duplicate_edge_count()),
        );

        let phase1 = obs.timed("phase1", || phase1(graph));
        let mut snapshot = initial_snapshot(graph, &config, &phase1);

        for (kind, reason) in config.skipped_metrics() {
            snapshot.outcomes.insert(kind, MetricOutcome::skipped(reason));
        }
        let tasks: Vec<MetricKind> = config.metrics.iter().collect();
        if tasks.is_empty() {
            debug!("phase 2 disabled");
            return snapshot;
        }

        let owned = if self.pool.is_none() {
            acquire_pool(config.concurrency)
        } else {
            None
        };
        let Some(pool) = self.pool.as_ref().or(owned.as_ref()) else {
            for kind in tasks {
                let mut outcome = MetricOutcome::skipped("worker pool unavailable");
                outcome.code = Some(ErrorCode::WorkerPoolUnavailable);
                snapshot.outcomes.insert(kind, outcome);
            }
            return snapshot;
        };

        let reports = obs.timed("phase2", || run_phase2(graph, &phase1, &config, pool, &tasks));
        for (kind, report) in tasks.into_iter().zip(reports) {
            snapshot.timings.insert(kind, report.elapsed);
            obs.record(kind.as_str(), report.elapsed);
            merge(&mut snapshot, graph, &config, kind, report, obs);
        }

        debug!(
            timed_out = snapshot
                .outcomes
                .values()
                .filter(|o| o.status == MetricStatus::TimedOut)
                .count(),
            "analysis finished"
        );
        snapshot
    }
}

// ---------------------------------------------------------------------------
// Phase 2 execution
// ---------------------------------------------------------------------------

enum Computation {
    PageRank(PowerResult),
    Betweenness(BetweennessResult),
    Eigenvector(PowerResult),
    Hits(HitsResult),
    Cycles(CycleScan),
    KCore(KCore),
    Articulation(ArticulationPoints),
    CriticalPath(CriticalPathResult),
}

struct TaskReport {
    /// `Err` carries the panic message.
    result: Result<Computation, String>,
    elapsed: Duration,
}

/// Try the configured width, then a single thread.
fn acquire_pool(width: usize) -> Option<WorkerPool> {
    match WorkerPool::new(width) {
        Ok(pool) => Some(pool),
        Err(err) if width > 1 => {
            warn!(%err, "falling back to a single worker");
            WorkerPool::new(1)
                .map_err(|err| warn!(%err, "no worker pool; phase 2 skipped"))
                .ok()
        }
        Err(err) => {
            warn!(%err, "no worker pool; phase 2 skipped");
            None
        }
    }
}

fn run_phase2(
    graph: &Graph,
    phase1: &Phase1,
    config: &AnalysisConfig,
    pool: &WorkerPool,
    tasks: &[MetricKind],
) -> Vec<TaskReport> {
    let global = Deadline::after(config.global_timeout);
    let plan = config.betweenness_plan(graph.node_count());
    debug!(mode = plan.mode.as_str(), pivots = plan.sample_size, "betweenness plan");

    let slots = run_scoped(tasks, config.concurrency, |&kind| {
        let started = Instant::now();
        let deadline = Deadline::after(config.budgets.for_metric(kind)).earliest(global);
        let result = catch_unwind(AssertUnwindSafe(|| {
            compute(kind, graph, phase1, config, &plan, pool, &deadline)
        }))
        .map_err(|payload| panic_message(payload.as_ref()));
        TaskReport {
            result,
            elapsed: started.elapsed(),
        }
    });

    slots
        .into_iter()
        .zip(tasks)
        .map(|(slot, kind)| {
            slot.unwrap_or_else(|| TaskReport {
                result: Err(format!("{kind} task did not report")),
                elapsed: Duration::ZERO,
            })
        })
        .collect()
}

fn compute(
    kind: MetricKind,
    graph: &Graph,
    phase1: &Phase1,
    config: &AnalysisConfig,
    plan: &BetweennessPlan,
    pool: &WorkerPool,
    deadline: &Deadline,
) -> Computation {
    let adj = graph.adjacency();
    let view = graph.undirected();
    match kind {
        MetricKind::PageRank => Computation::PageRank(pagerank(adj, &config.pagerank, deadline)),
        MetricKind::Betweenness => {
            Computation::Betweenness(betweenness(adj, plan, pool, deadline))
        }
        MetricKind::Eigenvector => {
            Computation::Eigenvector(eigenvector_centrality(view, &config.power, deadline))
        }
        MetricKind::Hits => Computation::Hits(hits(adj, &config.power, deadline)),
        MetricKind::Cycles => Computation::Cycles(detect_cycles(adj, config.max_cycles, deadline)),
        MetricKind::KCore => Computation::KCore(k_core(view, deadline)),
        MetricKind::Articulation => Computation::Articulation(articulation_points(view, deadline)),
        MetricKind::CriticalPath => {
            Computation::CriticalPath(critical_path(adj, &phase1.topo.order, deadline))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

fn merge(
    snapshot: &mut Snapshot,
    graph: &Graph,
    config: &AnalysisConfig,
    kind: MetricKind,
    report: TaskReport,
    obs: &Observability,
) {
    let applied = report
        .result
        .map_err(MetricFailure::Panicked)
        .and_then(|computation| apply(snapshot, graph, config, computation, obs));

    let outcome = match applied {
        Ok(outcome) => outcome,
        Err(failure) => {
            warn!(metric = %kind, %failure, "metric discarded");
            let mut outcome = MetricOutcome::with_status(MetricStatus::Skipped);
            set_failure(&mut outcome, &failure);
            outcome
        }
    };

    if outcome.status == MetricStatus::TimedOut {
        obs.add(Counter::TimedOutMetrics, 1);
        warn!(
            metric = %kind,
            reason = outcome.reason.as_deref().unwrap_or(""),
            "metric timed out"
        );
    } else {
        debug!(
            metric = %kind,
            status = outcome.status.as_str(),
            elapsed_us = report.elapsed.as_micros(),
            "metric finished"
        );
    }
    snapshot.outcomes.insert(kind, outcome);
}

/// Validate one result and write it into the snapshot.
#[allow(clippy::too_many_lines)]
fn apply(
    snapshot: &mut Snapshot,
    graph: &Graph,
    config: &AnalysisConfig,
    computation: Computation,
    obs: &Observability,
) -> Result<MetricOutcome, MetricFailure> {
    let n = graph.node_count();
    match computation {
        Computation::PageRank(result) => {
            check_finite(graph, "pagerank", &result.values)?;
            let sum: f64 = result.values.iter().sum();
            if n > 0 && (sum - 1.0).abs() > PAGERANK_SUM_TOLERANCE {
                return Err(MetricFailure::InvariantViolation(format!(
                    "pagerank sums to {sum}"
                )));
            }
            obs.add(Counter::PowerIterations, count(result.termination.iterations()));
            let outcome = power_outcome(result.termination, config.pagerank.max_iter);
            snapshot.pagerank = MetricValue::new(outcome.status, keyed(graph, &result.values));
            Ok(outcome)
        }

        Computation::Betweenness(result) => {
            check_finite(graph, "betweenness", &result.values)?;
            let bound = max_betweenness(n);
            let slack = 1e-9 * bound.max(1.0);
            if let Some(v) = result
                .values
                .iter()
                .position(|&x| x < 0.0 || x > bound + slack)
            {
                return Err(MetricFailure::InvariantViolation(format!(
                    "betweenness of {} is {} outside [0, {bound}]",
                    graph.id(v),
                    result.values[v]
                )));
            }
            obs.add(Counter::BfsRuns, count(result.completed));
            obs.add(Counter::Pivots, count(result.planned));

            let mut outcome = MetricOutcome::with_status(result.status);
            outcome.sample_size = result.sample_size;
            if result.status == MetricStatus::TimedOut {
                set_failure(
                    &mut outcome,
                    &MetricFailure::DeadlineExceeded {
                        completed: result.completed,
                        planned: result.planned,
                    },
                );
            } else if let Some(k) = result.sample_size {
                outcome.reason = Some(format!("sampled {k} of {n} sources"));
            }
            snapshot.betweenness = MetricValue::new(result.status, keyed(graph, &result.values));
            Ok(outcome)
        }

        Computation::Eigenvector(result) => {
            check_finite(graph, "eigenvector", &result.values)?;
            obs.add(Counter::PowerIterations, count(result.termination.iterations()));
            let outcome = power_outcome(result.termination, config.power.max_iter);
            snapshot.eigenvector = MetricValue::new(outcome.status, keyed(graph, &result.values));
            Ok(outcome)
        }

        Computation::Hits(result) => {
            check_finite(graph, "hub score", &result.hubs)?;
            check_finite(graph, "authority score", &result.authorities)?;
            obs.add(Counter::PowerIterations, count(result.termination.iterations()));
            let outcome = power_outcome(result.termination, config.power.max_iter);
            snapshot.hubs = MetricValue::new(outcome.status, keyed(graph, &result.hubs));
            snapshot.authorities =
                MetricValue::new(outcome.status, keyed(graph, &result.authorities));
            Ok(outcome)
        }

        Computation::Cycles(scan) => {
            let mut outcome = MetricOutcome::with_status(MetricStatus::Computed);
            match scan.end {
                CycleScanEnd::Complete => {}
                CycleScanEnd::CountCapped => {
                    outcome.status = MetricStatus::TimedOut;
                    set_failure(
                        &mut outcome,
                        &MetricFailure::CycleBudgetExhausted {
                            found: scan.cycles.len(),
                        },
                    );
                }
                CycleScanEnd::DeadlineExceeded => {
                    outcome.status = MetricStatus::TimedOut;
                    set_failure(
                        &mut outcome,
                        &MetricFailure::DeadlineExceeded {
                            completed: scan.visited,
                            planned: n,
                        },
                    );
                }
            }
            snapshot.cycles = scan
                .cycles
                .iter()
                .map(|cycle| CycleInfo {
                    members: ids(graph, &cycle.members),
                    path: ids(graph, &cycle.path),
                })
                .collect();
            Ok(outcome)
        }

        Computation::KCore(kc) => {
            if !kc.complete {
                snapshot.core_number = MetricValue::new(MetricStatus::TimedOut, BTreeMap::new());
                return Ok(interrupted());
            }
            snapshot.core_number = MetricValue::new(MetricStatus::Computed, keyed(graph, &kc.core));
            Ok(MetricOutcome::with_status(MetricStatus::Computed))
        }

        Computation::Articulation(ap) => {
            snapshot.articulation_points = ap
                .points
                .iter()
                .map(|&v| graph.id(v).to_string())
                .collect::<BTreeSet<_>>();
            if ap.complete {
                Ok(MetricOutcome::with_status(MetricStatus::Computed))
            } else {
                Ok(interrupted())
            }
        }

        Computation::CriticalPath(cp) => {
            if cp.interrupted {
                snapshot.critical_depth = MetricValue::new(MetricStatus::TimedOut, BTreeMap::new());
                snapshot.slack = MetricValue::new(MetricStatus::TimedOut, BTreeMap::new());
                return Ok(interrupted());
            }
            let mut outcome = MetricOutcome::with_status(MetricStatus::Computed);
            if cp.unordered > 0 {
                outcome.status = MetricStatus::Approximated;
                outcome.reason = Some(format!(
                    "{} items outside topological order",
                    cp.unordered
                ));
            }
            snapshot.critical_depth = MetricValue::new(outcome.status, keyed(graph, &cp.depth));
            snapshot.slack = MetricValue::new(outcome.status, keyed(graph, &cp.slack));
            snapshot.critical_path = ids(graph, &cp.path);
            snapshot.longest_path = cp.longest;
            Ok(outcome)
        }
    }
}

fn power_outcome(termination: Termination, max_iter: usize) -> MetricOutcome {
    let mut outcome = MetricOutcome::with_status(termination.status());
    outcome.iterations = Some(termination.iterations());
    match termination {
        Termination::Converged { .. } => {}
        Termination::Capped { .. } => {
            outcome.reason = Some(format!(
                "iteration cap {max_iter} reached before convergence"
            ));
        }
        Termination::Interrupted { iterations } => set_failure(
            &mut outcome,
            &MetricFailure::DeadlineExceeded {
                completed: iterations,
                planned: max_iter,
            },
        ),
    }
    outcome
}

fn interrupted() -> MetricOutcome {
    let mut outcome = MetricOutcome::with_status(MetricStatus::TimedOut);
    set_failure(&mut outcome, &MetricFailure::Interrupted);
    outcome
}

fn set_failure(outcome: &mut MetricOutcome, failure: &MetricFailure) {
    outcome.reason = Some(failure.to_string());
    outcome.code = Some(failure.code());
}

fn check_finite(graph: &Graph, name: &str, values: &[f64]) -> Result<(), MetricFailure> {
    values
        .iter()
        .position(|x| !x.is_finite())
        .map_or(Ok(()), |v| {
            Err(MetricFailure::InvariantViolation(format!(
                "{name} of {} is not finite",
                graph.id(v)
            )))
        })
}

// ---------------------------------------------------------------------------
// Snapshot helpers
// ---------------------------------------------------------------------------

fn initial_snapshot(graph: &Graph, config: &AnalysisConfig, phase1: &Phase1) -> Snapshot {
    Snapshot {
        graph_hash: graph.content_hash().to_string(),
        config_fingerprint: config.fingerprint(),
        stats: GraphStats::from_graph(graph),
        warnings: graph.warnings().to_vec(),
        in_degree: keyed(graph, &phase1.degree.in_degree),
        out_degree: keyed(graph, &phase1.degree.out_degree),
        topological_order: ids(graph, &phase1.topo.order),
        has_cycles: phase1.topo.has_cycles,
        pagerank: MetricValue::default(),
        betweenness: MetricValue::default(),
        eigenvector: MetricValue::default(),
        hubs: MetricValue::default(),
        authorities: MetricValue::default(),
        core_number: MetricValue::default(),
        articulation_points: BTreeSet::new(),
        critical_depth: MetricValue::default(),
        slack: MetricValue::default(),
        critical_path: Vec::new(),
        longest_path: 0,
        cycles: Vec::new(),
        outcomes: BTreeMap::new(),
        timings: BTreeMap::new(),
    }
}

fn keyed<T: Copy>(graph: &Graph, values: &[T]) -> BTreeMap<String, T> {
    values
        .iter()
        .enumerate()
        .map(|(v, &x)| (graph.id(v).to_string(), x))
        .collect()
}

fn ids(graph: &Graph, indices: &[usize]) -> Vec<String> {
    indices.iter().map(|&v| graph.id(v).to_string()).collect()
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
