//! Analysis configuration and size-adaptive selection.
//!
//! # Overview
//!
//! [`AnalysisConfig::for_size`] is the config selector: a pure function of
//! node and edge count that picks the betweenness mode, per-metric time
//! budgets, the cycle cap, the worker-pool width and which metrics are too
//! expensive to run at all.
//!
//! | Nodes        | Betweenness                        | Cycles | HITS                   | Cycle cap |
//! |--------------|------------------------------------|--------|------------------------|-----------|
//! | < 100        | exact                              | on     | on                     | 1000      |
//! | 100 ..= 500  | exact                              | on     | on                     | 100       |
//! | 501 .. 2000  | sampled; skipped at density ≥ 0.01 | on     | on                     | 50        |
//! | ≥ 2000       | sampled                            | off    | off at density ≥ 0.001 | 10        |
//!
//! Budgets grow with `(n / 500)²`, the shape of Brandes' cost on sparse
//! graphs, clamped to `[250 ms, 5 s]`; betweenness gets twice the base.
//!
//! The pivot count is not fixed by the selector. [`betweenness_plan`]
//! resolves it per graph: exact at or below `exact_threshold`, otherwise
//! `sample_size` if set, else `sample_policy` applied to the node count.
//!
//! [`betweenness_plan`]: AnalysisConfig::betweenness_plan
//!
//! Presets: [`full`](AnalysisConfig::full) (everything, exact, generous
//! budgets), [`triage`](AnalysisConfig::triage) (PageRank and sampled
//! betweenness only) and [`none`](AnalysisConfig::none) (Phase 2 off).
//!
//! # Overrides
//!
//! [`apply_overrides`](AnalysisConfig::apply_overrides) reads two tunables
//! through a caller-supplied lookup, so the engine itself never touches the
//! process environment:
//!
//! - `DEPGRAPH_SKIP_PHASE2`: truthy disables every expensive Phase 2 metric
//!   (k-core and articulation points stay on).
//! - `DEPGRAPH_PHASE2_TIMEOUT_S`: a positive whole number of seconds used as
//!   every metric's budget. The global deadline is raised to match if it
//!   was shorter.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::metrics::basic::density;
use crate::metrics::betweenness::{BetweennessMode, BetweennessPlan};
use crate::metrics::pagerank::PageRankConfig;
use crate::metrics::power::IterationLimits;

pub const SKIP_PHASE2_VAR: &str = "DEPGRAPH_SKIP_PHASE2";
pub const PHASE2_TIMEOUT_VAR: &str = "DEPGRAPH_PHASE2_TIMEOUT_S";

const DEFAULT_EXACT_THRESHOLD: usize = 500;
const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_SEED: u64 = 1;
const SMALL_GRAPH_NODES: usize = 100;
const XL_GRAPH_NODES: usize = 2000;
/// Density at or above which sampled betweenness is skipped below XL size.
const DENSE_LARGE: f64 = 0.01;
/// Density at or above which HITS is skipped on XL graphs.
const DENSE_XL: f64 = 0.001;
const MIN_BUDGET: Duration = Duration::from_millis(250);
const MAX_BUDGET: Duration = Duration::from_secs(5);
const MAX_GLOBAL_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// MetricKind
// ---------------------------------------------------------------------------

/// The Phase 2 metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricKind {
    #[serde(rename = "pagerank")]
    PageRank,
    #[serde(rename = "betweenness")]
    Betweenness,
    #[serde(rename = "eigenvector")]
    Eigenvector,
    #[serde(rename = "hits")]
    Hits,
    #[serde(rename = "cycles")]
    Cycles,
    #[serde(rename = "k_core")]
    KCore,
    #[serde(rename = "articulation")]
    Articulation,
    #[serde(rename = "critical_path")]
    CriticalPath,
}

impl MetricKind {
    pub const ALL: [Self; 8] = [
        Self::PageRank,
        Self::Betweenness,
        Self::Eigenvector,
        Self::Hits,
        Self::Cycles,
        Self::KCore,
        Self::Articulation,
        Self::CriticalPath,
    ];

    /// Metrics disabled by `DEPGRAPH_SKIP_PHASE2`.
    pub const EXPENSIVE: [Self; 6] = [
        Self::PageRank,
        Self::Betweenness,
        Self::Eigenvector,
        Self::Hits,
        Self::Cycles,
        Self::CriticalPath,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PageRank => "pagerank",
            Self::Betweenness => "betweenness",
            Self::Eigenvector => "eigenvector",
            Self::Hits => "hits",
            Self::Cycles => "cycles",
            Self::KCore => "k_core",
            Self::Articulation => "articulation",
            Self::CriticalPath => "critical_path",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EnabledMetrics
// ---------------------------------------------------------------------------

/// Set of Phase 2 metrics that will run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnabledMetrics(BTreeSet<MetricKind>);

impl EnabledMetrics {
    #[must_use]
    pub fn all() -> Self {
        Self(MetricKind::ALL.into_iter().collect())
    }

    #[must_use]
    pub const fn none() -> Self {
        Self(BTreeSet::new())
    }

    #[must_use]
    pub fn is_enabled(&self, kind: MetricKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn set(&mut self, kind: MetricKind, enabled: bool) {
        if enabled {
            self.0.insert(kind);
        } else {
            self.0.remove(&kind);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = MetricKind> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for EnabledMetrics {
    fn default() -> Self {
        Self::all()
    }
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Pivot count for approximate betweenness as a function of node count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleSizePolicy {
    /// Below this many nodes every node is a pivot.
    pub full_below: usize,
    /// Fraction of nodes sampled above `full_below`.
    pub fraction: f64,
    pub floor: usize,
    pub ceiling: usize,
}

impl Default for SampleSizePolicy {
    fn default() -> Self {
        Self {
            full_below: 100,
            fraction: 0.2,
            floor: 50,
            ceiling: 200,
        }
    }
}

impl SampleSizePolicy {
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample_size(&self, node_count: usize) -> usize {
        if node_count < self.full_below {
            return node_count;
        }
        let scaled = (node_count as f64 * self.fraction).ceil() as usize;
        scaled.clamp(self.floor, self.ceiling).min(node_count)
    }
}

// ---------------------------------------------------------------------------
// Budgets
// ---------------------------------------------------------------------------

/// Per-metric time budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricBudgets {
    pub default: Duration,
    pub overrides: BTreeMap<MetricKind, Duration>,
}

impl MetricBudgets {
    #[must_use]
    pub const fn uniform(default: Duration) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn for_metric(&self, kind: MetricKind) -> Duration {
        self.overrides.get(&kind).copied().unwrap_or(self.default)
    }

    pub fn set(&mut self, kind: MetricKind, budget: Duration) {
        self.overrides.insert(kind, budget);
    }

    /// The largest budget any metric has.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.overrides
            .values()
            .copied()
            .fold(self.default, Duration::max)
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Everything that parameterizes one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub metrics: EnabledMetrics,
    /// Reasons recorded for metrics switched off by a preset or override.
    pub skip_reasons: BTreeMap<MetricKind, String>,
    /// Exact betweenness at or below this node count.
    pub exact_threshold: usize,
    /// `Exact` always runs every source; `Approximate` samples pivots on
    /// graphs above `exact_threshold`.
    pub betweenness_mode: BetweennessMode,
    /// Fixed pivot count; `None` derives it from `sample_policy`.
    pub sample_size: Option<usize>,
    pub sample_policy: SampleSizePolicy,
    pub seed: u64,
    pub budgets: MetricBudgets,
    /// Deadline for the whole Phase 2, measured from its start.
    pub global_timeout: Duration,
    /// Worker pool width.
    pub concurrency: usize,
    /// Nodes per unit of parallelism when sizing the pool.
    pub batch_size: usize,
    pub max_cycles: usize,
    pub pagerank: PageRankConfig,
    /// Limits for eigenvector centrality and HITS.
    pub power: IterationLimits,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::for_size_with_parallelism(0, 0, 1)
    }
}

impl AnalysisConfig {
    /// Select a config for a graph of this size using the machine's
    /// available parallelism.
    #[must_use]
    pub fn for_size(node_count: usize, edge_count: usize) -> Self {
        let parallelism = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self::for_size_with_parallelism(node_count, edge_count, parallelism)
    }

    /// Pure form of [`for_size`](Self::for_size).
    #[must_use]
    pub fn for_size_with_parallelism(
        node_count: usize,
        edge_count: usize,
        parallelism: usize,
    ) -> Self {
        let betweenness_mode = if node_count <= DEFAULT_EXACT_THRESHOLD {
            BetweennessMode::Exact
        } else {
            BetweennessMode::Approximate
        };

        let base = base_budget(node_count);
        let mut budgets = MetricBudgets::uniform(base);
        budgets.set(MetricKind::Betweenness, (base * 2).min(MAX_BUDGET * 2));
        let global_timeout = (budgets.max() * 4).min(MAX_GLOBAL_TIMEOUT);

        let max_cycles = match node_count {
            n if n < SMALL_GRAPH_NODES => 1000,
            n if n <= DEFAULT_EXACT_THRESHOLD => 100,
            n if n < XL_GRAPH_NODES => 50,
            _ => 10,
        };

        let mut config = Self {
            metrics: EnabledMetrics::all(),
            skip_reasons: BTreeMap::new(),
            exact_threshold: DEFAULT_EXACT_THRESHOLD,
            betweenness_mode,
            sample_size: None,
            sample_policy: SampleSizePolicy::default(),
            seed: DEFAULT_SEED,
            budgets,
            global_timeout,
            concurrency: pool_width(node_count, DEFAULT_BATCH_SIZE, parallelism),
            batch_size: DEFAULT_BATCH_SIZE,
            max_cycles,
            pagerank: PageRankConfig::default(),
            power: IterationLimits::default(),
        };

        let graph_density = density(node_count, edge_count);
        if node_count >= XL_GRAPH_NODES {
            config.disable(
                MetricKind::Cycles,
                format!("graph too large ({XL_GRAPH_NODES}+ nodes)"),
            );
            if graph_density >= DENSE_XL {
                config.disable(
                    MetricKind::Hits,
                    format!("graph too large and dense (density ≥ {DENSE_XL})"),
                );
            }
        } else if node_count > DEFAULT_EXACT_THRESHOLD && graph_density >= DENSE_LARGE {
            config.disable(
                MetricKind::Betweenness,
                format!("graph too dense for sampling (density ≥ {DENSE_LARGE})"),
            );
        }
        config
    }

    /// Every metric, exact betweenness, generous budgets.
    #[must_use]
    pub fn full() -> Self {
        let parallelism = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self {
            betweenness_mode: BetweennessMode::Exact,
            budgets: MetricBudgets::uniform(Duration::from_secs(30)),
            global_timeout: Duration::from_secs(120),
            concurrency: parallelism,
            max_cycles: 1000,
            ..Self::for_size_with_parallelism(0, 0, parallelism)
        }
    }

    /// PageRank plus sampled betweenness (50 pivots); everything else off.
    #[must_use]
    pub fn triage() -> Self {
        let mut config = Self {
            betweenness_mode: BetweennessMode::Approximate,
            sample_size: Some(50),
            ..Self::full()
        };
        for kind in MetricKind::ALL {
            if !matches!(kind, MetricKind::PageRank | MetricKind::Betweenness) {
                config.disable(kind, "disabled by triage preset");
            }
        }
        config
    }

    /// Phase 1 only.
    #[must_use]
    pub fn none() -> Self {
        let mut config = Self::default();
        for kind in MetricKind::ALL {
            config.disable(kind, "phase 2 disabled");
        }
        config
    }

    /// Switch a metric off and record why.
    pub fn disable(&mut self, kind: MetricKind, reason: impl Into<String>) {
        self.metrics.set(kind, false);
        self.skip_reasons.insert(kind, reason.into());
    }

    pub fn enable(&mut self, kind: MetricKind) {
        self.metrics.set(kind, true);
        self.skip_reasons.remove(&kind);
    }

    #[must_use]
    pub fn is_enabled(&self, kind: MetricKind) -> bool {
        self.metrics.is_enabled(kind)
    }

    #[must_use]
    pub fn all_phase2_disabled(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Disabled metrics with the reason each was switched off.
    #[must_use]
    pub fn skipped_metrics(&self) -> Vec<(MetricKind, String)> {
        MetricKind::ALL
            .into_iter()
            .filter(|&kind| !self.is_enabled(kind))
            .map(|kind| {
                let reason = self
                    .skip_reasons
                    .get(&kind)
                    .cloned()
                    .unwrap_or_else(|| "disabled by config".to_string());
                (kind, reason)
            })
            .collect()
    }

    /// Brandes variant for a graph of `node_count` nodes. Graphs at or below
    /// `exact_threshold` always run exact, so sampling never changes the
    /// ranking of a graph small enough to score in full.
    #[must_use]
    pub fn betweenness_plan(&self, node_count: usize) -> BetweennessPlan {
        if self.betweenness_mode == BetweennessMode::Exact || node_count <= self.exact_threshold
        {
            return BetweennessPlan {
                seed: self.seed,
                ..BetweennessPlan::exact()
            };
        }
        let sample_size = self
            .sample_size
            .unwrap_or_else(|| self.sample_policy.sample_size(node_count));
        BetweennessPlan::approximate(sample_size, self.seed)
    }

    /// Reject configurations no analysis can run with.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |msg: &str| Err(AnalysisError::InvalidConfig(msg.to_string()));

        if self.concurrency == 0 {
            return invalid("concurrency must be at least 1");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1");
        }
        if self.sample_policy.floor > self.sample_policy.ceiling {
            return invalid("sample_policy.floor exceeds sample_policy.ceiling");
        }
        if !(self.sample_policy.fraction > 0.0 && self.sample_policy.fraction <= 1.0) {
            return invalid("sample_policy.fraction must be in (0, 1]");
        }
        if self.sample_size == Some(0) {
            return invalid("sample_size must be at least 1");
        }
        if !(self.pagerank.damping > 0.0 && self.pagerank.damping < 1.0) {
            return invalid("pagerank.damping must be in (0, 1)");
        }
        if !(self.pagerank.tolerance.is_finite() && self.pagerank.tolerance > 0.0) {
            return invalid("pagerank.tolerance must be finite and positive");
        }
        if !(self.power.tolerance.is_finite() && self.power.tolerance > 0.0) {
            return invalid("power.tolerance must be finite and positive");
        }
        Ok(())
    }

    /// Apply the skip and timeout tunables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidOverride`] if the timeout is not a
    /// positive whole number of seconds.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup(SKIP_PHASE2_VAR).is_some_and(|value| is_truthy(&value)) {
            for kind in MetricKind::EXPENSIVE {
                self.disable(kind, format!("skipped by {SKIP_PHASE2_VAR}"));
            }
        }

        if let Some(value) = lookup(PHASE2_TIMEOUT_VAR) {
            let secs = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|&secs| secs > 0)
                .ok_or_else(|| AnalysisError::InvalidOverride {
                    name: PHASE2_TIMEOUT_VAR.to_string(),
                    value: value.clone(),
                })?;
            let budget = Duration::from_secs(secs);
            self.budgets = MetricBudgets::uniform(budget);
            self.global_timeout = self.global_timeout.max(budget);
        }
        Ok(())
    }

    /// BLAKE3 hash of the serialized config, for cache keys.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        format!("blake3:{}", blake3::hash(&bytes))
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn base_budget(node_count: usize) -> Duration {
    let ratio = node_count as f64 / 500.0;
    let millis = (30.0 * ratio * ratio).ceil() as u64;
    Duration::from_millis(millis).clamp(MIN_BUDGET, MAX_BUDGET)
}

/// `min(parallelism, ceil(n / batch))`, at least 1.
fn pool_width(node_count: usize, batch_size: usize, parallelism: usize) -> usize {
    node_count
        .div_ceil(batch_size.max(1))
        .min(parallelism)
        .max(1)
}

/// `1`, `true`, `yes`, `on` (case-insensitive).
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("1")
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("on")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn exact_at_or_below_threshold() {
        assert_eq!(
            AnalysisConfig::for_size_with_parallelism(500, 900, 8).betweenness_mode,
            BetweennessMode::Exact
        );
        assert_eq!(
            AnalysisConfig::for_size_with_parallelism(501, 900, 8).betweenness_mode,
            BetweennessMode::Approximate
        );
    }

    #[test]
    fn sample_size_is_bounded() {
        let policy = SampleSizePolicy::default();
        assert_eq!(policy.sample_size(10), 10);
        assert_eq!(policy.sample_size(99), 99);
        assert_eq!(policy.sample_size(100), 50);
        assert_eq!(policy.sample_size(400), 80);
        assert_eq!(policy.sample_size(5_000), 200);
    }

    #[test]
    fn budgets_scale_with_size() {
        let small = AnalysisConfig::for_size_with_parallelism(500, 0, 4);
        let large = AnalysisConfig::for_size_with_parallelism(5_000, 0, 4);
        assert_eq!(small.budgets.default, Duration::from_millis(250));
        assert_eq!(large.budgets.default, Duration::from_secs(3));
        assert_eq!(
            large.budgets.for_metric(MetricKind::Betweenness),
            Duration::from_secs(6)
        );
        assert!(large.global_timeout <= Duration::from_secs(30));
    }

    #[test]
    fn concurrency_follows_batches_and_parallelism() {
        assert_eq!(AnalysisConfig::for_size_with_parallelism(0, 0, 8).concurrency, 1);
        assert_eq!(AnalysisConfig::for_size_with_parallelism(250, 0, 8).concurrency, 3);
        assert_eq!(AnalysisConfig::for_size_with_parallelism(10_000, 0, 8).concurrency, 8);
    }

    #[test]
    fn selector_is_pure() {
        assert_eq!(
            AnalysisConfig::for_size_with_parallelism(1234, 5678, 6),
            AnalysisConfig::for_size_with_parallelism(1234, 5678, 6)
        );
    }

    #[test]
    fn triage_preset_runs_two_metrics() {
        let config = AnalysisConfig::triage();
        let enabled: Vec<MetricKind> = config.metrics.iter().collect();
        assert_eq!(enabled, vec![MetricKind::PageRank, MetricKind::Betweenness]);
        assert_eq!(config.sample_size, Some(50));
        assert_eq!(config.skipped_metrics().len(), 6);
    }

    #[test]
    fn none_preset_disables_phase2() {
        let config = AnalysisConfig::none();
        assert!(config.all_phase2_disabled());
        assert!(config
            .skipped_metrics()
            .iter()
            .all(|(_, reason)| reason == "phase 2 disabled"));
    }

    #[test]
    fn skip_override_keeps_structural_metrics() {
        let mut config = AnalysisConfig::default();
        config
            .apply_overrides(lookup(&[(SKIP_PHASE2_VAR, "yes")]))
            .unwrap();
        assert!(config.is_enabled(MetricKind::KCore));
        assert!(config.is_enabled(MetricKind::Articulation));
        assert!(!config.is_enabled(MetricKind::PageRank));
        assert_eq!(
            config.skip_reasons[&MetricKind::Betweenness],
            "skipped by DEPGRAPH_SKIP_PHASE2"
        );
    }

    #[test]
    fn timeout_override_sets_every_metric_budget() {
        let mut config = AnalysisConfig::for_size_with_parallelism(1_000, 3_000, 4);
        config
            .apply_overrides(lookup(&[(PHASE2_TIMEOUT_VAR, " 60 ")]))
            .unwrap();
        for kind in MetricKind::ALL {
            assert_eq!(config.budgets.for_metric(kind), Duration::from_secs(60), "{kind}");
        }
        assert_eq!(config.global_timeout, Duration::from_secs(60));
    }

    #[test]
    fn timeout_override_keeps_a_longer_global_deadline() {
        let mut config = AnalysisConfig::full();
        config
            .apply_overrides(lookup(&[(PHASE2_TIMEOUT_VAR, "7")]))
            .unwrap();
        assert_eq!(config.budgets.for_metric(MetricKind::Hits), Duration::from_secs(7));
        assert_eq!(config.global_timeout, Duration::from_secs(120));
    }

    #[test]
    fn zero_or_garbage_timeout_is_rejected() {
        for value in ["0", "soon", "-3", ""] {
            let mut config = AnalysisConfig::default();
            let before = config.clone();
            let err = config
                .apply_overrides(lookup(&[(PHASE2_TIMEOUT_VAR, value)]))
                .unwrap_err();
            assert_eq!(err.code().code(), "E1002");
            assert_eq!(config, before, "{value:?} changed the config");
        }
    }

    #[test]
    fn plan_is_exact_at_or_below_threshold() {
        let mut config = AnalysisConfig::full();
        config.betweenness_mode = BetweennessMode::Approximate;
        assert_eq!(config.betweenness_plan(300).mode, BetweennessMode::Exact);
        assert_eq!(config.betweenness_plan(500).mode, BetweennessMode::Exact);

        let plan = config.betweenness_plan(1_000);
        assert_eq!(plan.mode, BetweennessMode::Approximate);
        assert_eq!(plan.sample_size, 200);
        assert_eq!(plan.seed, config.seed);
    }

    #[test]
    fn plan_follows_threshold_and_policy() {
        let mut config = AnalysisConfig::full();
        config.betweenness_mode = BetweennessMode::Approximate;
        config.exact_threshold = 100;
        let plan = config.betweenness_plan(300);
        assert_eq!(plan.mode, BetweennessMode::Approximate);
        assert_eq!(plan.sample_size, 60);

        config.sample_policy.fraction = 0.5;
        assert_eq!(config.betweenness_plan(300).sample_size, 150);

        config.sample_size = Some(25);
        assert_eq!(config.betweenness_plan(300).sample_size, 25);
    }

    #[test]
    fn exact_mode_ignores_threshold() {
        let mut config = AnalysisConfig::full();
        config.exact_threshold = 0;
        assert_eq!(config.betweenness_plan(10_000).mode, BetweennessMode::Exact);
    }

    #[test]
    fn dense_large_graph_skips_betweenness() {
        // 1000 nodes at density 0.02
        let dense = AnalysisConfig::for_size_with_parallelism(1_000, 19_980, 4);
        assert!(!dense.is_enabled(MetricKind::Betweenness));
        assert!(dense.is_enabled(MetricKind::Cycles));
        assert!(dense.skip_reasons[&MetricKind::Betweenness].contains("dense"));
        assert_eq!(dense.max_cycles, 50);

        let sparse = AnalysisConfig::for_size_with_parallelism(1_000, 3_000, 4);
        assert!(sparse.is_enabled(MetricKind::Betweenness));
        assert!(sparse.skipped_metrics().is_empty());

        // Exact-sized graphs run betweenness however dense they are.
        let small_dense = AnalysisConfig::for_size_with_parallelism(50, 2_000, 4);
        assert!(small_dense.is_enabled(MetricKind::Betweenness));
        assert_eq!(small_dense.max_cycles, 1000);
    }

    #[test]
    fn xl_graph_skips_cycles_and_dense_hits() {
        let sparse = AnalysisConfig::for_size_with_parallelism(5_000, 10_000, 4);
        assert!(!sparse.is_enabled(MetricKind::Cycles));
        assert!(sparse.is_enabled(MetricKind::Hits));
        assert!(sparse.is_enabled(MetricKind::Betweenness));
        assert_eq!(sparse.max_cycles, 10);

        // density = 50_000 / (5000 * 4999) ≈ 0.002
        let dense = AnalysisConfig::for_size_with_parallelism(5_000, 50_000, 4);
        let skipped: Vec<MetricKind> = dense.skipped_metrics().into_iter().map(|(k, _)| k).collect();
        assert_eq!(skipped, vec![MetricKind::Hits, MetricKind::Cycles]);
    }

    #[test]
    fn cycle_cap_shrinks_with_size() {
        let cap = |n| AnalysisConfig::for_size_with_parallelism(n, 0, 1).max_cycles;
        assert_eq!(cap(99), 1000);
        assert_eq!(cap(100), 100);
        assert_eq!(cap(500), 100);
        assert_eq!(cap(501), 50);
        assert_eq!(cap(2_000), 10);
    }

    #[test]
    fn falsy_skip_value_is_ignored() {
        let mut config = AnalysisConfig::default();
        config
            .apply_overrides(lookup(&[(SKIP_PHASE2_VAR, "0")]))
            .unwrap();
        assert!(!config.all_phase2_disabled());
        assert!(config.skipped_metrics().is_empty());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(AnalysisConfig::default().validate().is_ok());

        let mut config = AnalysisConfig::default();
        config.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.pagerank.damping = 1.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.power.tolerance = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = AnalysisConfig::for_size_with_parallelism(100, 10, 2);
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.seed = 2;
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert!(a.fingerprint().starts_with("blake3:"));
    }

    #[test]
    fn truthy_parser_is_case_insensitive() {
        assert!(is_truthy("TrUe"));
        assert!(is_truthy("1"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
    }
}
