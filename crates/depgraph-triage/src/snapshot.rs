//! The immutable result of one analysis.
//!
//! A [`Snapshot`] is keyed by issue ID throughout (`BTreeMap`, so iteration
//! and serialization order are deterministic). Each Phase 2 metric has a
//! [`MetricValue`] carrying its own [`MetricStatus`]; the per-metric
//! [`MetricOutcome`] adds why a metric degraded.
//!
//! Timings live apart from everything else in [`Snapshot::timings`]: two
//! analyses of the same input produce snapshots that are equal once timings
//! are set aside ([`Snapshot::same_results`]).

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use depgraph_core::ErrorCode;
use serde::{Deserialize, Serialize};

use crate::config::MetricKind;
use crate::graph::build::GraphWarning;
use crate::graph::stats::GraphStats;

/// Terminal state of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    /// Exact and complete.
    Computed,
    /// Complete but approximate: sampled, or capped before converging.
    Approximated,
    /// Stopped at its deadline; values are partial or absent.
    TimedOut,
    /// Never ran: disabled, or rejected by validation.
    #[default]
    Skipped,
}

impl MetricStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Computed => "computed",
            Self::Approximated => "approximated",
            Self::TimedOut => "timed_out",
            Self::Skipped => "skipped",
        }
    }

    /// `Computed` and `Approximated` values cover every node.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Computed | Self::Approximated)
    }
}

/// Per-node values of one metric plus its status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue<T> {
    pub status: MetricStatus,
    pub values: BTreeMap<String, T>,
}

impl<T> Default for MetricValue<T> {
    fn default() -> Self {
        Self {
            status: MetricStatus::Skipped,
            values: BTreeMap::new(),
        }
    }
}

impl<T> MetricValue<T> {
    #[must_use]
    pub const fn new(status: MetricStatus, values: BTreeMap<String, T>) -> Self {
        Self { status, values }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.values.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl MetricValue<f64> {
    /// IDs ordered by descending value; ties by ascending ID.
    fn ordered(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> = self
            .values
            .iter()
            .map(|(id, &v)| (id.as_str(), v))
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// 1-based rank per node, highest value first.
    #[must_use]
    pub fn ranks(&self) -> BTreeMap<String, usize> {
        self.ordered()
            .into_iter()
            .enumerate()
            .map(|(i, (id, _))| (id.to_string(), i + 1))
            .collect()
    }

    /// The `k` highest-valued nodes.
    #[must_use]
    pub fn top(&self, k: usize) -> Vec<(String, f64)> {
        self.ordered()
            .into_iter()
            .take(k)
            .map(|(id, v)| (id.to_string(), v))
            .collect()
    }
}

/// How a single metric ended.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricOutcome {
    pub status: MetricStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    /// Power-method iterations run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    /// Pivots used by approximate betweenness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<usize>,
}

impl MetricOutcome {
    #[must_use]
    pub const fn with_status(status: MetricStatus) -> Self {
        Self {
            status,
            reason: None,
            code: None,
            iterations: None,
            sample_size: None,
        }
    }

    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::with_status(MetricStatus::Skipped)
        }
    }
}

/// One dependency cycle by issue ID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CycleInfo {
    /// Members, ascending.
    pub members: Vec<String>,
    /// Closed walk over existing blocking edges; first equals last.
    pub path: Vec<String>,
}

/// Everything one analysis produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// BLAKE3 content hash of the analyzed graph.
    pub graph_hash: String,
    /// BLAKE3 fingerprint of the config used.
    pub config_fingerprint: String,
    pub stats: GraphStats,
    pub warnings: Vec<GraphWarning>,

    // --- Phase 1 ---
    pub in_degree: BTreeMap<String, usize>,
    pub out_degree: BTreeMap<String, usize>,
    /// Kahn order; partial when `has_cycles`.
    pub topological_order: Vec<String>,
    pub has_cycles: bool,

    // --- Phase 2 ---
    pub pagerank: MetricValue<f64>,
    pub betweenness: MetricValue<f64>,
    pub eigenvector: MetricValue<f64>,
    pub hubs: MetricValue<f64>,
    pub authorities: MetricValue<f64>,
    pub core_number: MetricValue<usize>,
    pub articulation_points: BTreeSet<String>,
    /// Items on the longest chain ending at each item.
    pub critical_depth: MetricValue<usize>,
    pub slack: MetricValue<usize>,
    /// One longest blocking chain, blockers first.
    pub critical_path: Vec<String>,
    pub longest_path: usize,
    pub cycles: Vec<CycleInfo>,

    pub outcomes: BTreeMap<MetricKind, MetricOutcome>,
    pub timings: BTreeMap<MetricKind, Duration>,
}

impl Snapshot {
    /// Terminal status of `kind`; `Skipped` if it has no outcome.
    #[must_use]
    pub fn status(&self, kind: MetricKind) -> MetricStatus {
        self.outcomes
            .get(&kind)
            .map_or(MetricStatus::Skipped, |outcome| outcome.status)
    }

    #[must_use]
    pub fn outcome(&self, kind: MetricKind) -> Option<&MetricOutcome> {
        self.outcomes.get(&kind)
    }

    /// Whether `other` holds the same results, ignoring timings.
    #[must_use]
    pub fn same_results(&self, other: &Self) -> bool {
        let strip = |s: &Self| Self {
            timings: BTreeMap::new(),
            ..s.clone()
        };
        strip(self) == strip(other)
    }

    #[must_use]
    pub fn in_degree_ranks(&self) -> BTreeMap<String, usize> {
        degree_ranks(&self.in_degree)
    }

    #[must_use]
    pub fn out_degree_ranks(&self) -> BTreeMap<String, usize> {
        degree_ranks(&self.out_degree)
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures (non-string map keys are never
    /// produced, so this only fails on allocator exhaustion).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn degree_ranks(degrees: &BTreeMap<String, usize>) -> BTreeMap<String, usize> {
    let mut entries: Vec<(&String, usize)> = degrees.iter().map(|(id, &d)| (id, d)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .enumerate()
        .map(|(i, (id, _))| (id.clone(), i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(pairs: &[(&str, f64)]) -> MetricValue<f64> {
        MetricValue::new(
            MetricStatus::Computed,
            pairs.iter().map(|(id, v)| ((*id).to_string(), *v)).collect(),
        )
    }

    #[test]
    fn ranks_break_ties_by_id() {
        let ranks = value(&[("c", 0.5), ("a", 0.2), ("b", 0.5)]).ranks();
        assert_eq!(ranks["b"], 1);
        assert_eq!(ranks["c"], 2);
        assert_eq!(ranks["a"], 3);
    }

    #[test]
    fn top_returns_highest_first() {
        let top = value(&[("a", 1.0), ("b", 3.0), ("c", 2.0)]).top(2);
        let ids: Vec<&str> = top.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn default_metric_value_is_skipped_and_empty() {
        let v: MetricValue<f64> = MetricValue::default();
        assert_eq!(v.status, MetricStatus::Skipped);
        assert!(v.is_empty());
    }

    #[test]
    fn status_strings_match_serde() {
        for status in [
            MetricStatus::Computed,
            MetricStatus::Approximated,
            MetricStatus::TimedOut,
            MetricStatus::Skipped,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn outcome_omits_empty_fields() {
        let json = serde_json::to_string(&MetricOutcome::with_status(MetricStatus::Computed))
            .unwrap();
        assert_eq!(json, r#"{"status":"computed"}"#);
    }

    #[test]
    fn degree_ranks_order_by_degree_then_id() {
        let degrees: BTreeMap<String, usize> = [("a", 1), ("b", 3), ("c", 1)]
            .into_iter()
            .map(|(id, d)| (id.to_string(), d))
            .collect();
        let ranks = degree_ranks(&degrees);
        assert_eq!(ranks["b"], 1);
        assert_eq!(ranks["a"], 2);
        assert_eq!(ranks["c"], 3);
    }
}
