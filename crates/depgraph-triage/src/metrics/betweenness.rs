//! Betweenness centrality: exact and pivot-sampled Brandes.
//!
//! # Overview
//!
//! Betweenness centrality measures how often a node lies on shortest paths
//! between other pairs of nodes. High-betweenness items are bridges or
//! bottlenecks: many chains of blocked work run through them.
//!
//! # Modes
//!
//! - **Exact**: every node is a source. O(n·m).
//! - **Approximate**: `k` pivots drawn with a seeded RNG
//!   (`StdRng::seed_from_u64(seed)`, sampled without replacement and then
//!   sorted), each pivot's contribution scaled by `n / k`. A sample of `n`
//!   or more falls back to exact.
//!
//! # Execution
//!
//! Sources are split into fixed batches of [`SOURCE_BATCH`]. Batches run in
//! parallel on the worker pool, each with one [`BrandesScratch`] per rayon
//! job, and produce a partial sum. Partials are then added **sequentially
//! in batch order**. Because the batch boundaries do not depend on the pool
//! width, the floating-point result is bit-identical for any width.
//!
//! The deadline is checked before every source. On expiry the partial sums
//! are scaled by `n / completed` and reported as timed out.
//!
//! Values are unnormalized; the directed upper bound is `(n-1)(n-2)`.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use crate::deadline::Deadline;
use crate::graph::index::Adjacency;
use crate::metrics::brandes::BrandesScratch;
use crate::pool::WorkerPool;
use crate::snapshot::MetricStatus;

/// Sources per parallel batch; fixed so reduction order never varies.
pub const SOURCE_BATCH: usize = 16;

/// Which Brandes variant to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetweennessMode {
    Exact,
    Approximate,
}

impl BetweennessMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Approximate => "approximate",
        }
    }
}

/// Mode and sampling parameters for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetweennessPlan {
    pub mode: BetweennessMode,
    /// Pivot count for approximate mode; clamped to `1..=n`.
    pub sample_size: usize,
    pub seed: u64,
}

impl BetweennessPlan {
    #[must_use]
    pub const fn exact() -> Self {
        Self {
            mode: BetweennessMode::Exact,
            sample_size: 0,
            seed: 1,
        }
    }

    #[must_use]
    pub const fn approximate(sample_size: usize, seed: u64) -> Self {
        Self {
            mode: BetweennessMode::Approximate,
            sample_size,
            seed,
        }
    }
}

/// Scores indexed by dense node index, plus how the run went.
#[derive(Debug, Clone, PartialEq)]
pub struct BetweennessResult {
    pub values: Vec<f64>,
    pub status: MetricStatus,
    /// The mode actually run (approximate with `k ≥ n` runs exact).
    pub mode: BetweennessMode,
    /// Pivots used, for approximate runs.
    pub sample_size: Option<usize>,
    /// Sources whose BFS completed.
    pub completed: usize,
    /// Sources that were scheduled.
    pub planned: usize,
}

/// Deterministic pivot choice: `k` distinct indices of `0..n`, ascending.
#[must_use]
pub fn select_pivots(node_count: usize, sample_size: usize, seed: u64) -> Vec<usize> {
    let k = sample_size.clamp(1, node_count.max(1)).min(node_count);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pivots = rand::seq::index::sample(&mut rng, node_count, k).into_vec();
    pivots.sort_unstable();
    pivots
}

/// Upper bound of unnormalized directed betweenness on `n` nodes.
#[must_use]
pub fn max_betweenness(node_count: usize) -> f64 {
    if node_count < 3 {
        return 0.0;
    }
    ((node_count - 1) * (node_count - 2)) as f64
}

#[must_use]
#[instrument(skip(adj, pool, deadline), fields(nodes = adj.node_count(), width = pool.width()))]
pub fn betweenness(
    adj: &Adjacency,
    plan: &BetweennessPlan,
    pool: &WorkerPool,
    deadline: &Deadline,
) -> BetweennessResult {
    let n = adj.node_count();

    let approximate =
        plan.mode == BetweennessMode::Approximate && plan.sample_size.max(1) < n;
    let sources: Vec<usize> = if approximate {
        select_pivots(n, plan.sample_size, plan.seed)
    } else {
        (0..n).collect()
    };
    let planned = sources.len();

    let partials: Vec<(Vec<f64>, usize)> = pool.install(|| {
        sources
            .par_chunks(SOURCE_BATCH)
            .map_init(
                || BrandesScratch::new(adj),
                |scratch, batch| {
                    let mut partial = vec![0.0; n];
                    let mut done = 0;
                    for &s in batch {
                        if deadline.expired() {
                            break;
                        }
                        scratch.accumulate(adj, s, &mut partial);
                        done += 1;
                    }
                    trace!(first = batch.first().copied(), done, "source batch finished");
                    (partial, done)
                },
            )
            .collect()
    });

    let mut values = vec![0.0; n];
    let mut completed = 0;
    for (partial, done) in partials {
        completed += done;
        for (total, p) in values.iter_mut().zip(partial) {
            *total += p;
        }
    }

    let timed_out = completed < planned;
    let scale = if timed_out && completed > 0 {
        n as f64 / completed as f64
    } else if approximate {
        n as f64 / planned as f64
    } else {
        1.0
    };
    if (scale - 1.0).abs() > f64::EPSILON {
        let bound = max_betweenness(n);
        for v in &mut values {
            *v = (*v * scale).min(bound);
        }
    }

    let status = match (timed_out, approximate) {
        (true, _) => MetricStatus::TimedOut,
        (false, true) => MetricStatus::Approximated,
        (false, false) => MetricStatus::Computed,
    };
    if timed_out {
        warn!(completed, planned, "betweenness stopped at deadline");
    } else {
        debug!(completed, approximate, "betweenness finished");
    }

    BetweennessResult {
        values,
        status,
        mode: if approximate {
            BetweennessMode::Approximate
        } else {
            BetweennessMode::Exact
        },
        sample_size: approximate.then_some(planned),
        completed,
        planned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pool(width: usize) -> WorkerPool {
        WorkerPool::new(width).unwrap()
    }

    /// 0..k fan into hub k, which fans out to k+1..2k.
    fn bottleneck(k: usize) -> Adjacency {
        let hub = k;
        let mut edges = Vec::new();
        for i in 0..k {
            edges.push((i, hub));
            edges.push((hub, hub + 1 + i));
        }
        Adjacency::from_edges(2 * k + 1, &edges)
    }

    #[test]
    fn pivots_are_deterministic_sorted_and_distinct() {
        let a = select_pivots(1000, 50, 7);
        let b = select_pivots(1000, 50, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert_ne!(a, select_pivots(1000, 50, 8));
    }

    #[test]
    fn pivot_count_is_clamped() {
        assert_eq!(select_pivots(10, 0, 1).len(), 1);
        assert_eq!(select_pivots(10, 99, 1).len(), 10);
        assert!(select_pivots(0, 5, 1).is_empty());
    }

    #[test]
    fn exact_bottleneck_counts_all_pairs() {
        let adj = bottleneck(4);
        let result = betweenness(&adj, &BetweennessPlan::exact(), &pool(2), &Deadline::never());
        assert_eq!(result.status, MetricStatus::Computed);
        // Every (in_i, out_j) pair passes through the hub.
        assert!((result.values[4] - 16.0).abs() < 1e-12);
        assert_eq!(result.completed, 9);
    }

    #[test]
    fn oversized_sample_falls_back_to_exact() {
        let adj = bottleneck(3);
        let result = betweenness(
            &adj,
            &BetweennessPlan::approximate(50, 1),
            &pool(2),
            &Deadline::never(),
        );
        assert_eq!(result.status, MetricStatus::Computed);
        assert_eq!(result.mode, BetweennessMode::Exact);
        assert_eq!(result.sample_size, None);
    }

    #[test]
    fn approximate_run_is_scaled_and_bounded() {
        let adj = bottleneck(40);
        let n = adj.node_count();
        let result = betweenness(
            &adj,
            &BetweennessPlan::approximate(20, 3),
            &pool(4),
            &Deadline::never(),
        );
        assert_eq!(result.status, MetricStatus::Approximated);
        assert_eq!(result.sample_size, Some(20));
        let bound = max_betweenness(n);
        assert!(result.values.iter().all(|v| (0.0..=bound).contains(v)));
    }

    #[test]
    fn identical_across_pool_widths() {
        let adj = bottleneck(30);
        let plan = BetweennessPlan::exact();
        let one = betweenness(&adj, &plan, &pool(1), &Deadline::never());
        let many = betweenness(&adj, &plan, &pool(8), &Deadline::never());
        assert_eq!(one.values, many.values);
    }

    #[test]
    fn expired_deadline_times_out_with_zero_sources() {
        let adj = bottleneck(10);
        let result = betweenness(
            &adj,
            &BetweennessPlan::exact(),
            &pool(2),
            &Deadline::after(Duration::ZERO),
        );
        assert_eq!(result.status, MetricStatus::TimedOut);
        assert_eq!(result.completed, 0);
        assert!(result.values.iter().all(|v| *v >= 0.0));
    }
}
