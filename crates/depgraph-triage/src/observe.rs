//! Explicit observability context.
//!
//! The caller creates one [`Observability`] and passes it by reference into
//! [`Analyzer::analyze_observed`](crate::analyzer::Analyzer::analyze_observed).
//! Phase 2 workers record into it from any thread: timing samples behind a
//! `parking_lot::Mutex`, counters as relaxed atomics. There is no
//! process-global registry, so concurrent analyses never share numbers.
//!
//! Sample collection is opt-in (`DEPGRAPH_TIMING=1` through
//! [`Observability::from_lookup`]); counters are always live. Samples
//! accumulate across every analysis the context is passed to, up to the
//! newest [`MAX_SAMPLES`], until [`Observability::clear`].

use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::json;

use crate::config::is_truthy;

pub const TIMING_VAR: &str = "DEPGRAPH_TIMING";

/// Samples kept per context; the oldest is dropped beyond this.
pub const MAX_SAMPLES: usize = 4096;

/// Monotonic work counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Single-source Brandes runs.
    BfsRuns,
    /// Power-method steps across PageRank, eigenvector and HITS.
    PowerIterations,
    /// Sources scheduled for betweenness.
    Pivots,
    /// Edges dropped while building the graph.
    DroppedEdges,
    /// Metrics that ended `TimedOut`.
    TimedOutMetrics,
}

impl Counter {
    pub const ALL: [Self; 5] = [
        Self::BfsRuns,
        Self::PowerIterations,
        Self::Pivots,
        Self::DroppedEdges,
        Self::TimedOutMetrics,
    ];

    const fn slot(self) -> usize {
        match self {
            Self::BfsRuns => 0,
            Self::PowerIterations => 1,
            Self::Pivots => 2,
            Self::DroppedEdges => 3,
            Self::TimedOutMetrics => 4,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BfsRuns => "bfs_runs",
            Self::PowerIterations => "power_iterations",
            Self::Pivots => "pivots",
            Self::DroppedEdges => "dropped_edges",
            Self::TimedOutMetrics => "timed_out_metrics",
        }
    }
}

#[derive(Debug, Clone)]
struct Sample {
    name: String,
    elapsed: Duration,
}

/// Timings and counters for the analyses it is passed to.
#[derive(Debug, Default)]
pub struct Observability {
    enabled: bool,
    samples: Mutex<VecDeque<Sample>>,
    counters: [AtomicU64; 5],
}

impl Observability {
    /// A context that collects timing samples.
    ///
    /// Reuse one context across analyses to aggregate them; the sample
    /// buffer then holds the newest [`MAX_SAMPLES`] timings. Call
    /// [`clear`](Self::clear) between runs that should be reported apart.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// A context that only keeps counters.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Enable sample collection when `DEPGRAPH_TIMING` is truthy.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            enabled: lookup(TIMING_VAR).is_some_and(|value| is_truthy(&value)),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run `f`, recording its duration under `name` when enabled.
    pub fn timed<R>(&self, name: &str, f: impl FnOnce() -> R) -> R {
        if !self.enabled {
            return f();
        }
        let started = Instant::now();
        let result = f();
        self.record(name, started.elapsed());
        result
    }

    pub fn record(&self, name: &str, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        let mut samples = self.samples.lock();
        if samples.len() >= MAX_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(Sample {
            name: name.to_string(),
            elapsed,
        });
    }

    pub fn add(&self, counter: Counter, amount: u64) {
        self.counters[counter.slot()].fetch_add(amount, Ordering::Relaxed);
    }

    #[must_use]
    pub fn counter(&self, counter: Counter) -> u64 {
        self.counters[counter.slot()].load(Ordering::Relaxed)
    }

    /// Aggregate the samples recorded so far. Samples are kept, so later
    /// reports include earlier analyses.
    #[must_use]
    pub fn report(&self) -> TimingReport {
        let mut grouped: BTreeMap<String, Vec<Duration>> = BTreeMap::new();
        for sample in self.samples.lock().iter() {
            grouped
                .entry(sample.name.clone())
                .or_default()
                .push(sample.elapsed);
        }

        let operations = grouped
            .into_iter()
            .map(|(name, mut values)| {
                values.sort_unstable();
                OpTiming {
                    name,
                    p50: percentile(&values, 50),
                    p95: percentile(&values, 95),
                    p99: percentile(&values, 99),
                    count: values.len(),
                }
            })
            .collect();

        let counters = Counter::ALL
            .into_iter()
            .map(|c| (c.as_str(), self.counter(c)))
            .collect();

        TimingReport {
            operations,
            counters,
        }
    }

    pub fn clear(&self) {
        self.samples.lock().clear();
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingReport {
    pub operations: Vec<OpTiming>,
    pub counters: BTreeMap<&'static str, u64>,
}

/// Latency percentiles for one named operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpTiming {
    pub name: String,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub count: usize,
}

impl TimingReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&OpTiming> {
        self.operations.iter().find(|op| op.name == name)
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let operations = self
            .operations
            .iter()
            .map(|op| {
                json!({
                    "name": op.name,
                    "count": op.count,
                    "p50_us": op.p50.as_micros(),
                    "p95_us": op.p95.as_micros(),
                    "p99_us": op.p99.as_micros(),
                })
            })
            .collect::<Vec<_>>();

        json!({ "operations": operations, "counters": self.counters })
    }

    #[must_use]
    pub fn display_table(&self) -> String {
        if self.operations.is_empty() {
            return "No timing samples recorded.".to_string();
        }

        let mut out = String::new();
        out.push_str("operation                    count      p50      p95      p99\n");
        out.push_str("--------------------------------------------------------------\n");
        for op in &self.operations {
            let _ = writeln!(
                out,
                "{:<28} {:>6} {:>8} {:>8} {:>8}",
                op.name,
                op.count,
                format_duration(op.p50),
                format_duration(op.p95),
                format_duration(op.p99)
            );
        }
        out
    }
}

fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = pct.min(100).saturating_mul(sorted.len()).saturating_add(99) / 100;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}

fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();
    if micros >= 1_000_000 {
        format!("{}.{:03}s", micros / 1_000_000, (micros % 1_000_000) / 1_000)
    } else if micros >= 1_000 {
        format!("{}.{:03}ms", micros / 1_000, micros % 1_000)
    } else {
        format!("{micros}µs")
    }
}
