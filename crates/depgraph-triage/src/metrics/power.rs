//! Shared driver for the power-method metrics.
//!
//! PageRank, eigenvector centrality and HITS all repeat the same loop: apply
//! one update over dense float arrays, measure how far the vector moved,
//! stop when the change drops below a tolerance. [`iterate`] owns that loop
//! together with the iteration cap and the deadline, so each metric only
//! supplies its update step.

use serde::{Deserialize, Serialize};

use crate::deadline::Deadline;
use crate::snapshot::MetricStatus;

/// Convergence settings for a power-method metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationLimits {
    /// Stop once a step moves the vector by less than this.
    pub tolerance: f64,
    pub max_iter: usize,
}

impl Default for IterationLimits {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iter: 100,
        }
    }
}

/// How a power iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Converged { iterations: usize },
    /// Hit `max_iter` before converging.
    Capped { iterations: usize },
    /// The deadline expired first.
    Interrupted { iterations: usize },
}

impl Termination {
    #[must_use]
    pub const fn iterations(self) -> usize {
        match self {
            Self::Converged { iterations }
            | Self::Capped { iterations }
            | Self::Interrupted { iterations } => iterations,
        }
    }

    #[must_use]
    pub const fn status(self) -> MetricStatus {
        match self {
            Self::Converged { .. } => MetricStatus::Computed,
            Self::Capped { .. } => MetricStatus::Approximated,
            Self::Interrupted { .. } => MetricStatus::TimedOut,
        }
    }
}

/// Run `step` until it reports a change below tolerance, the cap is hit, or
/// the deadline expires. The deadline is checked after every step.
pub fn iterate(
    limits: &IterationLimits,
    deadline: &Deadline,
    mut step: impl FnMut() -> f64,
) -> Termination {
    for iteration in 1..=limits.max_iter {
        let change = step();
        if change < limits.tolerance {
            return Termination::Converged {
                iterations: iteration,
            };
        }
        if deadline.expired() {
            return Termination::Interrupted {
                iterations: iteration,
            };
        }
    }
    Termination::Capped {
        iterations: limits.max_iter,
    }
}

/// Scale `v` to unit L2 norm. A zero vector is left as is.
pub fn normalize_l2(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[must_use]
pub fn l1_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

#[must_use]
pub fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn converges_when_change_drops_below_tolerance() {
        let mut change = 1.0;
        let end = iterate(&IterationLimits::default(), &Deadline::never(), || {
            change /= 100.0;
            change
        });
        // 1e-2, 1e-4, 1e-6, 1e-8: the fourth step is the first below 1e-6.
        assert_eq!(end, Termination::Converged { iterations: 4 });
        assert_eq!(end.status(), MetricStatus::Computed);
    }

    #[test]
    fn cap_reports_approximated() {
        let limits = IterationLimits {
            tolerance: 1e-6,
            max_iter: 7,
        };
        let end = iterate(&limits, &Deadline::never(), || 1.0);
        assert_eq!(end, Termination::Capped { iterations: 7 });
        assert_eq!(end.status(), MetricStatus::Approximated);
    }

    #[test]
    fn expired_deadline_stops_after_one_step() {
        let mut steps = 0;
        let end = iterate(
            &IterationLimits::default(),
            &Deadline::after(Duration::ZERO),
            || {
                steps += 1;
                1.0
            },
        );
        assert_eq!(steps, 1);
        assert_eq!(end.status(), MetricStatus::TimedOut);
    }

    #[test]
    fn normalize_leaves_zero_vector_alone() {
        let mut zero = vec![0.0; 3];
        normalize_l2(&mut zero);
        assert_eq!(zero, vec![0.0; 3]);

        let mut v = vec![3.0, 4.0];
        normalize_l2(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-12);
        assert!((v[1] - 0.8).abs() < 1e-12);
    }
}
