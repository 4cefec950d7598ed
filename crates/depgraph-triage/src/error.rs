//! Error types for the analytics engine.
//!
//! Two layers:
//!
//! - [`AnalysisError`] is the only error a caller can receive. It covers
//!   problems that prevent an analysis from being set up at all: an invalid
//!   configuration, an unparseable override, or strict graph construction
//!   rejecting an orphan dependency.
//! - [`MetricFailure`] describes why a single Phase 2 metric degraded. It is
//!   never returned; the analyzer renders it into the snapshot's per-metric
//!   outcome so every other metric stays usable.

use depgraph_core::ErrorCode;
use thiserror::Error;

/// Failure to set up an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("invalid analysis config: {0}")]
    InvalidConfig(String),

    #[error("invalid value '{value}' for {name}")]
    InvalidOverride { name: String, value: String },

    #[error("dependency {from} -> {to} references missing issue '{missing}'")]
    OrphanEdge {
        from: String,
        to: String,
        missing: String,
    },

    #[error("worker pool with {width} threads could not be started: {reason}")]
    WorkerPool { width: usize, reason: String },
}

impl AnalysisError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Self::InvalidOverride { .. } => ErrorCode::InvalidOverride,
            Self::OrphanEdge { .. } => ErrorCode::OrphanEdge,
            Self::WorkerPool { .. } => ErrorCode::WorkerPoolUnavailable,
        }
    }
}

/// Why a single metric did not produce a complete, trustworthy result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricFailure {
    #[error("deadline exceeded after {completed} of {planned} steps")]
    DeadlineExceeded { completed: usize, planned: usize },

    #[error("interrupted at deadline")]
    Interrupted,

    #[error("stopped after {found} cycles; more remain")]
    CycleBudgetExhausted { found: usize },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("computation panicked: {0}")]
    Panicked(String),
}

impl MetricFailure {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DeadlineExceeded { .. } | Self::Interrupted => ErrorCode::MetricTimedOut,
            Self::CycleBudgetExhausted { .. } => ErrorCode::CycleBudgetExhausted,
            Self::InvariantViolation(_) => ErrorCode::MetricInvariantViolation,
            Self::Panicked(_) => ErrorCode::MetricPanicked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orphan_message_names_the_missing_endpoint() {
        let err = AnalysisError::OrphanEdge {
            from: "bd-1".into(),
            to: "bd-404".into(),
            missing: "bd-404".into(),
        };
        assert_eq!(
            err.to_string(),
            "dependency bd-1 -> bd-404 references missing issue 'bd-404'"
        );
        assert_eq!(err.code(), ErrorCode::OrphanEdge);
    }

    #[test]
    fn failures_map_to_metric_codes() {
        let timeout = MetricFailure::DeadlineExceeded {
            completed: 3,
            planned: 10,
        };
        assert_eq!(timeout.code().code(), "E4001");
        assert_eq!(timeout.to_string(), "deadline exceeded after 3 of 10 steps");
        assert_eq!(
            MetricFailure::Panicked("boom".into()).code(),
            ErrorCode::MetricPanicked
        );
    }
}
