//! Cooperative cancellation deadlines.
//!
//! Every Phase 2 task runs against the earlier of its own budget and the
//! global deadline of the analysis call. Long loops poll [`Deadline::expired`]
//! at safe points (after a BFS, after a power-iteration step, every few
//! hundred visited nodes) and return what they have.

use std::time::{Duration, Instant};

/// A point in time after which work should stop; `None` never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    #[must_use]
    pub const fn never() -> Self {
        Self { at: None }
    }

    #[must_use]
    pub const fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    /// A deadline `budget` from now. A zero budget is already expired.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(budget),
        }
    }

    /// The earlier of two deadlines.
    #[must_use]
    pub fn earliest(self, other: Self) -> Self {
        match (self.at, other.at) {
            (Some(a), Some(b)) => Self::at(a.min(b)),
            (Some(a), None) | (None, Some(a)) => Self::at(a),
            (None, None) => Self::never(),
        }
    }

    #[must_use]
    pub fn expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::never()
    }
}
