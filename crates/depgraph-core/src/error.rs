use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable codes for input warnings and metric degradation.
///
/// Codes are grouped by hundreds-block: `E1xxx` configuration, `E2xxx`
/// graph input, `E4xxx` metric computation, `E5xxx` resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidConfig,
    InvalidOverride,
    OrphanEdge,
    SelfDependency,
    DuplicateIssue,
    DuplicateEdge,
    MetricTimedOut,
    CycleBudgetExhausted,
    MetricInvariantViolation,
    MetricPanicked,
    WorkerPoolUnavailable,
}

impl ErrorCode {
    pub const ALL: [Self; 11] = [
        Self::InvalidConfig,
        Self::InvalidOverride,
        Self::OrphanEdge,
        Self::SelfDependency,
        Self::DuplicateIssue,
        Self::DuplicateEdge,
        Self::MetricTimedOut,
        Self::CycleBudgetExhausted,
        Self::MetricInvariantViolation,
        Self::MetricPanicked,
        Self::WorkerPoolUnavailable,
    ];

    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidConfig => "E1001",
            Self::InvalidOverride => "E1002",
            Self::OrphanEdge => "E2001",
            Self::SelfDependency => "E2002",
            Self::DuplicateIssue => "E2003",
            Self::DuplicateEdge => "E2004",
            Self::MetricTimedOut => "E4001",
            Self::CycleBudgetExhausted => "E4002",
            Self::MetricInvariantViolation => "E4003",
            Self::MetricPanicked => "E4004",
            Self::WorkerPoolUnavailable => "E5001",
        }
    }

    /// Short human-facing summary for logs and snapshot reasons.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidConfig => "Invalid analysis configuration",
            Self::InvalidOverride => "Unparseable tuning override",
            Self::OrphanEdge => "Dependency references a missing issue",
            Self::SelfDependency => "Issue depends on itself",
            Self::DuplicateIssue => "Issue ID supplied more than once",
            Self::DuplicateEdge => "Dependency supplied more than once",
            Self::MetricTimedOut => "Metric exceeded its time budget",
            Self::CycleBudgetExhausted => "Cycle enumeration hit its count cap",
            Self::MetricInvariantViolation => "Metric produced an out-of-range value",
            Self::MetricPanicked => "Metric computation panicked",
            Self::WorkerPoolUnavailable => "Worker pool could not be started",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidConfig => {
                Some("Use a preset such as AnalysisConfig::for_size and adjust from there.")
            }
            Self::InvalidOverride => {
                Some("Timeouts are positive whole seconds; skip flags are 1/true/yes/on.")
            }
            Self::OrphanEdge => Some("Load the referenced issue or remove the stale dependency."),
            Self::SelfDependency => Some("Remove the dependency; an issue cannot block itself."),
            Self::DuplicateIssue => None,
            Self::DuplicateEdge => None,
            Self::MetricTimedOut => Some("Raise the metric budget or switch to sampled mode."),
            Self::CycleBudgetExhausted => {
                Some("Break the reported cycles first; more may exist beyond the cap.")
            }
            Self::MetricInvariantViolation | Self::MetricPanicked => {
                Some("Other metrics are unaffected. Report a bug with the graph hash.")
            }
            Self::WorkerPoolUnavailable => Some("Lower the concurrency width and retry."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ErrorCode::ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ErrorCode::ALL {
            let text = code.code();
            assert_eq!(text.len(), 5);
            assert!(text.starts_with('E'));
            assert!(text.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn codes_stay_in_documented_blocks() {
        for code in ErrorCode::ALL {
            let block = code.code().as_bytes()[1];
            assert!(matches!(block, b'1' | b'2' | b'4' | b'5'), "{code} outside blocks");
        }
    }

    #[test]
    fn display_is_the_code() {
        assert_eq!(ErrorCode::OrphanEdge.to_string(), "E2001");
    }
}
