use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// The four lifecycle states an issue can be in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Blocked,
    Closed,
}

impl Status {
    /// Wire/display name, identical to the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Closed => "closed",
        }
    }

    /// Closed issues no longer gate anything downstream.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Kind of work an issue represents.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Bug,
    Feature,
    #[default]
    Task,
    Epic,
    Chore,
}

impl IssueType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Task => "task",
            Self::Epic => "epic",
            Self::Chore => "chore",
        }
    }
}

/// The relationship a dependency edge expresses.
///
/// Only [`DependencyKind::Blocks`] gates execution order; hierarchy edges
/// are carried along for callers but never feed centrality or cycle
/// detection.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    #[default]
    Blocks,
    ParentChild,
}

impl DependencyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::ParentChild => "parent-child",
        }
    }

    /// Whether this edge participates in ordering, centrality and cycles.
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Blocks)
    }
}

/// A work item as supplied by the loading layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
    pub id: String,
    pub status: Status,
    /// 0 is the most urgent; larger numbers sort later.
    pub priority: u8,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
}

impl Default for Issue {
    fn default() -> Self {
        Self {
            id: String::new(),
            status: Status::Open,
            priority: 2,
            issue_type: IssueType::Task,
        }
    }
}

impl Issue {
    /// An open task with default priority.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn with_type(mut self, issue_type: IssueType) -> Self {
        self.issue_type = issue_type;
        self
    }
}

/// A directed relationship between two issues.
///
/// For [`DependencyKind::Blocks`], `source` must be finished before
/// `target` can proceed, so the edge reads "source blocks target". For
/// [`DependencyKind::ParentChild`], `source` is the parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default)]
    pub kind: DependencyKind,
}

impl Dependency {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }

    /// `blocker` must be finished before `blocked` can start.
    #[must_use]
    pub fn blocks(blocker: impl Into<String>, blocked: impl Into<String>) -> Self {
        Self::new(blocker, blocked, DependencyKind::Blocks)
    }

    #[must_use]
    pub fn parent_child(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self::new(parent, child, DependencyKind::ParentChild)
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {expected}: '{got}'")]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in_progress" | "in-progress" | "doing" => Ok(Self::InProgress),
            "blocked" => Ok(Self::Blocked),
            "closed" | "done" => Ok(Self::Closed),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for IssueType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bug" => Ok(Self::Bug),
            "feature" => Ok(Self::Feature),
            "task" => Ok(Self::Task),
            "epic" => Ok(Self::Epic),
            "chore" => Ok(Self::Chore),
            _ => Err(ParseEnumError {
                expected: "issue type",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for DependencyKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocks" => Ok(Self::Blocks),
            "parent-child" | "parent_child" => Ok(Self::ParentChild),
            _ => Err(ParseEnumError {
                expected: "dependency type",
                got: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accepts_aliases() {
        assert_eq!("doing".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!(" Closed ".parse::<Status>(), Ok(Status::Closed));
        assert_eq!("done".parse::<Status>(), Ok(Status::Closed));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "archived".parse::<Status>().unwrap_err();
        assert_eq!(err.to_string(), "invalid status: 'archived'");
    }

    #[test]
    fn only_blocks_edges_gate_execution() {
        assert!(DependencyKind::Blocks.is_blocking());
        assert!(!DependencyKind::ParentChild.is_blocking());
    }

    #[test]
    fn wire_names_match_loader_format() {
        let dep = Dependency::parent_child("epic-1", "task-7");
        let json = serde_json::to_value(&dep).unwrap();
        assert_eq!(json["type"], "parent-child");

        let issue = Issue::new("bd-1").with_status(Status::InProgress);
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["type"], "task");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let issue: Issue = serde_json::from_str(r#"{"id":"bd-9"}"#).unwrap();
        assert_eq!(issue.status, Status::Open);
        assert_eq!(issue.priority, 2);

        let dep: Dependency =
            serde_json::from_str(r#"{"source":"a","target":"b"}"#).unwrap();
        assert_eq!(dep.kind, DependencyKind::Blocks);
    }

    #[test]
    fn only_closed_counts_as_closed() {
        assert!(Status::Closed.is_closed());
        assert!(!Status::Blocked.is_closed());
        assert!(!Status::InProgress.is_closed());
    }
}
