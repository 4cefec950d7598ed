//! Input records handed to the engine by the loading layer.

pub mod issue;

pub use issue::{Dependency, DependencyKind, Issue, IssueType, ParseEnumError, Status};
