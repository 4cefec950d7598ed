#![forbid(unsafe_code)]
//! depgraph-core: the issue and dependency data model shared by the
//! analytics engine, plus stable machine-readable error codes.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` errors; every warning and degradation
//!   carries an [`error::ErrorCode`].
//! - **Logging**: `tracing` is owned by the engine crate; this crate is
//!   plain data.

pub mod error;
pub mod model;

pub use error::ErrorCode;
pub use model::{Dependency, DependencyKind, Issue, IssueType, ParseEnumError, Status};
