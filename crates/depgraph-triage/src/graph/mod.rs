//! Dependency graph construction and graph-structural algorithms.
//!
//! - [`build`]: [`Graph`] and [`GraphBuilder`] with the dense index.
//! - [`index`]: sorted CSR adjacency and the undirected view.
//! - [`stats`]: summary statistics.
//! - [`cycles`]: bounded Tarjan cycle detection.
//! - [`structure`]: k-core and articulation points.
//! - [`critical_path`]: longest-chain depth and slack.

pub mod build;
pub mod critical_path;
pub mod cycles;
pub mod index;
pub mod stats;
pub mod structure;

pub use build::{Graph, GraphBuilder, GraphWarning};
pub use stats::GraphStats;
