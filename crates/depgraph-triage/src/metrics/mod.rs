//! Node-level metrics over the dense index.
//!
//! [`basic`] holds the Phase 1 metrics. Everything else runs in Phase 2:
//! the power-method family ([`pagerank`], [`eigenvector`], [`hits`], all
//! driven by [`power`]) and Brandes betweenness ([`betweenness`] on top of
//! the single-source kernel in [`brandes`]).

pub mod basic;
pub mod betweenness;
pub mod brandes;
pub mod eigenvector;
pub mod hits;
pub mod pagerank;
pub mod power;
