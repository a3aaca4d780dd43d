//! vqsweep core - encode/measure sweep pipeline with BD aggregation.
//!
//! This crate contains all pipeline logic with zero UI dependencies:
//! source resolution, encode/metric command construction, external
//! process execution with an audit log, metric log parsing, sweep
//! orchestration, and BD-Rate / BD-Metric curve comparison. The CLI (or
//! any other front end) composes these pieces.

pub mod bd;
pub mod command;
pub mod config;
pub mod metrics;
pub mod models;
pub mod probe;
pub mod process;
pub mod report;
pub mod sources;
pub mod sweep;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
