//! Monte Carlo simulator of a vaccine development pipeline and the
//! manufacturing capacity that follows approval.

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
/// Manufacturing scheduling, allocation and production.
pub mod manufacturing;
/// Clinical development pipeline.
pub mod pipeline;
/// Orchestrator, report, statistic keys and shared types.
pub mod sim;
pub mod stats;
