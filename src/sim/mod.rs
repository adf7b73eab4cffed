/// Month clock for the trial loop.
pub mod clock;
pub mod engine;
/// Structured statistic keys.
pub mod metric;
pub mod report;
pub mod sampling;
pub mod types;
