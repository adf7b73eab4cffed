//! Library-level error type.

use crate::config::ConfigError;

/// Errors returned by a simulation run.
///
/// Degenerate statistics (no observations, targets never reached, empty
/// capacity pools) are not errors; they fall back to neutral values.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The scenario failed validation; no trial was run.
    #[error("invalid configuration ({} problem(s)): {}", .0.len(), join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),

    /// The run was cancelled between trials.
    #[error("run cancelled after {completed} completed trial(s)")]
    Cancelled { completed: usize },

    /// A trial panicked; partial results are discarded.
    #[error("simulation fault: {message}")]
    Fault { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export error: {0}")]
    Export(String),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<csv::Error> for SimError {
    fn from(e: csv::Error) -> Self {
        SimError::Export(e.to_string())
    }
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::Export(e.to_string())
    }
}
