use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Fatal at startup: the process cannot solve anything without a configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Unable to read solver configuration {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed solver configuration {location}: {source}")]
    Malformed {
        location: String,
        source: serde_json::Error,
    },

    #[error("Resource {name} not found on the search path ({searched})")]
    MissingResource { name: String, searched: String },

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidProperty {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("problem rejected: {0}")]
    Rejected(String),

    #[error("solver failed: {0}")]
    Failed(String),

    #[error("solver panicked")]
    Panicked,
}

/// Conditions the run controller records in its status instead of crashing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("session {generation} failed to start: {source}")]
    SessionStart { generation: u64, source: SolveError },

    #[error("session {generation} failed: {source}")]
    SessionFailed { generation: u64, source: SolveError },

    #[error("session {generation} did not acknowledge stop within {waited:?}")]
    StopTimeout { generation: u64, waited: Duration },

    #[error("execution gate saturated: {pending} submission(s) already waiting for the slot")]
    ExecutionGateSaturated { pending: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("run controller is no longer running")]
    ControllerClosed,
}
