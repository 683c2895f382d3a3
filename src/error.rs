//! Error types for webarena-fleet operations.
//!
//! One error enum per subsystem:
//! - Range splitting
//! - Fleet configuration loading and validation
//! - Session dispatch through the terminal multiplexer
//! - Log and result-directory reporting

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while splitting a task range across workers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("Empty task range: end ({end}) must be greater than start ({start})")]
    EmptyRange { start: u64, end: u64 },

    #[error("No workers configured to receive tasks")]
    NoWorkers,
}

/// Errors that can occur while loading or validating fleet configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Errors that can occur while dispatching workers into multiplexer sessions.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Session '{0}' already exists (attach with `tmux attach -t {0}` or pass --replace)")]
    SessionExists(String),

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Multiplexer command `{command}` failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Errors that can occur while reading logs and result directories.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}
