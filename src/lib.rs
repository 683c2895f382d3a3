//! webarena-fleet: run the WebArena benchmark across a fleet of GBOX workers.
//!
//! This library splits task ranges across workers, launches the benchmark
//! driver for each worker in its own tmux window, and reports on the logs and
//! results those drivers leave behind.

pub mod cli;
pub mod config;
pub mod error;
pub mod report;
pub mod scheduler;

// Re-export commonly used error types
pub use error::{ConfigError, DispatchError, ReportError, SplitError};
