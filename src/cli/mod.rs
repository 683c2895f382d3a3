//! Command-line interface for webarena-fleet.
//!
//! Provides the `run` dispatcher plus plan, environment and log-report
//! commands.

mod commands;

pub use commands::{parse_cli, run_with_cli, write_fleet_config, Cli, Commands, USAGE_EXIT_CODE};
