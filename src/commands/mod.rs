//! CLI command implementations for herakles-proc-sampler.
//!
//! This module provides implementations for all CLI subcommands:
//! - `run`: Continuous sampling loop
//! - `once`: Single report with rates
//! - `pid`: Single-process sample
//! - `list`: Process list with run states
//! - `check`: System and configuration validation

use std::time::Duration;

pub mod check;
pub mod list;
pub mod once;
pub mod pid;
pub mod run;

// Re-export command functions
pub use check::command_check;
pub use list::command_list;
pub use once::command_once;
pub use pid::command_pid;
pub use run::command_run;

/// Gap between the baseline and the reported sample in one-shot commands.
pub const RATE_SAMPLE_DELAY: Duration = Duration::from_secs(1);
