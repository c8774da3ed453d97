//! CLI command implementations.
//!
//! Handlers return the exit code to use on completion; errors bubble up as
//! `anyhow::Error` and are reported by `run.rs`.

mod chain;
mod config;
mod json_emit;

pub use chain::execute_run_command;
pub use config::execute_config_command;
