//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers configuration, initializes logging,
//! creates the tokio runtime, dispatches the command and reports errors.

use clap::Parser;
use thinkchain_utils::logging::init_tracing;
use thinkchain_utils::redaction::redact_error_message;

use super::args::{Cli, Commands};
use super::commands;
use crate::{ChainError, CliArgs, Config, ConfigError, ExitCode};

/// Main CLI execution function.
///
/// Prints all output, errors included. Returns `Err(ExitCode)` for anything
/// other than full success; main.rs only maps it to the process exit status.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        model: cli.model.clone(),
        max_attempts: cli.max_attempts,
        request_timeout: cli.timeout,
        verbose: cli.verbose.then_some(true),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report_error(err)),
    };

    if let Err(e) = init_tracing(config.defaults.verbose.unwrap_or(false)) {
        eprintln!("warning: logging not initialized: {e}");
    }

    let result = match cli.command {
        Commands::Run {
            query,
            history,
            json,
        } => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("✗ Failed to create async runtime: {e}");
                    return Err(ExitCode::INTERNAL);
                }
            };
            rt.block_on(commands::execute_run_command(
                &query,
                history.as_deref(),
                json,
                &config,
            ))
        }
        Commands::Config { json } => commands::execute_config_command(&config, json),
    };

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(err) => Err(report_error(err)),
    }
}

/// Print an error for the user and pick the exit code.
///
/// Library errors get the structured `display_for_user()` report; anything
/// else is printed with its context chain. All text is redacted.
fn report_error(error: anyhow::Error) -> ExitCode {
    let chain = match error.downcast::<ChainError>() {
        Ok(chain) => chain,
        Err(error) => match error.downcast::<ConfigError>() {
            Ok(config_error) => ChainError::Config(config_error),
            Err(error) => {
                eprintln!(
                    "✗ Unexpected error: {}",
                    redact_error_message(&format!("{error:#}"))
                );
                eprintln!("\n  Run with --verbose for more detailed output");
                return ExitCode::INTERNAL;
            }
        },
    };

    eprintln!("{}", redact_error_message(&chain.display_for_user()));
    chain.to_exit_code()
}
