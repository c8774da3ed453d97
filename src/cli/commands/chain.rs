//! `thinkchain run` implementation

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use thinkchain_llm::UsageReport;
use tracing::info;

use super::json_emit::emit_run_json;
use crate::{
    ChainError, Config, ConfigError, ExitCode, HistoryTurn, RunReport, compose_query_with_history,
    engine_from_config,
};

/// Run one thinking chain and print the outcome.
///
/// Returns `ExitCode::SUCCESS` when every phase completed and
/// `ExitCode::PHASE_FAILED` when the run stopped at a failed phase.
pub async fn execute_run_command(
    query_arg: &str,
    history_path: Option<&Path>,
    json: bool,
    config: &Config,
) -> Result<ExitCode> {
    let query = resolve_query(query_arg)?;
    let history = match history_path {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };
    let query = compose_query_with_history(&history, &query);

    let (mut engine, client) = engine_from_config(config)?;
    info!(history_turns = history.len(), "Starting thinking chain");

    let report = engine.run(&query).await?;
    let usage = client.usage.report();

    if json {
        println!("{}", emit_run_json(&report, &usage)?);
    } else {
        print_text(&report, &usage);
    }

    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::PHASE_FAILED
    })
}

/// `-` reads the query from stdin; blank queries are rejected
fn resolve_query(arg: &str) -> Result<String> {
    let query = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read query from stdin")?;
        buf
    } else {
        arg.to_string()
    };

    let query = query.trim();
    if query.is_empty() {
        return Err(ChainError::Config(ConfigError::MissingRequired("query".to_string())).into());
    }
    Ok(query.to_string())
}

fn load_history(path: &Path) -> Result<Vec<HistoryTurn>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    parse_history(&raw, path)
}

fn parse_history(raw: &str, path: &Path) -> Result<Vec<HistoryTurn>> {
    serde_json::from_str(raw).map_err(|e| {
        ChainError::Config(ConfigError::InvalidFile(format!(
            "history file {} must be a JSON array of {{\"role\", \"content\"}} objects: {e}",
            path.display()
        )))
        .into()
    })
}

fn print_text(report: &RunReport, usage: &UsageReport) {
    print!("{}", report.render_text());

    if let Some(output) = report.final_output() {
        println!("=== Final output ===");
        println!("{}", output.trim_end());
        println!();
    }

    println!(
        "Total tokens: {} (prompt {}, completion {}) over {} requests",
        usage.usage.total_tokens,
        usage.usage.prompt_tokens,
        usage.usage.completion_tokens,
        usage.requests_made
    );
    println!("Estimated cost: ${:.4}", usage.estimated_cost);
}
