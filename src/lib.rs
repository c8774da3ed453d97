//! thinkchain - multi-phase LLM reasoning chains with quality-gated phases
//!
//! A query is first turned into a *framework*: the model proposes an ordered
//! list of thinking phases. Each phase then runs as its own model call whose
//! structured output is extracted from free-form text, repaired where the
//! model emitted malformed JSON, validated, and put through a quality gate.
//! Completed phases feed every later phase's prompt; the final phase produces
//! the deliverable and may receive one improvement pass.
//!
//! thinkchain can be used in two ways:
//! - **CLI**: `thinkchain run "your query"`
//! - **Library**: build an [`Engine`] over any [`LlmBackend`]
//!
//! # Quick Start (Library)
//!
//! ```no_run
//! use thinkchain::{Config, CliArgs, engine_from_config};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::discover(&CliArgs::default())?;
//! let (mut engine, client) = engine_from_config(&config)?;
//!
//! let report = engine.run("Write a haiku about borrow checking").await?;
//! if let Some(output) = report.final_output() {
//!     println!("{output}");
//! }
//! println!("{} tokens", client.usage.report().usage.total_tokens);
//! # Ok(())
//! # }
//! ```
//!
//! # Crates
//!
//! - `thinkchain-extraction`: delimited-block extraction and JSON repair
//! - `thinkchain-prompt-template`: framework, phase and improvement prompts
//! - `thinkchain-llm`: model client (OpenRouter backend, retry, budget, usage)
//! - `thinkchain-engine`: phases, quality gate and run loop
//! - `thinkchain-config`, `thinkchain-utils`: configuration, errors, logging

pub mod cli;

pub use thinkchain_config::{CliArgs, Config, ConfigBuilder, ConfigSource};
pub use thinkchain_engine::{
    Engine, EngineSettings, Framework, NextAction, Phase, PhaseOutcome, PhaseResult, PhaseStatus,
    QueryType, RunContext, RunReport,
};
pub use thinkchain_extraction::{Delimiters, extract_payload};
pub use thinkchain_llm::{LlmBackend, LlmInvocation, LlmResult, ModelClient, UsageReport};
pub use thinkchain_prompt_template::{HistoryTurn, compose_query_with_history};
pub use thinkchain_utils::{
    ChainError, ConfigError, ExitCode, ExtractionError, LlmError, SchemaError, UserFriendlyError,
};

/// Build an engine wired to the configured provider.
///
/// The returned [`ModelClient`] shares the backend with the engine; its
/// `usage` tracker accumulates token counts across the run.
///
/// # Errors
///
/// Returns `ChainError::Llm` when the provider is unsupported or its API key
/// is missing.
pub fn engine_from_config(config: &Config) -> Result<(Engine, ModelClient), ChainError> {
    let client = thinkchain_llm::from_config(config)?;
    let engine = Engine::new(client.backend.clone(), EngineSettings::from_config(config));
    Ok((engine, client))
}
