//! CLI argument definitions and parsing structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// thinkchain - multi-phase reasoning chains over an LLM
#[derive(Parser, Debug)]
#[command(name = "thinkchain")]
#[command(about = "Run quality-gated, multi-phase reasoning chains against an LLM")]
#[command(long_about = r#"
thinkchain asks a model to plan a query as an ordered list of thinking phases,
then executes each phase as its own model call. Every phase reports a quality
score; low scores are retried (bounded) and a weak final answer gets one
improvement attempt.

EXAMPLES:
  # Ask a question
  thinkchain run "Write a Rust function that merges two sorted vectors"

  # Read the query from stdin and emit JSON
  echo "Compare B-trees and LSM-trees" | thinkchain run - --json

  # Continue a conversation recorded as a JSON array of {role, content}
  thinkchain run "Now add tests" --history chat.json

  # Show the effective configuration and where each value came from
  thinkchain config

CONFIGURATION:
  Precedence: CLI flags > environment (THINKCHAIN_*, SITE_URL, APP_NAME) > config file > defaults
  The config file is discovered by searching upward from CWD for .thinkchain/config.toml
  (THINKCHAIN_HOME overrides the search). A .env file in CWD is loaded first.
  The API key is read from OPENROUTER_API_KEY unless [llm.openrouter] api_key_env says otherwise.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model to request for every call
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Attempts allowed per phase, the first one included
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Deadline for a single model call, in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a thinking chain for a query
    Run {
        /// The query, or `-` to read it from stdin
        query: String,

        /// JSON file with earlier conversation turns ([{"role": ..., "content": ...}])
        #[arg(long)]
        history: Option<PathBuf>,

        /// Emit the run report and usage as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration with the source of each value
    Config {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Build the clap command (used by tests and completions)
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
