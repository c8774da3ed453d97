//! Configuration management for thinkchain
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > file > defaults. TOML files carry `[defaults]`, `[llm]`
//! (with `[llm.openrouter]`) and `[engine]` sections.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use discovery::{CONFIG_DIR, CONFIG_FILE, load_dotenv};
pub use model::*;
