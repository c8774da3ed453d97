//! Shared building blocks for the thinkchain crates: error types, exit codes,
//! logging setup and message redaction.

pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod redaction;

pub use error::{
    ChainError, ConfigError, ErrorCategory, ExtractionError, LlmError, SchemaError,
    UserFriendlyError,
};
pub use exit_codes::ExitCode;
