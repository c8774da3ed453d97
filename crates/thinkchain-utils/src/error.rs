use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Library-level error type with rich context and user-friendly reporting.
///
/// `ChainError` is the primary error type returned by thinkchain library operations.
/// It aggregates the per-concern error enums below:
///
/// | Variant | Raised by |
/// |---------|-----------|
/// | `Config` | Configuration discovery, parsing and validation |
/// | `Extraction` | Delimited payload missing or unrepairable |
/// | `Schema` | Payload parsed but fields missing or invalid |
/// | `Llm` | Model client transport/provider failures |
/// | `Io` | Reading queries or history from disk/stdin |
///
/// Use [`to_exit_code()`](Self::to_exit_code) to map errors to CLI exit codes and
/// [`display_for_user()`](Self::display_for_user) for a formatted report.
///
/// Library code returns `ChainError` and does NOT call `std::process::exit()`.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    ModelOutput,
    ModelClient,
    FileSystem,
    ResourceLimits,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::ModelOutput => write!(f, "Model Output"),
            Self::ModelClient => write!(f, "Model Client"),
            Self::FileSystem => write!(f, "File System"),
            Self::ResourceLimits => write!(f, "Resource Limits"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    NotFound { path: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(msg) => format!("The configuration file is invalid: {msg}"),
            Self::MissingRequired(key) => format!("Required configuration '{key}' is missing"),
            Self::InvalidValue { key, value } => {
                format!("Configuration value for '{key}' is invalid: {value}")
            }
            Self::NotFound { path } => format!("Configuration file '{path}' was not found"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "thinkchain reads TOML from .thinkchain/config.toml or the --config path."
                    .to_string(),
            ),
            Self::MissingRequired(_) => Some(
                "Some settings (such as the OpenRouter API key) have no built-in default."
                    .to_string(),
            ),
            Self::InvalidValue { .. } => None,
            Self::NotFound { .. } => {
                Some("An explicit --config path must point to an existing file.".to_string())
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of the configuration file".to_string(),
                "Run 'thinkchain config' to see the effective configuration".to_string(),
            ],
            Self::MissingRequired(_) => vec![
                "Set OPENROUTER_API_KEY in the environment or in a .env file".to_string(),
                "Or set [llm.openrouter] api_key_env to the variable holding the key".to_string(),
            ],
            Self::InvalidValue { key, .. } => {
                vec![format!("Correct the value of '{key}' and try again")]
            }
            Self::NotFound { .. } => vec![
                "Check the path passed to --config".to_string(),
                "Omit --config to use upward discovery of .thinkchain/config.toml".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Failures to recover a structured payload from delimited model text.
///
/// Always fatal to the call that produced the text; never defaulted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// The opening delimiter does not occur in the response
    #[error("opening marker '{marker}' not found in model response")]
    MissingOpenMarker { marker: String },

    /// No closing delimiter occurs after the opening one
    #[error("closing marker '{marker}' not found after opening marker")]
    MissingCloseMarker { marker: String },

    /// Neither the strict nor the relaxed parser accepted the repaired payload.
    /// Carries the strict parser's diagnostics and the offending text.
    #[error("payload is not valid JSON at line {line}, column {column}: {reason}")]
    Unparseable {
        reason: String,
        line: usize,
        column: usize,
        payload: String,
    },

    /// The payload parsed but is not a JSON object
    #[error("payload must be a JSON object, found {found}")]
    NotAnObject { found: String },
}

impl UserFriendlyError for ExtractionError {
    fn user_message(&self) -> String {
        match self {
            Self::MissingOpenMarker { marker } | Self::MissingCloseMarker { marker } => {
                format!("The model response did not contain the expected {marker} block")
            }
            Self::Unparseable { reason, .. } => {
                format!("The model returned a payload that could not be repaired: {reason}")
            }
            Self::NotAnObject { found } => {
                format!("The model returned a {found} where an object was expected")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Unparseable { payload, .. } => Some(format!(
                "Repaired payload ({} bytes) still failed to parse.",
                payload.len()
            )),
            _ => Some(
                "Structured results are requested inside delimiter tags; the model ignored them."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        vec![
            "Retry the query; model output formatting varies between calls".to_string(),
            "Try a model that follows formatting instructions more closely".to_string(),
            "Run with --verbose to log the raw model response".to_string(),
        ]
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::ModelOutput
    }
}

/// Payload parsed but required fields are missing or invalid.
///
/// Treated exactly like an [`ExtractionError`]: the current attempt fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Field shape mismatch reported by the deserializer
    #[error("{payload} payload is malformed: {reason}")]
    Malformed {
        payload: &'static str,
        reason: String,
    },

    #[error("quality score {score} is outside 0-100")]
    ScoreOutOfRange { score: f64 },

    #[error("unknown next_action '{value}' (expected proceed, recurse, revise or complete)")]
    UnknownAction { value: String },

    #[error("framework proposes no phases")]
    EmptyFramework,

    #[error("framework phase name must not be empty (phase #{index})")]
    EmptyPhaseName { index: usize },

    #[error("framework lists phase '{name}' more than once")]
    DuplicatePhase { name: String },

    /// A phase may not take the context key holding the framework itself
    #[error("phase name '{name}' is reserved")]
    ReservedPhaseName { name: String },
}

impl UserFriendlyError for SchemaError {
    fn user_message(&self) -> String {
        format!("The model response did not match the expected structure: {self}")
    }

    fn context(&self) -> Option<String> {
        Some(
            "Payloads are validated eagerly; an invalid payload fails the current attempt."
                .to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        vec![
            "Retry the query".to_string(),
            "Run with --verbose to see the payload that failed validation".to_string(),
        ]
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::ModelOutput
    }
}

/// LLM backend errors
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, malformed provider response)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Budget limit exceeded
    #[error("Budget exceeded: attempted {attempted} calls, limit is {limit}")]
    BudgetExceeded { limit: u32, attempted: u32 },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl LlmError {
    /// Whether the failure is worth retrying at the transport layer
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ProviderQuota(_) | Self::ProviderOutage(_)
        )
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("LLM transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("LLM provider authentication failed: {msg}"),
            Self::ProviderQuota(msg) => format!("LLM provider quota exceeded: {msg}"),
            Self::ProviderOutage(msg) => format!("LLM provider service outage: {msg}"),
            Self::Timeout { duration } => {
                format!("LLM invocation timed out after {:?}", duration)
            }
            Self::BudgetExceeded { limit, attempted } => {
                format!(
                    "LLM budget exceeded: attempted {} calls, limit is {}",
                    attempted, limit
                )
            }
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
            Self::Unsupported(msg) => format!("LLM feature not supported: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Transport(_) => Some(
                "Transport errors occur when the LLM endpoint cannot be reached or answers garbage."
                    .to_string(),
            ),
            Self::ProviderAuth(_) => Some(
                "Authentication errors indicate missing or invalid API keys.".to_string(),
            ),
            Self::ProviderQuota(_) => Some(
                "Quota errors occur when rate limits or usage limits are exceeded.".to_string(),
            ),
            Self::ProviderOutage(_) => {
                Some("Provider outages are temporary service disruptions.".to_string())
            }
            Self::Timeout { .. } => Some(
                "Timeouts occur when a completion takes longer than the configured limit."
                    .to_string(),
            ),
            Self::BudgetExceeded { .. } => {
                Some("Budget limits prevent runaway LLM API calls and costs.".to_string())
            }
            Self::Misconfiguration(_) => Some(
                "Configuration errors indicate missing or invalid LLM provider settings."
                    .to_string(),
            ),
            Self::Unsupported(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) => vec![
                "Verify network connectivity to the provider".to_string(),
                "Try running with --verbose to see detailed error information".to_string(),
            ],
            Self::ProviderAuth(_) => vec![
                "Check that OPENROUTER_API_KEY (or the configured api_key_env) is set".to_string(),
                "Verify the API key is valid and not expired".to_string(),
            ],
            Self::ProviderQuota(_) | Self::ProviderOutage(_) => vec![
                "Wait a few minutes and try again".to_string(),
                "Check the provider's status page and usage dashboard".to_string(),
            ],
            Self::Timeout { .. } => vec![
                "Increase [defaults] request_timeout in the configuration".to_string(),
                "Try a faster model".to_string(),
            ],
            Self::BudgetExceeded { .. } => vec![
                "Increase the budget via THINKCHAIN_LLM_BUDGET or [llm.openrouter] budget"
                    .to_string(),
            ],
            Self::Misconfiguration(_) => vec![
                "Check the [llm] section in .thinkchain/config.toml".to_string(),
                "Ensure required configuration keys are present".to_string(),
            ],
            Self::Unsupported(_) => vec![
                "Use the 'openrouter' provider".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) | Self::Unsupported(_) => {
                ErrorCategory::Configuration
            }
            Self::ProviderQuota(_) | Self::BudgetExceeded { .. } => ErrorCategory::ResourceLimits,
            Self::Transport(_) | Self::ProviderOutage(_) | Self::Timeout { .. } => {
                ErrorCategory::ModelClient
            }
        }
    }
}

impl UserFriendlyError for ChainError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Extraction(err) => err.user_message(),
            Self::Schema(err) => err.user_message(),
            Self::Llm(err) => err.user_message(),
            Self::Io(err) => format!("File system operation failed: {err}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Extraction(err) => err.context(),
            Self::Schema(err) => err.context(),
            Self::Llm(err) => err.context(),
            Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Extraction(err) => err.suggestions(),
            Self::Schema(err) => err.suggestions(),
            Self::Llm(err) => err.suggestions(),
            Self::Io(_) => vec!["Check that the input file exists and is readable".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(err) => err.category(),
            Self::Extraction(err) => err.category(),
            Self::Schema(err) => err.category(),
            Self::Llm(err) => err.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

impl ChainError {
    /// Render the error with context and suggestions for terminal output
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut out = format!("✗ {}", self.user_message());
        out.push_str(&format!("\n  Category: {}", self.category()));
        if let Some(context) = self.context() {
            out.push_str(&format!("\n  Context: {context}"));
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n  Suggestions:");
            for suggestion in suggestions {
                out.push_str(&format!("\n    - {suggestion}"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_converts_into_chain_error() {
        let err: ChainError = ExtractionError::MissingOpenMarker {
            marker: "<framework>".to_string(),
        }
        .into();
        assert!(matches!(err, ChainError::Extraction(_)));
        assert_eq!(err.category(), ErrorCategory::ModelOutput);
    }

    #[test]
    fn test_unparseable_carries_payload_for_diagnostics() {
        let err = ExtractionError::Unparseable {
            reason: "expected value".to_string(),
            line: 1,
            column: 3,
            payload: "{ x".to_string(),
        };
        assert!(err.to_string().contains("line 1, column 3"));
        assert!(err.context().unwrap().contains("3 bytes"));
    }

    #[test]
    fn test_llm_error_retryability() {
        assert!(LlmError::ProviderQuota("429".into()).is_retryable());
        assert!(LlmError::ProviderOutage("503".into()).is_retryable());
        assert!(LlmError::Transport("reset".into()).is_retryable());
        assert!(!LlmError::ProviderAuth("401".into()).is_retryable());
        assert!(
            !LlmError::Timeout {
                duration: Duration::from_secs(1)
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_display_for_user_lists_suggestions() {
        let err = ChainError::Config(ConfigError::MissingRequired("api key".to_string()));
        let rendered = err.display_for_user();
        assert!(rendered.starts_with("✗ Required configuration 'api key' is missing"));
        assert!(rendered.contains("Category: Configuration"));
        assert!(rendered.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_schema_error_messages() {
        assert_eq!(
            SchemaError::ScoreOutOfRange { score: 120.0 }.to_string(),
            "quality score 120 is outside 0-100"
        );
        assert!(
            SchemaError::UnknownAction {
                value: "retry".to_string()
            }
            .to_string()
            .contains("'retry'")
        );
    }
}
