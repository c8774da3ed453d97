use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Default model requested from OpenRouter when nothing else is configured
pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

/// Default OpenRouter API root; `/chat/completions` is appended by the backend
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";
pub const DEFAULT_APP_NAME: &str = "ThinkingChain";

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Command-line flag (highest precedence)
    Cli,
    /// Environment variable, including values loaded from `.env`
    Env,
    /// Configuration file
    Config,
    /// Set through [`Config::builder()`]
    Programmatic,
    /// Built-in default (lowest precedence)
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Cli => "cli",
            Self::Env => "env",
            Self::Config => "config",
            Self::Programmatic => "programmatic",
            Self::Default => "default",
        };
        f.write_str(label)
    }
}

/// Configuration for thinkchain runs.
///
/// Values are layered with precedence CLI > environment > config file >
/// built-in defaults, and every resolved key records its
/// [`ConfigSource`] in `source_attribution`.
///
/// # Configuration File Format
///
/// ```toml
/// [defaults]
/// model = "anthropic/claude-3.5-sonnet"
/// request_timeout = 300
///
/// [llm]
/// provider = "openrouter"
///
/// [llm.openrouter]
/// api_key_env = "OPENROUTER_API_KEY"
/// site_url = "http://localhost:3000"
/// app_name = "ThinkingChain"
/// max_retries = 3
///
/// [engine]
/// max_attempts = 3
/// pass_score = 80
/// improvement_threshold = 95
/// max_improvement_attempts = 2
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: Defaults,
    pub llm: LlmConfig,
    pub engine: EngineConfig,
    /// Source attribution for each setting (for `thinkchain config`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// Per-request defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Model requested per call. When unset the backend's own default applies.
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Deadline for a single model call, in seconds
    pub request_timeout: Option<u64>,
    pub verbose: Option<bool>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: None,
            temperature: None,
            request_timeout: Some(300),
            verbose: Some(false),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub openrouter: Option<OpenRouterConfig>,
}

/// OpenRouter HTTP provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenRouterConfig {
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    /// Sent as the `HTTP-Referer` header
    pub site_url: Option<String>,
    /// Sent as the `X-Title` header
    pub app_name: Option<String>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub min_request_interval_ms: Option<u64>,
    /// Maximum number of calls per process
    pub budget: Option<u32>,
    /// USD per 1000 prompt tokens
    pub input_cost_per_1k: Option<f64>,
    /// USD per 1000 completion tokens
    pub output_cost_per_1k: Option<f64>,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_string()),
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            model: Some(DEFAULT_MODEL.to_string()),
            site_url: Some(DEFAULT_SITE_URL.to_string()),
            app_name: Some(DEFAULT_APP_NAME.to_string()),
            max_retries: Some(3),
            retry_delay_ms: Some(1000),
            min_request_interval_ms: Some(1000),
            budget: None,
            input_cost_per_1k: Some(0.0015),
            output_cost_per_1k: Some(0.015),
        }
    }
}

/// Quality gate and retry ceilings for the phase engine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    pub max_attempts: Option<u32>,
    pub pass_score: Option<f64>,
    pub improvement_threshold: Option<f64>,
    pub max_improvement_attempts: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(3),
            pass_score: Some(80.0),
            improvement_threshold: Some(95.0),
            max_improvement_attempts: Some(2),
        }
    }
}

impl Config {
    /// OpenRouter section, falling back to built-in defaults when absent
    #[must_use]
    pub fn openrouter(&self) -> OpenRouterConfig {
        let defaults = OpenRouterConfig::default();
        let Some(or) = self.llm.openrouter.clone() else {
            return defaults;
        };
        OpenRouterConfig {
            api_key_env: or.api_key_env.or(defaults.api_key_env),
            base_url: or.base_url.or(defaults.base_url),
            model: or.model.or(defaults.model),
            site_url: or.site_url.or(defaults.site_url),
            app_name: or.app_name.or(defaults.app_name),
            max_retries: or.max_retries.or(defaults.max_retries),
            retry_delay_ms: or.retry_delay_ms.or(defaults.retry_delay_ms),
            min_request_interval_ms: or
                .min_request_interval_ms
                .or(defaults.min_request_interval_ms),
            budget: or.budget.or(defaults.budget),
            input_cost_per_1k: or.input_cost_per_1k.or(defaults.input_cost_per_1k),
            output_cost_per_1k: or.output_cost_per_1k.or(defaults.output_cost_per_1k),
        }
    }

    /// Provider name, `openrouter` unless configured otherwise
    #[must_use]
    pub fn provider(&self) -> &str {
        self.llm.provider.as_deref().unwrap_or("openrouter")
    }
}
