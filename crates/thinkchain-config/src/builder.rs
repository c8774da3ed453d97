use std::collections::HashMap;
use std::time::Duration;
use thinkchain_utils::ConfigError;

use super::{Config, ConfigSource, Defaults, EngineConfig, LlmConfig, OpenRouterConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Unlike [`Config::discover()`], the builder never reads the environment
    /// or the filesystem.
    ///
    /// ```rust
    /// use thinkchain_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .model("anthropic/claude-3.5-sonnet")
    ///     .request_timeout(Duration::from_secs(120))
    ///     .max_attempts(2)
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.engine.max_attempts, Some(2));
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration.
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    defaults: Defaults,
    provider: Option<String>,
    openrouter: OpenRouterConfig,
    engine: EngineConfig,
    attribution: HashMap<String, ConfigSource>,
}

macro_rules! setter {
    ($(#[$meta:meta])* $name:ident, $section:ident . $field:ident, String, $key:literal) => {
        $(#[$meta])*
        #[must_use]
        pub fn $name(mut self, value: impl Into<String>) -> Self {
            self.$section.$field = Some(value.into());
            self.attribution
                .insert($key.to_string(), ConfigSource::Programmatic);
            self
        }
    };
    ($(#[$meta:meta])* $name:ident, $section:ident . $field:ident, $ty:ty, $key:literal) => {
        $(#[$meta])*
        #[must_use]
        pub fn $name(mut self, value: $ty) -> Self {
            self.$section.$field = Some(value);
            self.attribution
                .insert($key.to_string(), ConfigSource::Programmatic);
            self
        }
    };
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    setter!(model, defaults.model, String, "model");
    setter!(max_tokens, defaults.max_tokens, u32, "max_tokens");
    setter!(temperature, defaults.temperature, f32, "temperature");
    setter!(verbose, defaults.verbose, bool, "verbose");
    setter!(api_key_env, openrouter.api_key_env, String, "openrouter_api_key_env");
    setter!(base_url, openrouter.base_url, String, "openrouter_base_url");
    setter!(
        /// Backend default model, used when a call does not name one
        openrouter_model, openrouter.model, String, "openrouter_model"
    );
    setter!(site_url, openrouter.site_url, String, "site_url");
    setter!(app_name, openrouter.app_name, String, "app_name");
    setter!(max_retries, openrouter.max_retries, u32, "max_retries");
    setter!(budget, openrouter.budget, u32, "llm_budget");
    setter!(input_cost_per_1k, openrouter.input_cost_per_1k, f64, "input_cost_per_1k");
    setter!(output_cost_per_1k, openrouter.output_cost_per_1k, f64, "output_cost_per_1k");
    setter!(max_attempts, engine.max_attempts, u32, "max_attempts");
    setter!(pass_score, engine.pass_score, f64, "pass_score");
    setter!(
        improvement_threshold,
        engine.improvement_threshold,
        f64,
        "improvement_threshold"
    );
    setter!(
        max_improvement_attempts,
        engine.max_improvement_attempts,
        u32,
        "max_improvement_attempts"
    );

    /// Deadline for a single model call. Sub-second precision is dropped.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.defaults.request_timeout = Some(timeout.as_secs());
        self.attribution
            .insert("request_timeout".to_string(), ConfigSource::Programmatic);
        self
    }

    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.openrouter.retry_delay_ms = Some(delay.as_millis() as u64);
        self.attribution
            .insert("retry_delay_ms".to_string(), ConfigSource::Programmatic);
        self
    }

    /// Minimum spacing between consecutive requests; zero disables pacing
    #[must_use]
    pub fn min_request_interval(mut self, interval: Duration) -> Self {
        self.openrouter.min_request_interval_ms = Some(interval.as_millis() as u64);
        self.attribution.insert(
            "min_request_interval_ms".to_string(),
            ConfigSource::Programmatic,
        );
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self.attribution
            .insert("llm_provider".to_string(), ConfigSource::Programmatic);
        self
    }

    /// Build the configuration and validate it.
    pub fn build(self) -> Result<Config, ConfigError> {
        let config = Config {
            defaults: self.defaults,
            llm: LlmConfig {
                provider: self.provider,
                openrouter: Some(self.openrouter),
            },
            engine: self.engine,
            source_attribution: self.attribution,
        };
        config.validate()?;
        Ok(config)
    }
}
