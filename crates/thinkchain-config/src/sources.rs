use std::collections::BTreeMap;

use super::{Config, ConfigSource};

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    ///
    /// Unset optional values are omitted.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: Option<String>| {
            if let Some(val) = value {
                let source = self
                    .source_attribution
                    .get(key)
                    .unwrap_or(&ConfigSource::Default)
                    .to_string();
                config.insert(key.to_string(), (val, source));
            }
        };

        add("model", self.defaults.model.clone());
        add("max_tokens", self.defaults.max_tokens.map(|v| v.to_string()));
        add("temperature", self.defaults.temperature.map(|v| v.to_string()));
        add(
            "request_timeout",
            self.defaults.request_timeout.map(|v| v.to_string()),
        );
        add("verbose", self.defaults.verbose.map(|v| v.to_string()));
        add("llm_provider", Some(self.provider().to_string()));

        let or = self.openrouter();
        add("openrouter_api_key_env", or.api_key_env);
        add("openrouter_base_url", or.base_url);
        add("openrouter_model", or.model);
        add("site_url", or.site_url);
        add("app_name", or.app_name);
        add("max_retries", or.max_retries.map(|v| v.to_string()));
        add("retry_delay_ms", or.retry_delay_ms.map(|v| v.to_string()));
        add(
            "min_request_interval_ms",
            or.min_request_interval_ms.map(|v| v.to_string()),
        );
        add("llm_budget", or.budget.map(|v| v.to_string()));
        add("input_cost_per_1k", or.input_cost_per_1k.map(|v| v.to_string()));
        add(
            "output_cost_per_1k",
            or.output_cost_per_1k.map(|v| v.to_string()),
        );

        add("max_attempts", self.engine.max_attempts.map(|v| v.to_string()));
        add("pass_score", self.engine.pass_score.map(|v| v.to_string()));
        add(
            "improvement_threshold",
            self.engine.improvement_threshold.map(|v| v.to_string()),
        );
        add(
            "max_improvement_attempts",
            self.engine.max_improvement_attempts.map(|v| v.to_string()),
        );

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_config_reports_sources() {
        let config = Config::builder().model("openai/gpt-4o").build().unwrap();
        let effective = config.effective_config();

        assert_eq!(
            effective.get("model"),
            Some(&("openai/gpt-4o".to_string(), "programmatic".to_string()))
        );
        assert_eq!(
            effective.get("max_attempts"),
            Some(&("3".to_string(), "default".to_string()))
        );
        assert!(!effective.contains_key("llm_budget"));
    }
}
