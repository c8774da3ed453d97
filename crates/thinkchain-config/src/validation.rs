use thinkchain_utils::ConfigError;

use super::Config;

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

fn check_score(key: &str, value: Option<f64>) -> Result<(), ConfigError> {
    match value {
        Some(v) if !v.is_finite() || !(0.0..=100.0).contains(&v) => {
            Err(invalid(key, format!("{v} must be between 0 and 100")))
        }
        _ => Ok(()),
    }
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(timeout) = self.defaults.request_timeout {
            if timeout == 0 {
                return Err(invalid("request_timeout", "must be greater than 0"));
            }
            if timeout > 3600 {
                return Err(invalid(
                    "request_timeout",
                    "exceeds maximum limit of 3600 seconds (1 hour)",
                ));
            }
        }

        if self.defaults.max_tokens == Some(0) {
            return Err(invalid("max_tokens", "must be greater than 0"));
        }

        if let Some(temperature) = self.defaults.temperature
            && (!temperature.is_finite() || !(0.0..=2.0).contains(&temperature))
        {
            return Err(invalid("temperature", "must be between 0.0 and 2.0"));
        }

        if let Some(model) = &self.defaults.model
            && model.trim().is_empty()
        {
            return Err(invalid("model", "must not be empty"));
        }

        let provider = self.provider();
        if provider != "openrouter" {
            return Err(invalid(
                "llm_provider",
                format!("'{provider}' is not supported (expected 'openrouter')"),
            ));
        }

        let or = self.openrouter();
        if let Some(base_url) = &or.base_url
            && !(base_url.starts_with("https://") || base_url.starts_with("http://"))
        {
            return Err(invalid(
                "openrouter_base_url",
                format!("'{base_url}' must start with http:// or https://"),
            ));
        }
        if let Some(retries) = or.max_retries
            && retries > 10
        {
            return Err(invalid("max_retries", "exceeds maximum limit of 10"));
        }
        if let Some(delay) = or.retry_delay_ms
            && delay > 60_000
        {
            return Err(invalid("retry_delay_ms", "exceeds maximum limit of 60000"));
        }
        if let Some(interval) = or.min_request_interval_ms
            && interval > 60_000
        {
            return Err(invalid(
                "min_request_interval_ms",
                "exceeds maximum limit of 60000",
            ));
        }
        if or.budget == Some(0) {
            return Err(invalid("llm_budget", "must be greater than 0"));
        }
        for (key, cost) in [
            ("input_cost_per_1k", or.input_cost_per_1k),
            ("output_cost_per_1k", or.output_cost_per_1k),
        ] {
            if let Some(cost) = cost
                && (!cost.is_finite() || cost < 0.0)
            {
                return Err(invalid(key, "must be a non-negative number"));
            }
        }

        if let Some(max_attempts) = self.engine.max_attempts {
            if max_attempts == 0 {
                return Err(invalid("max_attempts", "must be greater than 0"));
            }
            if max_attempts > 10 {
                return Err(invalid("max_attempts", "exceeds maximum limit of 10"));
            }
        }
        if let Some(ceiling) = self.engine.max_improvement_attempts
            && ceiling > 5
        {
            return Err(invalid(
                "max_improvement_attempts",
                "exceeds maximum limit of 5",
            ));
        }
        check_score("pass_score", self.engine.pass_score)?;
        check_score("improvement_threshold", self.engine.improvement_threshold)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_builder_config_is_valid() {
        assert!(Config::builder().build().is_ok());
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let err = Config::builder().max_attempts(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "max_attempts"));
    }

    #[test]
    fn test_rejects_out_of_range_scores() {
        let err = Config::builder().pass_score(101.0).build().unwrap_err();
        assert!(err.to_string().contains("pass_score"));

        let err = Config::builder()
            .improvement_threshold(f64::NAN)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("improvement_threshold"));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = Config::builder().provider("claude-cli").build().unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = Config::builder()
            .base_url("ftp://openrouter.ai")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("openrouter_base_url"));
    }
}
