use std::time::Duration;
use thinkchain_config::Config;

/// Quality gate thresholds, retry ceilings and per-call parameters for a run
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Total attempts allowed per phase, the first one included
    pub max_attempts: u32,
    /// Minimum score for a `proceed` result to complete its phase
    pub pass_score: f64,
    /// Final-phase results scoring below this are offered one improvement call
    pub improvement_threshold: f64,
    /// The improvement call is skipped once the final phase used this many attempts
    pub max_improvement_attempts: u32,
    /// Model requested per call; `None` defers to the backend default
    pub model: Option<String>,
    /// Deadline passed to the backend for each call
    pub timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            pass_score: 80.0,
            improvement_threshold: 95.0,
            max_improvement_attempts: 2,
            model: None,
            timeout: Duration::from_secs(300),
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: config.engine.max_attempts.unwrap_or(defaults.max_attempts),
            pass_score: config.engine.pass_score.unwrap_or(defaults.pass_score),
            improvement_threshold: config
                .engine
                .improvement_threshold
                .unwrap_or(defaults.improvement_threshold),
            max_improvement_attempts: config
                .engine
                .max_improvement_attempts
                .unwrap_or(defaults.max_improvement_attempts),
            model: config.defaults.model.clone(),
            timeout: config
                .defaults
                .request_timeout
                .map_or(defaults.timeout, Duration::from_secs),
        }
    }

    pub(crate) fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or("")
    }
}
