//! Model client for thinkchain
//!
//! Provides the [`LlmBackend`] trait, the OpenRouter HTTP backend and the
//! wrappers layered over it: a per-process call budget and usage tracking.
//! [`from_config`] assembles the stack the engine talks to.

mod budgeted_backend;
mod http_client;
mod openrouter_backend;
mod types;
mod usage;

#[cfg(any(test, feature = "test-utils"))]
mod scripted;
#[cfg(test)]
mod test_server;

use std::sync::Arc;
use thinkchain_config::Config;

pub use budgeted_backend::{BudgetedBackend, DEFAULT_BUDGET_LIMIT};
pub use http_client::RetryPolicy;
pub use openrouter_backend::{HttpParams, OpenRouterBackend, OpenRouterSettings};
#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedBackend;
pub use thinkchain_utils::LlmError;
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
pub use usage::{
    Pricing, TokenTotals, TrackedBackend, UsageRecord, UsageReport, UsageTracker,
};

/// Backend handed to the engine, plus the tracker recording its usage
#[derive(Clone)]
pub struct ModelClient {
    pub backend: Arc<dyn LlmBackend>,
    pub usage: Arc<UsageTracker>,
}

/// Build the model client for the configured provider.
///
/// The provider backend is wrapped in a [`BudgetedBackend`] and then a
/// [`TrackedBackend`], so refused calls are never recorded as usage.
///
/// # Errors
///
/// - `LlmError::Unsupported` for an unknown provider
/// - `LlmError::Misconfiguration` when the API key is missing
pub fn from_config(config: &Config) -> Result<ModelClient, LlmError> {
    let provider: Box<dyn LlmBackend> = match config.provider() {
        "openrouter" => Box::new(OpenRouterBackend::new_from_config(config)?),
        other => {
            return Err(LlmError::Unsupported(format!(
                "LLM provider '{other}' is not supported. Supported providers: openrouter"
            )));
        }
    };
    Ok(wrap(provider, config))
}

/// Layer budget and usage tracking over an arbitrary backend
#[must_use]
pub fn wrap(backend: Box<dyn LlmBackend>, config: &Config) -> ModelClient {
    let or = config.openrouter();
    let pricing = Pricing {
        input_per_1k: or.input_cost_per_1k.unwrap_or(Pricing::default().input_per_1k),
        output_per_1k: or.output_cost_per_1k.unwrap_or(Pricing::default().output_per_1k),
    };
    let usage = Arc::new(UsageTracker::new(pricing));
    let budgeted = BudgetedBackend::with_limit_from_config(backend, or.budget);
    let tracked = TrackedBackend::new(Box::new(budgeted), Arc::clone(&usage));

    ModelClient {
        backend: Arc::new(tracked),
        usage,
    }
}
