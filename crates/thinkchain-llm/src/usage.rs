//! Token usage accounting and cost estimation
//!
//! [`TrackedBackend`] records the token counts of every successful call into a
//! shared [`UsageTracker`]; the CLI prints the resulting [`UsageReport`] after
//! a run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

use crate::LlmError;
use crate::types::{LlmBackend, LlmInvocation, LlmResult};

/// USD prices per 1000 tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_1k: 0.0015,
            output_per_1k: 0.015,
        }
    }
}

/// Token counts of one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    pub label: String,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub timestamp: DateTime<Utc>,
}

impl UsageRecord {
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenTotals {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Snapshot of everything tracked so far
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub usage: TokenTotals,
    pub estimated_cost: f64,
    pub requests_made: usize,
    pub latest_request: Option<UsageRecord>,
}

#[derive(Debug, Default)]
pub struct UsageTracker {
    pricing: Pricing,
    history: Mutex<Vec<UsageRecord>>,
}

impl UsageTracker {
    #[must_use]
    pub fn new(pricing: Pricing) -> Self {
        Self {
            pricing,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, label: &str, result: &LlmResult) {
        let record = UsageRecord {
            label: label.to_string(),
            model: result.model_used.clone(),
            prompt_tokens: result.tokens_input.unwrap_or(0),
            completion_tokens: result.tokens_output.unwrap_or(0),
            timestamp: Utc::now(),
        };
        info!(
            label,
            total_tokens = record.total_tokens(),
            "Token usage recorded"
        );
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    #[must_use]
    pub fn totals(&self) -> TokenTotals {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.iter().fold(TokenTotals::default(), |acc, r| TokenTotals {
            prompt_tokens: acc.prompt_tokens + r.prompt_tokens,
            completion_tokens: acc.completion_tokens + r.completion_tokens,
            total_tokens: acc.total_tokens + r.total_tokens(),
        })
    }

    /// Cost of all recorded calls under this tracker's pricing
    #[must_use]
    pub fn estimate_cost(&self) -> f64 {
        let totals = self.totals();
        (totals.prompt_tokens as f64 / 1000.0) * self.pricing.input_per_1k
            + (totals.completion_tokens as f64 / 1000.0) * self.pricing.output_per_1k
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn report(&self) -> UsageReport {
        let latest_request = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned();
        UsageReport {
            usage: self.totals(),
            estimated_cost: self.estimate_cost(),
            requests_made: self.request_count(),
            latest_request,
        }
    }
}

/// Records usage of every successful call made through the inner backend
pub struct TrackedBackend {
    inner: Box<dyn LlmBackend>,
    tracker: Arc<UsageTracker>,
}

impl TrackedBackend {
    #[must_use]
    pub fn new(inner: Box<dyn LlmBackend>, tracker: Arc<UsageTracker>) -> Self {
        Self { inner, tracker }
    }
}

#[async_trait]
impl LlmBackend for TrackedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let label = inv.label.clone();
        let result = self.inner.invoke(inv).await?;
        self.tracker.record(&label, &result);
        Ok(result)
    }
}
