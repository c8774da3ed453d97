//! Budgeted backend wrapper for model call limiting
//!
//! Caps the number of invocations per process so a misbehaving run cannot
//! spend without bound.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

use crate::LlmError;
use crate::types::{LlmBackend, LlmInvocation, LlmResult};

/// Default call limit per process.
///
/// A run issues one framework call, up to `max_attempts` calls per phase and a
/// couple of improvement calls, so this leaves room for long frameworks.
pub const DEFAULT_BUDGET_LIMIT: u32 = 50;

/// Wraps an `LlmBackend` and refuses calls past a fixed limit.
///
/// The budget counts attempted calls, not successful ones: a failed call
/// still consumes its slot, so the engine's retry loop cannot bypass the cap.
pub struct BudgetedBackend {
    inner: Box<dyn LlmBackend>,
    used: AtomicU32,
    limit: u32,
}

impl BudgetedBackend {
    #[must_use]
    pub fn new(inner: Box<dyn LlmBackend>, limit: u32) -> Self {
        debug!(limit, "Creating BudgetedBackend");
        Self {
            inner,
            used: AtomicU32::new(0),
            limit,
        }
    }

    /// Limit taken from `[llm.openrouter] budget` (or `THINKCHAIN_LLM_BUDGET`,
    /// already folded in by config discovery), else [`DEFAULT_BUDGET_LIMIT`].
    #[must_use]
    pub fn with_limit_from_config(inner: Box<dyn LlmBackend>, config_budget: Option<u32>) -> Self {
        match config_budget {
            Some(limit) => debug!(limit, "Using budget limit from configuration"),
            None => debug!(limit = DEFAULT_BUDGET_LIMIT, "Using default budget limit"),
        }
        Self::new(inner, config_budget.unwrap_or(DEFAULT_BUDGET_LIMIT))
    }

    /// Calls attempted so far, including refused ones
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[async_trait]
impl LlmBackend for BudgetedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let attempted = self.used.fetch_add(1, Ordering::SeqCst) + 1;

        if attempted > self.limit {
            warn!(
                limit = self.limit,
                attempted,
                label = %inv.label,
                "Model call budget exhausted"
            );
            return Err(LlmError::BudgetExceeded {
                limit: self.limit,
                attempted,
            });
        }

        debug!(
            call = attempted,
            limit = self.limit,
            remaining = self.limit - attempted,
            "Model call within budget"
        );

        self.inner.invoke(inv).await
    }
}
