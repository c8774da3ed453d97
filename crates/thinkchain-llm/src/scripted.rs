//! Scripted backend for tests: replays canned responses in order and records
//! every prompt it receives.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::LlmError;
use crate::types::{LlmBackend, LlmInvocation, LlmResult};

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    seen: Mutex<Vec<LlmInvocation>>,
}

impl ScriptedBackend {
    /// Backend that answers with each response in turn
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(responses.into_iter().map(|r| Ok(r.into())).collect())
    }

    /// Backend that yields each result in turn, errors included
    #[must_use]
    pub fn from_results(results: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Queue one more response
    pub fn push(&self, result: Result<String, LlmError>) {
        self.script
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(result);
    }

    /// Number of invocations received
    pub fn call_count(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Concatenated message contents of every invocation, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|inv| {
                inv.messages
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect()
    }

    /// Labels of every invocation, in call order
    pub fn labels(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|inv| inv.label.clone())
            .collect()
    }

    /// Responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let model = if inv.model.is_empty() {
            "scripted".to_string()
        } else {
            inv.model.clone()
        };
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(inv);

        let next = self
            .script
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Transport("scripted backend exhausted".into())));

        next.map(|text| {
            let words = text.split_whitespace().count() as u64;
            LlmResult::new(text, "scripted", model).with_tokens(10, words)
        })
    }
}
