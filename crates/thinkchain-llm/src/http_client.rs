//! Shared HTTP client for the OpenRouter backend
//!
//! One `reqwest::Client` per backend, with a bounded retry loop (exponential
//! backoff) and a minimum spacing between consecutive requests.

use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thinkchain_utils::redaction::redact_error_message;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::LlmError;

/// Upper bound applied to any per-request timeout
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(3600);

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry and pacing knobs for [`HttpClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry
    pub initial_delay: Duration,
    /// Minimum spacing between the starts of two requests
    pub min_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            min_interval: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based): `initial_delay * 2^(retry-1)`
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }
}

#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Arc<Client>,
    max_timeout: Duration,
    policy: RetryPolicy,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn new(policy: RetryPolicy) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| {
                LlmError::Misconfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client: Arc::new(client),
            max_timeout: DEFAULT_MAX_HTTP_TIMEOUT,
            policy,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Wait until at least `min_interval` has passed since the previous request
    /// started, then record this one.
    async fn pace(&self) {
        if self.policy.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.policy.min_interval {
                tokio::time::sleep(self.policy.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Execute an HTTP request with pacing, timeout and retry policy.
    ///
    /// - Per-request timeout: `min(request_timeout, max_timeout)`
    /// - 429, 5xx and network failures are retried up to `max_retries` times
    /// - 401/403 and other 4xx fail immediately
    /// - Timeouts fail immediately
    ///
    /// # Errors
    ///
    /// - `LlmError::ProviderAuth` for 401/403
    /// - `LlmError::ProviderQuota` for 429 (after retries)
    /// - `LlmError::ProviderOutage` for 5xx (after retries)
    /// - `LlmError::Timeout` for timeouts
    /// - `LlmError::Transport` for other 4xx and network errors
    pub async fn execute_with_retry(
        &self,
        request_builder: reqwest::RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);
        let mut retry = 0u32;

        loop {
            let request = request_builder
                .try_clone()
                .ok_or_else(|| {
                    LlmError::Transport("Failed to clone request for retry".to_string())
                })?
                .timeout(effective_timeout)
                .build()
                .map_err(|e| LlmError::Transport(format!("Failed to build request: {e}")))?;

            self.pace().await;

            debug!(
                provider = provider_name,
                attempt = retry + 1,
                timeout_secs = effective_timeout.as_secs(),
                "Executing HTTP request"
            );

            let error = match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if status.is_server_error() {
                        LlmError::ProviderOutage(format!(
                            "{provider_name} returned server error: {status}"
                        ))
                    } else if status == StatusCode::TOO_MANY_REQUESTS {
                        map_client_error(status, provider_name)
                    } else {
                        return Err(map_client_error(status, provider_name));
                    }
                }
                Err(e) if e.is_timeout() => {
                    return Err(LlmError::Timeout {
                        duration: effective_timeout,
                    });
                }
                Err(e) => LlmError::Transport(format!(
                    "{provider_name} request failed: {}",
                    redact_error_message(&e.to_string())
                )),
            };

            if !error.is_retryable() || retry >= self.policy.max_retries {
                return Err(error);
            }

            retry += 1;
            let backoff = self.policy.backoff(retry);
            warn!(
                provider = provider_name,
                retry,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Request failed, will retry"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

/// Map non-success, non-5xx status codes to `LlmError` variants:
/// 401/403 → auth, 429 → quota, anything else → transport.
fn map_client_error(status: StatusCode, provider_name: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::ProviderAuth(format!(
            "{provider_name} authentication failed: {status}"
        )),
        StatusCode::TOO_MANY_REQUESTS => LlmError::ProviderQuota(format!(
            "{provider_name} rate limit exceeded: {status}"
        )),
        _ => LlmError::Transport(format!("{provider_name} returned client error: {status}")),
    }
}
