//! OpenRouter HTTP backend
//!
//! Talks to the OpenAI-compatible `chat/completions` endpoint exposed by
//! OpenRouter. Attribution headers (`HTTP-Referer`, `X-Title`) come from
//! configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thinkchain_config::Config;
use tracing::debug;

use crate::LlmError;
use crate::http_client::{HttpClient, RetryPolicy};
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message};

const PROVIDER: &str = "openrouter";

/// Sampling parameters; `None` leaves the provider default in place
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HttpParams {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Everything the backend needs, resolved from [`Config`] plus the API key
#[derive(Debug, Clone)]
pub struct OpenRouterSettings {
    pub api_key: String,
    /// API root, without the `/chat/completions` suffix
    pub base_url: String,
    pub default_model: String,
    pub site_url: Option<String>,
    pub app_name: Option<String>,
    pub retry: RetryPolicy,
    pub params: HttpParams,
}

impl OpenRouterSettings {
    /// Resolve settings from configuration, reading the API key from the
    /// environment variable named by `llm.openrouter.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the key variable is unset or empty.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Self::from_config_with_env(config, |name| std::env::var(name).ok())
    }

    pub(crate) fn from_config_with_env<F>(config: &Config, env: F) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or = config.openrouter();
        let api_key_env = or
            .api_key_env
            .unwrap_or_else(|| thinkchain_config::DEFAULT_API_KEY_ENV.to_string());

        let api_key = env(&api_key_env)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LlmError::Misconfiguration(format!(
                    "OpenRouter API key not found in environment variable '{api_key_env}'. \
                     Set it (a .env file works too) or configure a different api_key_env in [llm.openrouter]."
                ))
            })?;

        let retry = RetryPolicy {
            max_retries: or.max_retries.unwrap_or(3),
            initial_delay: Duration::from_millis(or.retry_delay_ms.unwrap_or(1000)),
            min_interval: Duration::from_millis(or.min_request_interval_ms.unwrap_or(1000)),
        };

        Ok(Self {
            api_key,
            base_url: or
                .base_url
                .unwrap_or_else(|| thinkchain_config::DEFAULT_BASE_URL.to_string()),
            default_model: or
                .model
                .unwrap_or_else(|| thinkchain_config::DEFAULT_MODEL.to_string()),
            site_url: or.site_url,
            app_name: or.app_name,
            retry,
            params: HttpParams {
                max_tokens: config.defaults.max_tokens,
                temperature: config.defaults.temperature,
            },
        })
    }
}

#[derive(Clone)]
pub struct OpenRouterBackend {
    client: HttpClient,
    endpoint: String,
    api_key: String,
    default_model: String,
    site_url: Option<String>,
    app_name: Option<String>,
    default_params: HttpParams,
}

impl std::fmt::Debug for OpenRouterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterBackend")
            .field("endpoint", &self.endpoint)
            .field("default_model", &self.default_model)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl OpenRouterBackend {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn new(settings: OpenRouterSettings) -> Result<Self, LlmError> {
        let client = HttpClient::new(settings.retry)?;
        let endpoint = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            api_key: settings.api_key,
            default_model: settings.default_model,
            site_url: settings.site_url,
            app_name: settings.app_name,
            default_params: settings.params,
        })
    }

    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the API key environment variable
    /// is not set or the HTTP client cannot be constructed
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        Self::new(OpenRouterSettings::from_config(config)?)
    }

    /// Resolve parameters for this invocation.
    ///
    /// `inv.model` overrides the default model when non-empty;
    /// `metadata["max_tokens"]` and `metadata["temperature"]` override the
    /// configured sampling defaults.
    fn resolve_params(&self, inv: &LlmInvocation) -> (String, HttpParams) {
        let model = if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        };

        let max_tokens = inv
            .metadata
            .get("max_tokens")
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .or(self.default_params.max_tokens);

        let temperature = inv
            .metadata
            .get("temperature")
            .and_then(serde_json::Value::as_f64)
            .map(|v| v as f32)
            .or(self.default_params.temperature);

        (
            model,
            HttpParams {
                max_tokens,
                temperature,
            },
        )
    }

    fn convert_messages(messages: &[Message]) -> Vec<OpenAiMessage<'_>> {
        messages
            .iter()
            .map(|msg| OpenAiMessage {
                role: msg.role.as_str(),
                content: &msg.content,
            })
            .collect()
    }
}

#[async_trait]
impl LlmBackend for OpenRouterBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = self.resolve_params(&inv);

        debug!(
            provider = PROVIDER,
            label = %inv.label,
            model = %model,
            max_tokens = ?params.max_tokens,
            temperature = ?params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking OpenRouter backend"
        );

        let request_body = OpenRouterRequest {
            model: &model,
            messages: Self::convert_messages(&inv.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let mut request = self
            .client
            .inner()
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if let Some(site_url) = &self.site_url {
            request = request.header("HTTP-Referer", site_url);
        }
        if let Some(app_name) = &self.app_name {
            request = request.header("X-Title", app_name);
        }
        let request = request.json(&request_body);

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, PROVIDER)
            .await?;

        let response_body: OpenRouterResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse OpenRouter response: {e}"))
        })?;

        let choice = response_body.choices.into_iter().next().ok_or_else(|| {
            LlmError::Transport("OpenRouter response missing choices[0]".to_string())
        })?;

        let content = choice.message.content.ok_or_else(|| {
            LlmError::Transport("OpenRouter response missing content in choices[0]".to_string())
        })?;

        let mut result = LlmResult::new(
            content,
            PROVIDER,
            response_body.model.unwrap_or(model),
        )
        .with_timeout_seconds(inv.timeout.as_secs());
        result.timed_out = Some(false);
        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }
        if let Some(reason) = choice.finish_reason {
            result = result.with_extension("finish_reason", serde_json::Value::String(reason));
        }

        debug!(
            provider = PROVIDER,
            label = %inv.label,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "OpenRouter invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenRouterRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{Reply, TestServer};
    use serde_json::json;

    fn settings(base_url: &str) -> OpenRouterSettings {
        OpenRouterSettings {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            default_model: "default/model".to_string(),
            site_url: Some("http://localhost:3000".to_string()),
            app_name: Some("ThinkingChain".to_string()),
            retry: RetryPolicy {
                max_retries: 1,
                initial_delay: Duration::from_millis(5),
                min_interval: Duration::ZERO,
            },
            params: HttpParams::default(),
        }
    }

    fn invocation(model: &str) -> LlmInvocation {
        LlmInvocation::prompt("framework", model, Duration::from_secs(5), "Say hi")
    }

    #[test]
    fn test_settings_require_api_key() {
        let config = Config::builder().build().unwrap();
        let err = OpenRouterSettings::from_config_with_env(&config, |_| None).unwrap_err();
        match err {
            LlmError::Misconfiguration(msg) => assert!(msg.contains("OPENROUTER_API_KEY")),
            other => panic!("expected misconfiguration, got {other:?}"),
        }

        let err =
            OpenRouterSettings::from_config_with_env(&config, |_| Some("  ".into())).unwrap_err();
        assert!(matches!(err, LlmError::Misconfiguration(_)));
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::builder()
            .api_key_env("MY_KEY")
            .max_tokens(512)
            .max_retries(5)
            .retry_delay(Duration::from_millis(250))
            .build()
            .unwrap();
        let settings = OpenRouterSettings::from_config_with_env(&config, |name| {
            (name == "MY_KEY").then(|| "sk-test".to_string())
        })
        .unwrap();

        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.default_model, thinkchain_config::DEFAULT_MODEL);
        assert_eq!(settings.params.max_tokens, Some(512));
        assert_eq!(settings.params.temperature, None);
        assert_eq!(settings.retry.max_retries, 5);
        assert_eq!(settings.retry.initial_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_resolve_params_prefers_invocation() {
        let backend = OpenRouterBackend::new(OpenRouterSettings {
            params: HttpParams {
                max_tokens: Some(100),
                temperature: Some(0.5),
            },
            ..settings("http://localhost")
        })
        .unwrap();

        let (model, params) = backend.resolve_params(&invocation(""));
        assert_eq!(model, "default/model");
        assert_eq!(params.max_tokens, Some(100));

        let inv = invocation("custom/model")
            .with_metadata("max_tokens", json!(42))
            .with_metadata("temperature", json!(0.0));
        let (model, params) = backend.resolve_params(&inv);
        assert_eq!(model, "custom/model");
        assert_eq!(params.max_tokens, Some(42));
        assert_eq!(params.temperature, Some(0.0));
    }

    #[test]
    fn test_request_omits_unset_params() {
        let messages = [Message::user("hi")];
        let body = OpenRouterRequest {
            model: "m",
            messages: OpenRouterBackend::convert_messages(&messages),
            max_tokens: None,
            temperature: None,
            stream: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({"model": "m", "messages": [{"role": "user", "content": "hi"}], "stream": false})
        );
    }

    #[test]
    fn test_debug_hides_api_key() {
        let backend = OpenRouterBackend::new(settings("http://localhost")).unwrap();
        let rendered = format!("{backend:?}");
        assert!(!rendered.contains("test-key"));
        assert!(rendered.contains("chat/completions"));
    }

    #[tokio::test]
    async fn test_invoke_parses_completion() {
        let body = json!({
            "model": "served/model",
            "choices": [{"message": {"role": "assistant", "content": "hello there"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 11, "completion_tokens": 7}
        })
        .to_string();
        let server = TestServer::start(vec![Reply::json(200, &body)]).await;
        let backend = OpenRouterBackend::new(settings(server.base_url())).unwrap();

        let result = backend.invoke(invocation("")).await.unwrap();

        assert_eq!(result.raw_response, "hello there");
        assert_eq!(result.provider, "openrouter");
        assert_eq!(result.model_used, "served/model");
        assert_eq!(result.tokens_input, Some(11));
        assert_eq!(result.tokens_output, Some(7));
        assert_eq!(result.extensions.get("finish_reason"), Some(&json!("stop")));

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let raw = requests[0].to_ascii_lowercase();
        assert!(raw.starts_with("post /chat/completions"));
        assert!(raw.contains("authorization: bearer test-key"));
        assert!(raw.contains("http-referer: http://localhost:3000"));
        assert!(raw.contains("x-title: thinkingchain"));
        assert!(raw.contains("\"model\":\"default/model\""));
    }

    #[tokio::test]
    async fn test_invoke_missing_choices_is_transport_error() {
        let server = TestServer::start(vec![Reply::json(200, r#"{"choices": []}"#)]).await;
        let backend = OpenRouterBackend::new(settings(server.base_url())).unwrap();

        let err = backend.invoke(invocation("")).await.unwrap_err();
        assert!(matches!(err, LlmError::Transport(msg) if msg.contains("choices[0]")));
    }

    #[tokio::test]
    async fn test_invoke_maps_rate_limit_after_retries() {
        let server = TestServer::start(vec![Reply::status(429), Reply::status(429)]).await;
        let backend = OpenRouterBackend::new(settings(server.base_url())).unwrap();

        let err = backend.invoke(invocation("")).await.unwrap_err();
        assert!(matches!(err, LlmError::ProviderQuota(_)));
        assert_eq!(server.hits(), 2);
    }
}
