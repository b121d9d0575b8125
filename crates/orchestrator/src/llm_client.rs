//! The `LLMClient` external contract (SPEC_FULL.md §6): `generate(prompt) →
//! text`. One struct per provider, each wrapping its own HTTP shape,
//! resolved from `original_source/ai/llm_extractor.py`'s
//! `_call_local_api`/`_call_cloud_api` branches. Every provider client is
//! wrapped by [`llm_resilience::CircuitBreaker`] before being handed to the
//! engine.

use async_trait::async_trait;
use llm_resilience::{CircuitBreaker, CircuitBreakerConfig, ResilienceError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f64, max_tokens: u32) -> Result<String, ResilienceError>;
}

/// OpenAI-compatible chat-completions endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

#[async_trait]
impl LLMClient for OpenAiClient {
    async fn generate(&self, prompt: &str, temperature: f64, max_tokens: u32) -> Result<String, ResilienceError> {
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": temperature,
                "max_tokens": max_tokens,
            }))
            .send()
            .await
            .map_err(|e| ResilienceError::Transient(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_http_error(status, body));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ResilienceError::Transient(e.to_string()))?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ResilienceError::Permanent("no choices in OpenAI response".to_string()))
    }
}

/// Anthropic Messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.anthropic.com/v1".to_string(),
        }
    }
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn generate(&self, prompt: &str, temperature: f64, max_tokens: u32) -> Result<String, ResilienceError> {
        let resp = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&json!({
                "model": self.model,
                "max_tokens": max_tokens,
                "temperature": temperature,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .map_err(|e| ResilienceError::Transient(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_http_error(status, body));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ResilienceError::Transient(e.to_string()))?;

        body["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ResilienceError::Permanent("no content in Anthropic response".to_string()))
    }
}

/// DeepSeek's OpenAI-compatible endpoint.
pub struct DeepSeekClient {
    inner: OpenAiClient,
}

impl DeepSeekClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let mut inner = OpenAiClient::new(api_key, model);
        inner.base_url = "https://api.deepseek.com/v1".to_string();
        Self { inner }
    }
}

#[async_trait]
impl LLMClient for DeepSeekClient {
    async fn generate(&self, prompt: &str, temperature: f64, max_tokens: u32) -> Result<String, ResilienceError> {
        self.inner.generate(prompt, temperature, max_tokens).await
    }
}

/// Local model server speaking the Ollama `/api/generate` protocol —
/// `useApi = false` in `NewJob`/`LlmConfig`.
pub struct OllamaClient {
    http: reqwest::Client,
    model: String,
    base_url: String,
}

impl OllamaClient {
    pub fn new(model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            model: model.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str, temperature: f64, _max_tokens: u32) -> Result<String, ResilienceError> {
        let resp = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
                "options": {"temperature": temperature},
            }))
            .send()
            .await
            .map_err(|e| ResilienceError::Transient(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_http_error(status, body));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ResilienceError::Transient(e.to_string()))?;

        body["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ResilienceError::Permanent("no response field from Ollama".to_string()))
    }
}

/// 4xx other than 429 is permanent (bad request/auth); everything else —
/// timeouts, 5xx, 429 — is transient and eligible for the circuit breaker's
/// retry loop.
fn classify_http_error(status: reqwest::StatusCode, body: String) -> ResilienceError {
    if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
        ResilienceError::Permanent(format!("{}: {}", status, body))
    } else {
        ResilienceError::Transient(format!("{}: {}", status, body))
    }
}

/// Wraps any `LLMClient` with a circuit breaker, per SPEC_FULL.md §6's
/// implementation note.
pub struct ResilientLLMClient {
    inner: Arc<dyn LLMClient>,
    breaker: CircuitBreaker,
}

impl ResilientLLMClient {
    pub fn new(inner: Arc<dyn LLMClient>, timeout: Duration) -> Self {
        let config = CircuitBreakerConfig {
            failure_threshold: 5,
            success_threshold: 2,
            cooldown: timeout.max(Duration::from_secs(30)),
            ..Default::default()
        };
        Self {
            inner,
            breaker: CircuitBreaker::new(config),
        }
    }
}

#[async_trait]
impl LLMClient for ResilientLLMClient {
    async fn generate(&self, prompt: &str, temperature: f64, max_tokens: u32) -> Result<String, ResilienceError> {
        let inner = self.inner.clone();
        let prompt = prompt.to_string();
        self.breaker
            .execute(|| {
                let inner = inner.clone();
                let prompt = prompt.clone();
                async move { inner.generate(&prompt, temperature, max_tokens).await }
            })
            .await
    }
}
