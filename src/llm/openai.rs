//! OpenAI-compatible chat-completions client.
//!
//! Works against any server implementing the OpenAI chat completions API:
//! OpenAI itself, OpenRouter, vLLM, llama.cpp server, Ollama. Requests are
//! non-streaming; transient failures are retried with capped exponential
//! backoff before the error reaches the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tokio::time::Instant;

use crate::config::LlmConfig;
use crate::error::{Result, ScryError};
use crate::llm::backend::{GenerationBackend, GenerationRequest};

/// Total attempts per call, including the first.
const RETRY_ATTEMPTS: u32 = 3;
/// Backoff before the second attempt; doubles for each further attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);
/// Fraction of the backoff delay added or removed at random, so retries
/// from concurrent stages do not land on the provider in lockstep.
const RETRY_JITTER: f64 = 0.2;

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key sent as a Bearer token. Empty skips the Authorization
    /// header, which local servers accept.
    pub api_key: String,
    /// Base URL without the `/chat/completions` suffix, e.g.
    /// `https://api.openai.com/v1`.
    pub base_url: String,
    /// Model name to request.
    pub model: String,
    /// Default sampling temperature.
    pub temperature: f64,
    /// Default response token cap.
    pub max_tokens: usize,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_owned(),
            model: model.into(),
            temperature: 0.3,
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&LlmConfig> for OpenAiConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

/// Generation client for OpenAI-compatible endpoints.
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keep the API key out of logs.
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`ScryError::Config`] if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScryError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Create a client from the application config section.
    ///
    /// # Errors
    ///
    /// Returns [`ScryError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(OpenAiConfig::from(config))
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn send_once(&self, request: &GenerationRequest) -> Result<String> {
        let body = build_chat_request(&self.config, request);

        let mut http_request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&body);
        if !self.config.api_key.is_empty() {
            http_request = http_request.bearer_auth(&self.config.api_key);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                ScryError::Timeout(format!(
                    "generation call to '{}' timed out after {}s",
                    self.config.model,
                    self.config.timeout.as_secs()
                ))
            } else {
                ScryError::Request(format!("generation request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body_text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScryError::Parse(format!("decoding chat response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ScryError::Parse("chat response carried no message content".to_owned()))
    }
}

#[async_trait]
impl GenerationBackend for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let started = Instant::now();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(request).await {
                Ok(text) => {
                    tracing::debug!(
                        model = %self.config.model,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        chars = text.len(),
                        "generation complete"
                    );
                    return Ok(text);
                }
                Err(err) if err.is_retryable() && attempt < RETRY_ATTEMPTS => {
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        model = %self.config.model,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "generation attempt failed; backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Build the JSON body for one chat-completions call. An empty system
/// prompt is omitted rather than sent as an empty message.
fn build_chat_request(config: &OpenAiConfig, request: &GenerationRequest) -> serde_json::Value {
    let mut messages = Vec::with_capacity(2);
    if !request.system.is_empty() {
        messages.push(serde_json::json!({
            "role": "system",
            "content": request.system,
        }));
    }
    messages.push(serde_json::json!({
        "role": "user",
        "content": request.user,
    }));

    serde_json::json!({
        "model": config.model,
        "messages": messages,
        "stream": false,
        "temperature": request.temperature.unwrap_or(config.temperature),
        "max_tokens": request.max_tokens.unwrap_or(config.max_tokens),
    })
}

/// Map an HTTP error status to the matching error class.
fn map_http_error(status: reqwest::StatusCode, body: &str) -> ScryError {
    let detail = extract_error_message(body);
    match status.as_u16() {
        401 | 403 => ScryError::Auth(format!("provider rejected credentials: {detail}")),
        429 => ScryError::RateLimited(format!("provider throttled the request: {detail}")),
        code => ScryError::Request(format!("provider returned HTTP {code}: {detail}")),
    }
}

/// Pull a human-readable message out of an OpenAI-style error body,
/// `{"error": {"message": "..."}}`, falling back to the raw body.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(message) = value["error"]["message"].as_str()
    {
        return message.to_owned();
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no error detail".to_owned()
    } else {
        let mut detail = trimmed.to_owned();
        if detail.len() > 200 {
            let cut = (0..=200)
                .rev()
                .find(|i| detail.is_char_boundary(*i))
                .unwrap_or(0);
            detail.truncate(cut);
        }
        detail
    }
}

/// Delay before the next attempt after `failed_attempts` failures:
/// doubles from [`RETRY_BASE_DELAY`], with [`RETRY_JITTER`] spread.
fn backoff_delay(failed_attempts: u32) -> Duration {
    let exponent = failed_attempts.saturating_sub(1).min(6);
    let base = RETRY_BASE_DELAY.as_secs_f64() * f64::from(1u32 << exponent);
    let spread = rand::thread_rng().gen_range(-RETRY_JITTER..=RETRY_JITTER);
    Duration::from_secs_f64(base * (1.0 + spread))
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
