//! Backend-neutral generation interface.

use async_trait::async_trait;

use crate::error::Result;

/// A single generation request: a system prompt framing the task and a
/// user message carrying the material to work on.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System prompt. Omitted from the wire request when empty.
    pub system: String,
    /// User message.
    pub user: String,
    /// Sampling temperature override; `None` uses the backend default.
    pub temperature: Option<f64>,
    /// Response token cap override; `None` uses the backend default.
    pub max_tokens: Option<usize>,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A text-generation provider.
///
/// Implementations are shared behind an `Arc` and called concurrently;
/// request pacing is the caller's job (see [`crate::gate`]), retrying
/// transient failures is the implementation's.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short provider name for logging.
    fn name(&self) -> &str;

    /// Run one generation call and return the full response text.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider rejects the request, the call
    /// times out, or the response carries no usable content.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
