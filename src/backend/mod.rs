//! Backend trait and normalized request/response types.
//!
//! The [`Backend`] trait abstracts over chat-completion providers,
//! translating between the normalized [`CompletionRequest`]/[`Completion`]
//! types and the provider's HTTP API. Built-in implementations:
//! [`GroqBackend`] (any OpenAI-compatible endpoint) and [`MockBackend`]
//! (canned responses for tests).
//!
//! ```text
//! Generator ──► CompletionRequest ──► Backend::complete() ──► Completion
//!                                            │
//!                                 ┌──────────┴──────────┐
//!                             GroqBackend          MockBackend
//!                        /v1/chat/completions     canned responses
//! ```

pub mod backoff;
pub mod groq;
pub mod mock;

pub use backoff::BackoffConfig;
pub use groq::GroqBackend;
pub use mock::MockBackend;

use crate::error::{GenerateError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

/// Sampling configuration for completion calls.
///
/// Defaults to deterministic sampling (temperature 0, nucleus mass 1): the
/// completion feeds an exact-syntax parser downstream, so repeated calls with
/// the same scenario should produce the same notation.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Sampling temperature. Default: 0.0.
    pub temperature: f64,

    /// Nucleus sampling mass. Default: 1.0.
    pub top_p: f64,

    /// Maximum tokens to generate. `None` leaves the provider default.
    pub max_tokens: Option<u32>,

    /// Stop sequences. Default: none.
    pub stop: Option<Vec<String>>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: None,
            stop: None,
        }
    }
}

impl CompletionConfig {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A normalized completion request — provider-agnostic, single-turn.
///
/// [`Generator`](crate::generator::Generator) builds this from the grammar
/// constant and the caller's scenario; the [`Backend`] translates it into the
/// provider-specific HTTP request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier (e.g. `"llama3-70b-8192"`).
    pub model: String,

    /// System-role content: the instruction preamble plus grammar doc.
    pub system: String,

    /// User-role content: the instruction preamble plus scenario text.
    pub user: String,

    /// Sampling configuration.
    pub config: CompletionConfig,
}

/// A normalized completion response.
#[derive(Debug)]
pub struct Completion {
    /// The generated text content.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific metadata (token counts, model info).
    /// Stored as raw JSON — each provider returns different fields.
    pub metadata: Option<serde_json::Value>,
}

/// Abstraction over chat-completion providers.
///
/// Implementors translate between the normalized
/// [`CompletionRequest`]/[`Completion`] pair and the provider's HTTP API.
/// Streaming is deliberately absent: every call in this service is a
/// non-streaming, single-turn completion.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute a non-streaming completion call.
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &CompletionRequest,
    ) -> Result<Completion>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Check whether a [`GenerateError`] is retryable based on the backoff config.
///
/// Retryable conditions:
/// - [`GenerateError::HttpError`] with a status in `config.retryable_statuses`
/// - [`GenerateError::Request`] (connection/transport errors)
pub fn is_retryable(error: &GenerateError, config: &BackoffConfig) -> bool {
    match error {
        GenerateError::HttpError { status, .. } => config.retryable_statuses.contains(status),
        GenerateError::Request(_) => true,
        _ => false,
    }
}

/// Execute a backend call with transport-level retry and exponential backoff.
///
/// With [`BackoffConfig::none()`] (the default throughout this crate) the
/// call is made exactly once and any failure surfaces directly. With retries
/// configured, transient failures (429, 5xx, connection errors) are retried
/// with increasing delays, honoring `Retry-After` when the provider sends it.
pub async fn with_backoff(
    backend: &Arc<dyn Backend>,
    client: &Client,
    base_url: &str,
    request: &CompletionRequest,
    config: &BackoffConfig,
) -> Result<Completion> {
    let mut last_error: Option<GenerateError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = match &last_error {
                Some(GenerateError::HttpError {
                    retry_after: Some(ra),
                    ..
                }) if config.respect_retry_after => *ra,
                _ => config.delay_for_attempt(attempt - 1),
            };
            tracing::warn!(
                backend = backend.name(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %last_error.as_ref().map(|e| e.to_string()).unwrap_or_default(),
                "retrying completion call"
            );
            tokio::time::sleep(delay).await;
        }

        match backend.complete(client, base_url, request).await {
            Ok(completion) => return Ok(completion),
            Err(e) => {
                if attempt < config.max_retries && is_retryable(&e, config) {
                    last_error = Some(e);
                    continue;
                }
                return Err(e);
            }
        }
    }

    // Should not reach here, but just in case
    Err(last_error
        .unwrap_or_else(|| GenerateError::Other("backoff loop exited unexpectedly".into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_config_deterministic_defaults() {
        let config = CompletionConfig::default();
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.top_p, 1.0);
        assert!(config.max_tokens.is_none());
        assert!(config.stop.is_none());
    }

    #[test]
    fn test_completion_config_builder() {
        let config = CompletionConfig::default()
            .with_temperature(0.2)
            .with_top_p(0.9)
            .with_max_tokens(1024);
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.top_p, 0.9);
        assert_eq!(config.max_tokens, Some(1024));
    }

    #[test]
    fn test_is_retryable_429() {
        let config = BackoffConfig::standard();
        let err = GenerateError::HttpError {
            status: 429,
            body: "rate limited".into(),
            retry_after: None,
        };
        assert!(is_retryable(&err, &config));
    }

    #[test]
    fn test_is_retryable_503() {
        let config = BackoffConfig::standard();
        let err = GenerateError::HttpError {
            status: 503,
            body: "service unavailable".into(),
            retry_after: None,
        };
        assert!(is_retryable(&err, &config));
    }

    #[test]
    fn test_is_retryable_401_not_retried() {
        // Auth failures are fatal until configuration is fixed.
        let config = BackoffConfig::standard();
        let err = GenerateError::HttpError {
            status: 401,
            body: "invalid api key".into(),
            retry_after: None,
        };
        assert!(!is_retryable(&err, &config));
    }

    #[test]
    fn test_is_retryable_missing_notation_not_retried() {
        let config = BackoffConfig::standard();
        assert!(!is_retryable(&GenerateError::MissingNotation, &config));
    }

    #[tokio::test]
    async fn test_with_backoff_passes_through_success() {
        let backend: Arc<dyn Backend> = Arc::new(MockBackend::fixed("ok"));
        let client = Client::new();
        let request = CompletionRequest {
            model: "test".into(),
            system: "sys".into(),
            user: "usr".into(),
            config: CompletionConfig::default(),
        };
        let completion = with_backoff(
            &backend,
            &client,
            "http://unused",
            &request,
            &BackoffConfig::none(),
        )
        .await
        .unwrap();
        assert_eq!(completion.text, "ok");
    }
}
