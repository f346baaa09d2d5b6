//! Backend for Groq's OpenAI-compatible chat completions API.
//!
//! Endpoint: `{base_url}/v1/chat/completions`, non-streaming only. The same
//! wire shape is spoken by OpenAI, Together, Mistral, Fireworks, vLLM and
//! llama.cpp servers, so [`GroqBackend`] works against any of them by
//! pointing `base_url` elsewhere.

use super::{Backend, Completion, CompletionRequest};
use crate::error::{GenerateError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Default base URL for Groq's OpenAI-compatible API.
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai";

/// Backend for any OpenAI-compatible chat completions endpoint.
///
/// # Example
///
/// ```
/// use flowpiper::backend::GroqBackend;
///
/// let anonymous = GroqBackend::new();
/// let with_key = GroqBackend::new().with_api_key("gsk_...");
/// ```
#[derive(Clone, Default)]
pub struct GroqBackend {
    /// Optional API key. If set, sent as `Authorization: Bearer {key}`.
    /// Without a key the provider rejects the call with its own auth error,
    /// which surfaces to the caller unchanged.
    api_key: Option<String>,
}

impl std::fmt::Debug for GroqBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqBackend")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|k| {
                    if k.len() > 6 {
                        format!("{}***", &k[..6])
                    } else {
                        "***".to_string()
                    }
                }),
            )
            .finish()
    }
}

impl GroqBackend {
    /// Create a backend without authentication.
    pub fn new() -> Self {
        Self { api_key: None }
    }

    /// Set the API key for authentication.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Returns `true` if an API key has been configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the request body for `/v1/chat/completions`.
    ///
    /// Always exactly two messages: the system role carries the grammar
    /// documentation, the user role carries the scenario. `stream` is pinned
    /// to `false` — downstream fence extraction wants the complete text.
    fn build_body(request: &CompletionRequest) -> Value {
        json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
            "temperature": request.config.temperature,
            "top_p": request.config.top_p,
            "max_tokens": request.config.max_tokens,
            "stream": false,
            "stop": request.config.stop,
        })
    }

    /// Parse a `Retry-After` header value as seconds.
    fn parse_retry_after(value: &str) -> Option<std::time::Duration> {
        value
            .trim()
            .parse::<u64>()
            .ok()
            .map(std::time::Duration::from_secs)
    }

    /// Build the reqwest request with the auth header when configured.
    fn build_http_request(
        &self,
        client: &Client,
        url: &str,
        body: &Value,
    ) -> reqwest::RequestBuilder {
        let mut req = client.post(url).json(body);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        req
    }

    /// Extract provider metadata worth logging (token usage, model, id).
    fn extract_metadata(json_resp: &Value) -> Option<Value> {
        let mut meta = serde_json::Map::new();
        for field in ["usage", "model", "id"] {
            if let Some(v) = json_resp.get(field) {
                meta.insert(field.into(), v.clone());
            }
        }
        if meta.is_empty() {
            None
        } else {
            Some(Value::Object(meta))
        }
    }
}

#[async_trait]
impl Backend for GroqBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &CompletionRequest,
    ) -> Result<Completion> {
        let base = base_url.trim_end_matches('/');
        let url = format!("{}/v1/chat/completions", base);
        let body = Self::build_body(request);

        let resp = self.build_http_request(client, &url, &body).send().await?;

        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(Self::parse_retry_after);
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerateError::HttpError {
                status,
                body: text,
                retry_after,
            });
        }

        let json_resp: Value = resp.json().await?;

        let text = json_resp
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        Ok(Completion {
            text,
            status,
            metadata: Self::extract_metadata(&json_resp),
        })
    }

    fn name(&self) -> &'static str {
        "groq"
    }
}
