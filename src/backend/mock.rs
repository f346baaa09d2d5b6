//! Mock backend for testing without a live completion API.
//!
//! [`MockBackend`] returns pre-configured responses in order and counts how
//! many calls it has served, so tests can assert both on generated output
//! and on "no external call was attempted" paths.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::Client;

use super::{Backend, Completion, CompletionRequest};
use crate::error::Result;

/// A test backend that returns canned completion texts in order.
///
/// Cycles back to the beginning when all responses have been consumed.
#[derive(Debug)]
pub struct MockBackend {
    responses: Vec<String>,
    index: AtomicUsize,
    calls: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend with the given canned responses.
    ///
    /// Responses are returned in order. When exhausted, cycles from the beginning.
    pub fn new(responses: Vec<String>) -> Self {
        assert!(
            !responses.is_empty(),
            "MockBackend requires at least one response"
        );
        Self {
            responses,
            index: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Number of completion calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn next_response(&self) -> String {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.responses.len();
        self.responses[idx].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        _base_url: &str,
        _request: &CompletionRequest,
    ) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(Completion {
            text: self.next_response(),
            status: 200,
            metadata: None,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CompletionConfig;

    fn test_request() -> CompletionRequest {
        CompletionRequest {
            model: "test".to_string(),
            system: "sys".to_string(),
            user: "usr".to_string(),
            config: CompletionConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_mock_fixed_response() {
        let mock = MockBackend::fixed("```\ntitle: T\n```");
        let client = Client::new();
        let resp = mock
            .complete(&client, "http://unused", &test_request())
            .await
            .unwrap();
        assert_eq!(resp.text, "```\ntitle: T\n```");
        assert_eq!(resp.status, 200);
    }

    #[tokio::test]
    async fn test_mock_cycles_responses() {
        let mock = MockBackend::new(vec!["first".into(), "second".into()]);
        let client = Client::new();
        let request = test_request();
        let r1 = mock.complete(&client, "http://unused", &request).await.unwrap();
        let r2 = mock.complete(&client, "http://unused", &request).await.unwrap();
        let r3 = mock.complete(&client, "http://unused", &request).await.unwrap();
        assert_eq!(r1.text, "first");
        assert_eq!(r2.text, "second");
        assert_eq!(r3.text, "first"); // cycles
    }

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let mock = MockBackend::fixed("x");
        assert_eq!(mock.calls(), 0);
        let client = Client::new();
        let request = test_request();
        mock.complete(&client, "http://unused", &request).await.unwrap();
        mock.complete(&client, "http://unused", &request).await.unwrap();
        assert_eq!(mock.calls(), 2);
    }
}
