//! The request orchestrator.
//!
//! [`Generator`] glues the completion backend, the fence extractor and the
//! diagram renderer into one request cycle:
//!
//! ```text
//! scenario ──► system+user prompt ──► Backend ──► first fenced block
//!          ──► Renderer (blocking pool) ──► PNG ──► base64 ──► GeneratedDiagram
//! ```
//!
//! Construction is explicit: everything the orchestrator needs — credential,
//! model, backend, renderer, HTTP client — is injected up front, so tests
//! swap in [`MockBackend`](crate::backend::MockBackend) and
//! [`MockRenderer`](crate::render::MockRenderer) without touching the
//! environment.

use crate::backend::{
    self, Backend, BackoffConfig, CompletionConfig, CompletionRequest, GroqBackend,
};
use crate::backend::groq::GROQ_BASE_URL;
use crate::config::{AppConfig, DEFAULT_MODEL};
use crate::error::{GenerateError, Result};
use crate::extract;
use crate::grammar;
use crate::render::{self, Renderer, SchematicRenderer};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// The three-field result of one generate cycle.
#[derive(Debug, Clone)]
pub struct GeneratedDiagram {
    /// Base64-encoded PNG rendering.
    pub image: String,
    /// The PiperFlow notation extracted from the completion.
    pub notation: String,
    /// The BPMN 2.0 XML document.
    pub bpmn_xml: String,
}

/// Orchestrates one scenario → diagram request cycle.
///
/// Stateless across requests: the only data shared between concurrent calls
/// is immutable (the precomputed system message, the configuration, and the
/// `Arc`-held collaborators).
pub struct Generator {
    client: Client,
    backend: Arc<dyn Backend>,
    renderer: Arc<dyn Renderer>,
    base_url: String,
    model: String,
    completion: CompletionConfig,
    backoff: BackoffConfig,
    system: String,
}

impl Generator {
    /// Create a new builder targeting the default provider.
    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder {
            client: None,
            backend: None,
            renderer: None,
            api_key: None,
            base_url: GROQ_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            completion: CompletionConfig::default(),
            backoff: BackoffConfig::none(),
            timeout: None,
        }
    }

    /// Build a generator from startup configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut builder = Self::builder()
            .base_url(&config.base_url)
            .model(&config.model)
            .timeout(config.timeout);
        if let Some(ref key) = config.api_key {
            builder = builder.api_key(key);
        }
        builder.build()
    }

    /// The system message sent on every completion call. Prompt-independent.
    pub fn system_message(&self) -> &str {
        &self.system
    }

    /// Run one full generate cycle for a scenario description.
    pub async fn generate(&self, scenario: &str) -> Result<GeneratedDiagram> {
        let request = CompletionRequest {
            model: self.model.clone(),
            system: self.system.clone(),
            user: grammar::user_message(scenario),
            config: self.completion.clone(),
        };

        let completion = backend::with_backoff(
            &self.backend,
            &self.client,
            &self.base_url,
            &request,
            &self.backoff,
        )
        .await?;

        tracing::debug!(
            backend = self.backend.name(),
            status = completion.status,
            chars = completion.text.len(),
            "completion received"
        );
        tracing::debug!(completion = %completion.text, "raw completion text");
        if let Some(ref metadata) = completion.metadata {
            tracing::debug!(metadata = %metadata, "completion metadata");
        }

        let notation =
            extract::first_fenced_block(&completion.text).ok_or(GenerateError::MissingNotation)?;
        tracing::debug!(notation = %notation, "extracted notation");

        // Rendering is CPU-bound; keep it off the async worker threads.
        let renderer = Arc::clone(&self.renderer);
        let rendered = {
            let notation = notation.clone();
            tokio::task::spawn_blocking(move || renderer.render(&notation))
                .await
                .map_err(|e| GenerateError::Other(format!("render task failed: {e}")))??
        };

        let png = render::encode_png(&rendered.image)?;

        Ok(GeneratedDiagram {
            image: BASE64.encode(png),
            notation,
            bpmn_xml: rendered.bpmn_xml,
        })
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("backend", &self.backend.name())
            .field("renderer", &self.renderer.name())
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// Builder for [`Generator`].
pub struct GeneratorBuilder {
    client: Option<Client>,
    backend: Option<Arc<dyn Backend>>,
    renderer: Option<Arc<dyn Renderer>>,
    api_key: Option<String>,
    base_url: String,
    model: String,
    completion: CompletionConfig,
    backoff: BackoffConfig,
    timeout: Option<Duration>,
}

impl GeneratorBuilder {
    /// Set the HTTP client. If not set, a default client with the configured
    /// timeout is created.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the completion backend. Default: [`GroqBackend`] with the builder's
    /// API key (if any). An explicit backend wins over `api_key`.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the diagram renderer. Default: [`SchematicRenderer`].
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Set the completion API credential for the default backend.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the completion provider base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the completion model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling configuration. Default: deterministic
    /// (temperature 0, top_p 1).
    pub fn completion_config(mut self, config: CompletionConfig) -> Self {
        self.completion = config;
        self
    }

    /// Set the transport retry configuration. Default: [`BackoffConfig::none()`].
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = config;
        self
    }

    /// Set the request timeout for the default HTTP client. Default: 60 seconds.
    /// Ignored when a custom client is supplied via [`client`](Self::client).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the generator. The system message is computed here, once.
    pub fn build(self) -> Generator {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(60));
        let client = self.client.unwrap_or_else(|| {
            Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client")
        });
        let backend = self.backend.unwrap_or_else(|| {
            let mut groq = GroqBackend::new();
            if let Some(key) = self.api_key {
                groq = groq.with_api_key(key);
            }
            Arc::new(groq)
        });
        Generator {
            client,
            backend,
            renderer: self.renderer.unwrap_or_else(|| Arc::new(SchematicRenderer::new())),
            base_url: self.base_url,
            model: self.model,
            completion: self.completion,
            backoff: self.backoff,
            system: grammar::system_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::render::MockRenderer;

    const NOTATION: &str = "title: T\nlane: L\n(start) as s\n(end) as e\ns->e";

    fn completion_with_block() -> String {
        format!("Here is your process:\n```\n{NOTATION}\n```\nAnything else?")
    }

    #[test]
    fn test_system_message_fixed_across_instances() {
        let a = Generator::builder().build();
        let b = Generator::builder().model("other-model").build();
        assert_eq!(a.system_message(), b.system_message());
        assert_eq!(a.system_message(), grammar::system_message());
    }

    #[tokio::test]
    async fn test_generate_happy_path() {
        let backend = Arc::new(MockBackend::fixed(completion_with_block()));
        let renderer = Arc::new(MockRenderer::fixed());
        let generator = Generator::builder()
            .backend(backend.clone())
            .renderer(renderer.clone())
            .build();

        let diagram = generator.generate("a scenario").await.unwrap();

        assert_eq!(diagram.notation, NOTATION);
        assert_eq!(diagram.bpmn_xml, "<bpmn/>");
        let expected_png =
            crate::render::encode_png(&image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255])))
                .unwrap();
        assert_eq!(diagram.image, BASE64.encode(expected_png));
        assert_eq!(backend.calls(), 1);
        assert_eq!(renderer.calls(), 1);
    }

    #[tokio::test]
    async fn test_generate_fails_without_block_and_skips_render() {
        let backend = Arc::new(MockBackend::fixed("no fence in this completion"));
        let renderer = Arc::new(MockRenderer::fixed());
        let generator = Generator::builder()
            .backend(backend.clone())
            .renderer(renderer.clone())
            .build();

        let err = generator.generate("a scenario").await.unwrap_err();
        assert!(matches!(err, GenerateError::MissingNotation));
        assert_eq!(renderer.calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_uses_first_block_only() {
        let backend = Arc::new(MockBackend::fixed(
            "```\nfirst block\n```\nor maybe:\n```\nsecond block\n```",
        ));
        let renderer = Arc::new(MockRenderer::fixed());
        let generator = Generator::builder()
            .backend(backend)
            .renderer(renderer.clone())
            .build();

        let diagram = generator.generate("a scenario").await.unwrap();
        assert_eq!(diagram.notation, "first block");
        assert_eq!(renderer.notations(), vec!["first block"]);
    }

    #[tokio::test]
    async fn test_generate_through_schematic_renderer() {
        let backend = Arc::new(MockBackend::fixed(completion_with_block()));
        let generator = Generator::builder().backend(backend).build();

        let diagram = generator.generate("a scenario").await.unwrap();
        assert!(diagram.bpmn_xml.contains("<bpmn:startEvent"));
        assert!(!diagram.image.is_empty());
    }

    #[tokio::test]
    async fn test_generate_surfaces_render_syntax_error() {
        let backend = Arc::new(MockBackend::fixed("```\nthis is not piperflow\n```"));
        let generator = Generator::builder().backend(backend).build();

        let err = generator.generate("a scenario").await.unwrap_err();
        assert!(matches!(err, GenerateError::Syntax { .. }));
    }

    #[test]
    fn test_debug_has_no_secrets() {
        let generator = Generator::builder().api_key("gsk_supersecret").build();
        let debug_output = format!("{:?}", generator);
        assert!(!debug_output.contains("supersecret"));
    }
}
