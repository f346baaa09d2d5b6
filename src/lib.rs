//! # flowpiper
//!
//! An HTTP service that turns plain-English business process descriptions
//! into PiperFlow notation and rendered BPMN diagrams, using a hosted LLM
//! completion API for the translation step.
//!
//! One request cycle:
//!
//! - **[`grammar`]** — the PiperFlow syntax documentation, sent as the system
//!   message on every call.
//! - **[`backend`]** — the [`Backend`] trait over chat-completion providers;
//!   [`GroqBackend`] speaks the OpenAI-compatible wire format,
//!   [`MockBackend`] serves tests.
//! - **[`extract`]** — fenced code block extraction from the completion text.
//! - **[`render`]** — the [`Renderer`] trait; [`SchematicRenderer`] parses
//!   the notation ([`piperflow`]) and produces BPMN 2.0 XML plus a
//!   deterministic schematic PNG.
//! - **[`generator`]** — [`Generator`] orchestrates the cycle and encodes
//!   the image to base64.
//! - **[`server`]** — the axum router: `GET /` and `POST /generate/`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use flowpiper::{config::AppConfig, generator::Generator, server};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let generator = Arc::new(Generator::from_config(&config));
//!     let app = server::router(generator, config.index_path.clone());
//!
//!     let listener = tokio::net::TcpListener::bind(config.addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without external services
//!
//! Both collaborators sit behind object-safe traits, so the whole endpoint
//! runs against stubs:
//!
//! ```
//! use flowpiper::backend::MockBackend;
//! use flowpiper::generator::Generator;
//! use flowpiper::render::MockRenderer;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let generator = Generator::builder()
//!     .backend(Arc::new(MockBackend::fixed("```\ntitle: T\nlane: L\n(start) as s\n(end) as e\ns->e\n```")))
//!     .renderer(Arc::new(MockRenderer::fixed()))
//!     .build();
//!
//! let diagram = generator.generate("describe a search flow").await.unwrap();
//! assert_eq!(diagram.bpmn_xml, "<bpmn/>");
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod extract;
pub mod generator;
pub mod grammar;
pub mod piperflow;
pub mod render;
pub mod server;

pub use backend::{Backend, BackoffConfig, CompletionConfig, GroqBackend, MockBackend};
pub use config::AppConfig;
pub use error::{GenerateError, Result};
pub use generator::{GeneratedDiagram, Generator};
pub use render::{MockRenderer, RenderOutput, Renderer, SchematicRenderer};
