use std::time::Duration;
use thiserror::Error;

/// Errors produced while turning a scenario description into a diagram.
#[derive(Error, Debug)]
pub enum GenerateError {
    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error with status code, response body, and optional Retry-After hint.
    ///
    /// Returned by [`Backend`](crate::backend::Backend) implementations when
    /// the provider returns a non-success status code. The `retry_after` field
    /// is populated from the `Retry-After` response header when present.
    #[error("completion API returned HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 401, 429, 500).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// The completion text contained no fenced code block to use as notation.
    #[error("completion contained no fenced notation block")]
    MissingNotation,

    /// The notation was rejected by the PiperFlow parser.
    #[error("invalid notation at line {line}: {message}")]
    Syntax {
        /// 1-based line number within the notation text.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// Rendering failed for a reason other than notation syntax.
    #[error("render failed: {0}")]
    Render(String),

    /// PNG encoding of the rendered image failed.
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration detected at build time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for GenerateError {
    fn from(err: anyhow::Error) -> Self {
        GenerateError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GenerateError>;
