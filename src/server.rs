//! HTTP surface: the axum router, request/response DTOs, and error mapping.
//!
//! Two routes:
//! - `GET /` — the configured static document (404 when absent)
//! - `POST /generate/` — `{ "prompt": ... }` →
//!   `{ "pipeFlowImage", "pipeFlowText", "bpmnXml" }`
//!
//! CORS mirrors any origin/method/header and allows credentials — the
//! permissive posture expected of a demo deployment; scope it down before
//! exposing this beyond trusted networks.

use crate::error::GenerateError;
use crate::generator::Generator;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

/// Shared per-process state. Cheap to clone; everything inside is `Arc`ed.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<Generator>,
}

/// `POST /generate/` request body.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

/// `POST /generate/` success payload.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    #[serde(rename = "pipeFlowImage")]
    pub pipe_flow_image: String,
    #[serde(rename = "pipeFlowText")]
    pub pipe_flow_text: String,
    #[serde(rename = "bpmnXml")]
    pub bpmn_xml: String,
}

/// Build the application router.
pub fn router(generator: Arc<Generator>, index_path: PathBuf) -> Router {
    // Mirroring the request instead of `Any` is what lets credentials
    // coexist with a wildcard-equivalent policy.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .route_service("/", ServeFile::new(index_path))
        .route("/generate/", post(generate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { generator })
}

/// Handler for `POST /generate/`.
///
/// A body that fails to deserialize (missing or non-string `prompt`) is
/// rejected by the `Json` extractor with a client-error status before this
/// function — and therefore any external call — runs.
async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, GenerateError> {
    let diagram = state.generator.generate(&body.prompt).await?;
    Ok(Json(GenerateResponse {
        pipe_flow_image: diagram.image,
        pipe_flow_text: diagram.notation,
        bpmn_xml: diagram.bpmn_xml,
    }))
}

impl IntoResponse for GenerateError {
    fn into_response(self) -> Response {
        let status = match &self {
            // The upstream leg failed: transport, provider error, or a
            // completion with nothing extractable in it.
            GenerateError::Request(_)
            | GenerateError::HttpError { .. }
            | GenerateError::MissingNotation => StatusCode::BAD_GATEWAY,
            // The model produced notation the renderer rejects.
            GenerateError::Syntax { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GenerateError::Json(_)
            | GenerateError::Render(_)
            | GenerateError::Image(_)
            | GenerateError::InvalidConfig(_)
            | GenerateError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(status = %status, error = %self, "generate request failed");
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: GenerateError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_upstream_failures_map_to_bad_gateway() {
        assert_eq!(
            status_of(GenerateError::HttpError {
                status: 401,
                body: "invalid api key".into(),
                retry_after: None,
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_of(GenerateError::MissingNotation), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_bad_notation_maps_to_unprocessable() {
        assert_eq!(
            status_of(GenerateError::Syntax {
                line: 3,
                message: "unrecognized line".into(),
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_internal_faults_map_to_500() {
        assert_eq!(
            status_of(GenerateError::Render("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(GenerateError::InvalidConfig("bad".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_is_json() {
        let response = GenerateError::MissingNotation.into_response();
        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .unwrap();
        assert_eq!(content_type, "application/json");
    }
}
