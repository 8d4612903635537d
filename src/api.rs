// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// HTTP boundary
//
// Responsibilities:
// - Request body parsing and validation (JSON, non-empty text)
// - Credential resolution and upstream request construction
// - One streaming session per request, rendered as an SSE response
// - Heartbeat endpoint
// - 404 for unknown paths

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::StreamExt;
use serde::Deserialize;

use crate::config::Config;
use crate::credentials::{resolve_credentials, AiConfig, CredentialError, CredentialRequest};
use crate::prompt::{clean_text, DiagramType, PromptBuilder};
use crate::stream::SessionController;
use crate::upstream::{build_chat_request, HttpSender};

/// Largest request body accepted.
const MAX_REQUEST_BYTES: usize = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Request / error types
// ---------------------------------------------------------------------------

/// Body of `POST /api/generate-mermaid`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub text: String,
    pub diagram_type: Option<String>,
    pub ai_config: Option<AiConfig>,
    pub access_password: Option<String>,
    pub selected_model: Option<String>,
}

/// Errors returned before the SSE stream starts.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("request body is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("please provide text content")]
    MissingText,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("error while processing request: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::EmptyBody | ApiError::MalformedJson(_) | ApiError::MissingText => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Credential(CredentialError::InvalidPassword) => StatusCode::UNAUTHORIZED,
            ApiError::Credential(CredentialError::Incomplete) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state injected into axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub prompts: Arc<dyn PromptBuilder>,
    pub sessions: Arc<SessionController>,
}

impl AppState {
    pub fn new(config: Config, sender: Arc<dyn HttpSender>, prompts: Arc<dyn PromptBuilder>) -> Self {
        let sessions = Arc::new(SessionController::new(sender, config.stream.clone()));
        Self {
            config: Arc::new(config),
            prompts,
            sessions,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Heartbeat endpoint: GET /v1/heartbeat -> 200 OK
pub async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

/// Generation endpoint: POST /api/generate-mermaid -> SSE event stream.
///
/// Validation and credential failures answer with a JSON error before any
/// stream is opened; everything after that is reported in-stream.
pub async fn generate_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, ApiError> {
    let body = axum::body::to_bytes(request.into_body(), MAX_REQUEST_BYTES)
        .await
        .map_err(|e| ApiError::MalformedJson(format!("failed to read request body: {e}")))?;

    if body.is_empty() {
        return Err(ApiError::EmptyBody);
    }
    let payload: GenerateRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::MalformedJson(e.to_string()))?;

    // Checked after cleaning: whitespace-only text counts as missing.
    let text = clean_text(&payload.text);
    if text.is_empty() {
        return Err(ApiError::MissingText);
    }

    let credentials = resolve_credentials(
        &CredentialRequest {
            ai_config: payload.ai_config.as_ref(),
            access_password: payload.access_password.as_deref(),
            selected_model: payload.selected_model.as_deref(),
        },
        &state.config.upstream,
        state.config.access_password.as_deref(),
    )
    .inspect_err(|e| tracing::warn!(error = %e, "credential resolution failed"))?;

    let diagram_type = DiagramType::parse(payload.diagram_type.as_deref());
    let system_prompt = state.prompts.system_prompt(&diagram_type);

    let upstream_request = build_chat_request(
        &credentials,
        &system_prompt,
        &text,
        state.config.upstream.timeout_ms,
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(
        model = %credentials.model_name,
        url = %upstream_request.url,
        diagram_type = diagram_type.as_str(),
        text_len = text.len(),
        "starting generation"
    );

    let events = state.sessions.spawn(upstream_request);
    let body = Body::from_stream(events.map(|event| Ok::<Bytes, Infallible>(event.to_sse_bytes())));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("x-accel-buffering", "no")
        .body(body)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "unknown path" })),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the axum router with the generation route and the heartbeat
/// endpoint. All collaborators arrive through `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/heartbeat", get(heartbeat))
        .route("/api/generate-mermaid", post(generate_handler))
        .fallback(not_found)
        .with_state(state)
}
