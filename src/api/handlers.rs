//! HTTP request handlers

use super::types::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse};
use super::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::Instrument;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/chat",
            post(send_chat)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route("/health", get(health))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Rejected chat request body");
        AppError::BadRequest("Invalid request body")
    })?;

    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or(AppError::BadRequest("Message is required"))?;

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);

    async move {
        // Detached; the tracker behind the watcher is drained at shutdown
        state.leads.observe(&message);

        match state.orchestrator.respond(&message).await {
            Ok(reply) => Ok(Json(ChatResponse { reply })),
            Err(e) => {
                tracing::error!(error = %e, "Chat request failed");
                Err(AppError::Upstream)
            }
        }
    }
    .instrument(span)
    .await
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

// ============================================================
// Health
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        scheduling_tier: state.scheduling_tier,
    })
}

// ============================================================
// Error Handling
// ============================================================

/// Client-visible failures. Messages are fixed strings; details stay in logs.
#[derive(Debug)]
enum AppError {
    BadRequest(&'static str),
    MethodNotAllowed,
    Upstream,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
            AppError::Upstream => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to get response from AI",
            ),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
