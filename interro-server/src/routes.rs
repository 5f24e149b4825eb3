//! Axum route handlers for the interrogation server.
//!
//! # Routes
//!
//! - `GET  /`                      : service identity
//! - `GET  /health`                : `{"status": "ok", "service": ...}`
//! - `POST /chat`                  : `{message, session_id}` → `{text, agent, emotion}`
//! - `GET  /sessions/:id/history`  : stored turns of one session

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::orchestrator::Orchestrator;
use crate::session::SessionStore;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Dialogue pipeline.
    pub orchestrator: Arc<Orchestrator>,
    /// Per-session conversation state.
    pub sessions: Arc<SessionStore>,
    /// Reported by the health endpoints.
    pub service_name: Arc<str>,
}

impl AppState {
    /// Bundle the pieces.
    #[must_use]
    pub fn new(orchestrator: Orchestrator, sessions: SessionStore, service_name: &str) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            sessions: Arc::new(sessions),
            service_name: Arc::from(service_name),
        }
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Witness text, or the silence sentinel.
    pub message: String,
    /// Conversation key.
    pub session_id: String,
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/sessions/:id/history", get(history_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health: liveness probe.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": &*state.service_name,
    }))
}

/// POST /chat: one witness message.
async fn chat_handler(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> impl IntoResponse {
    let reply = state
        .orchestrator
        .handle(&state.sessions, &req.session_id, &req.message)
        .await;
    Json(reply)
}

/// GET /sessions/:id/history: debugging aid.
async fn history_handler(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.sessions.get(&id) {
        Some(session) => {
            let session = session.lock().await;
            (StatusCode::OK, Json(json!(session.history.turns()))).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown session: {id}") })),
        )
            .into_response(),
    }
}
