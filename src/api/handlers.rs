//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::sse::{sse_stream, ChannelSink};
use super::types::{
    ChatRequest, CompleteResponse, CreateSessionResponse, ErrorResponse, PageResponse,
    SessionResponse, SuccessResponse,
};
use super::AppState;
use crate::conversation::Message;
use crate::session::{ReplyMode, ResponseSink, SessionError, SharedSession};
use crate::system_prompt::{
    connection_error_message, example_question, EXAMPLE_QUESTIONS, INPUT_PLACEHOLDER, PAGE_TITLE,
    WELCOME,
};
use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::mpsc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Root serves the page
        .route("/", get(serve_page))
        .route("/assets/*path", get(serve_static))
        // Page content
        .route("/api/page", get(page_content))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(end_session))
        // Turns
        .route("/api/sessions/:id/chat", post(stream_chat))
        .route("/api/sessions/:id/complete", post(complete_chat))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Page
// ============================================================

async fn serve_page() -> impl IntoResponse {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - page not found</h1>".to_string()),
        )
            .into_response(),
    }
}

async fn page_content() -> Json<PageResponse> {
    Json(PageResponse {
        title: PAGE_TITLE,
        welcome: WELCOME,
        placeholder: INPUT_PLACEHOLDER,
        examples: &EXAMPLE_QUESTIONS,
    })
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let id = state.sessions.create().await;
    Json(CreateSessionResponse { id })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, &id).await?;
    let messages = session.lock().await.messages().to_vec();
    Ok(Json(SessionResponse { id, messages }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.sessions.remove(&id).await {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(AppError::NotFound(format!("Session not found: {id}")))
    }
}

// ============================================================
// Turns
// ============================================================

/// Run a turn and stream its progress as SSE
async fn stream_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = resolve_input(req)?;
    let session = find_session(&state, &id).await?;

    let (tx, rx) = mpsc::channel(32);
    // Detached: the turn completes even if the client disconnects
    tokio::spawn(async move {
        let mut sink = ChannelSink::new(tx);
        let mut session = session.lock().await;
        if let Err(e) = session.ask(&input, ReplyMode::Stream, &mut sink).await {
            tracing::warn!(session_id = %id, error = %e, "Turn rejected");
            sink.error(&e.to_string()).await;
        }
    });

    Ok(sse_stream(rx))
}

/// Run a turn and return the whole reply at once
async fn complete_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<CompleteResponse>, AppError> {
    let input = resolve_input(req)?;
    let session = find_session(&state, &id).await?;

    let outcome = session
        .lock()
        .await
        .ask(&input, ReplyMode::Whole, &mut DiscardSink)
        .await?;

    Ok(Json(CompleteResponse {
        reply: outcome.reply,
        error: outcome.error.as_ref().map(connection_error_message),
    }))
}

/// A canned example counts as if the user had typed it
fn resolve_input(req: ChatRequest) -> Result<String, AppError> {
    if let Some(index) = req.example {
        return example_question(index)
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown example: {index}")));
    }
    match req.text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(SessionError::EmptyInput.into()),
    }
}

async fn find_session(state: &AppState, id: &str) -> Result<SharedSession, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

/// Sink for whole-reply turns; the JSON response carries the result
struct DiscardSink;

#[async_trait]
impl ResponseSink for DiscardSink {
    async fn user_turn(&mut self, _message: &Message) {}
    async fn partial(&mut self, _view: &str) {}
    async fn error(&mut self, _message: &str) {}
    async fn finished(&mut self, _message: &Message) {}
}

// ============================================================
// Version
// ============================================================

async fn get_version(State(state): State<AppState>) -> String {
    format!(
        "solartech {} ({})",
        env!("CARGO_PKG_VERSION"),
        state.model_id
    )
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
