//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ChatResponse, ErrorResponse, SendMessageRequest, SessionView};
use super::AppState;
use crate::notify::OutboundMessage;
use crate::runtime::InboundMessage;
use crate::user::ChatId;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/messages", post(send_message))
        .route("/api/chats/:chat_id", get(get_chat))
        .route("/api/chats/:chat_id/events", get(stream_chat))
        .route("/version", get(get_version))
        .with_state(state)
}

fn chat_id(raw: i64) -> Result<ChatId, AppError> {
    if raw > 0 {
        Ok(ChatId(raw))
    } else {
        Err(AppError::BadRequest(format!("invalid chat id [{raw}]")))
    }
}

// ============================================================
// Messages
// ============================================================

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<OutboundMessage>, AppError> {
    let chat_id = chat_id(req.chat_id)?;
    let reply = state
        .dispatcher
        .handle(InboundMessage {
            chat_id,
            first_name: req.first_name,
            text: req.text,
        })
        .await;
    Ok(Json(OutboundMessage::new(chat_id, reply)))
}

// ============================================================
// Chat inspection
// ============================================================

async fn load_chat(state: &AppState, chat_id: ChatId) -> Result<ChatResponse, AppError> {
    let user = state
        .dispatcher
        .users()
        .get(chat_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("chat [{chat_id}] not found")))?;
    let session = state
        .dispatcher
        .timers()
        .active(chat_id)
        .await
        .map(|s| SessionView::at(s, chrono::Utc::now()));
    Ok(ChatResponse { user, session })
}

async fn get_chat(
    State(state): State<AppState>,
    Path(raw): Path<i64>,
) -> Result<Json<ChatResponse>, AppError> {
    let chat_id = chat_id(raw)?;
    Ok(Json(load_chat(&state, chat_id).await?))
}

async fn stream_chat(
    State(state): State<AppState>,
    Path(raw): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let chat_id = chat_id(raw)?;
    // Subscribe before the snapshot so nothing falls in between
    let rx = state.broadcast.subscribe();
    let init = load_chat(&state, chat_id).await?;
    Ok(sse_stream(chat_id, init, rx))
}

async fn get_version() -> &'static str {
    concat!("horae ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
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
