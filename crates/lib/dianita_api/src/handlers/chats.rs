//! Chat session request handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use dianita_core::chats;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::models::{ChatBody, ChatListResponse, ChatResponse, MessageListResponse, RenameChatRequest};
use crate::services::chat;

/// `GET /chats` — list the caller's chats, most recently active first.
pub async fn list_chats_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<CurrentUser>,
) -> AppResult<Json<ChatListResponse>> {
    let rows = chats::list_chats(&state.pool, &user.id).await?;
    Ok(Json(ChatListResponse {
        chats: rows.into_iter().map(ChatBody::from).collect(),
    }))
}

/// `POST /chats` — create a chat with the default title.
pub async fn create_chat_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<CurrentUser>,
) -> AppResult<Json<ChatResponse>> {
    let row = chats::create_chat(&state.pool, &user.id).await?;
    Ok(Json(ChatResponse {
        chat: ChatBody::from(row),
    }))
}

/// `PUT /chats/{id}` — rename an owned chat.
pub async fn rename_chat_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<RenameChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let title = body
        .title
        .as_ref()
        .and_then(|t| t.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Invalid payload".into()))?;

    let row = chats::rename_chat(&state.pool, &user.id, &id, title)
        .await?
        .ok_or_else(|| AppError::NotFound("Chat not found".into()))?;

    Ok(Json(ChatResponse {
        chat: ChatBody::from(row),
    }))
}

/// `DELETE /chats/{id}` — delete an owned chat; messages cascade.
pub async fn delete_chat_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let deleted = chats::delete_chat(&state.pool, &user.id, &id).await?;
    if !deleted {
        return Err(AppError::NotFound("Chat not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /chats/{id}/messages` — full ordered history of an owned chat.
pub async fn list_messages_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageListResponse>> {
    let rows = chat::get_history(&state.pool, &user.id, &id).await?;
    Ok(Json(MessageListResponse {
        messages: rows.into_iter().map(Into::into).collect(),
    }))
}
