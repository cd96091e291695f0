//! Chat turn handler.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::CurrentUser;
use crate::models::{ChatReplyResponse, SendMessageRequest};
use crate::services::chat;

/// `POST /chat` — append a message to an owned chat and return the
/// assistant reply with its sources.
pub async fn send_message_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<CurrentUser>,
    Json(body): Json<SendMessageRequest>,
) -> AppResult<Json<ChatReplyResponse>> {
    let (reply, sources) = chat::append_turn(
        &state.pool,
        state.provider.as_ref(),
        &user.id,
        &body.chat_id,
        &body.message,
        body.web_search,
    )
    .await?;

    Ok(Json(ChatReplyResponse { reply, sources }))
}
