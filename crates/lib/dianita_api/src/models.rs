//! API wire models.
//!
//! All JSON field names are camelCase to match the web client.

use chrono::{DateTime, Utc};
use dianita_core::chats::{ChatMessageRow, ChatSessionRow};
use dianita_core::provider::Source;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error payload returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

/// Token pair issued by login/register/refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub user: AuthUser,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Chats
// ---------------------------------------------------------------------------

/// A chat session as the client sees it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChatSessionRow> for ChatBody {
    fn from(row: ChatSessionRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A chat message as the client sees it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub id: Uuid,
    pub role: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessageRow> for MessageBody {
    fn from(row: ChatMessageRow) -> Self {
        Self {
            id: row.id,
            role: row.role,
            text: row.text,
            sources: row
                .sources
                .and_then(|v| serde_json::from_value::<Vec<Source>>(v).ok()),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatListResponse {
    pub chats: Vec<ChatBody>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub chat: ChatBody,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<MessageBody>,
}

/// Rename payload. `title` is kept loose so a non-string value maps to a
/// validation error instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RenameChatRequest {
    pub title: Option<serde_json::Value>,
}

/// `POST /chat` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_id: Uuid,
    pub message: String,
    #[serde(default)]
    pub web_search: bool,
}

/// `POST /chat` response.
#[derive(Debug, Serialize)]
pub struct ChatReplyResponse {
    pub reply: String,
    pub sources: Vec<Source>,
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// Theme payload. The value is kept loose so a non-object maps to a
/// validation error.
#[derive(Debug, Deserialize)]
pub struct SetThemeRequest {
    pub theme: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ThemeResponse {
    pub theme: serde_json::Value,
}
