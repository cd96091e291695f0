//! Chat session and message persistence.
//!
//! Every query that touches a chat on behalf of a user filters by
//! `(id, user_id)` in one statement. A chat that exists under a different
//! owner is indistinguishable from one that does not exist at all.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::uuid::uuidv7;

/// Title given to freshly created chats.
pub const DEFAULT_CHAT_TITLE: &str = "New chat";

/// Row returned by chat session queries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatSessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row returned by message queries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatMessageRow {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub role: String,
    pub text: String,
    pub sources: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Reduced `{role, text}` view used to build provider input.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TurnRow {
    pub role: String,
    pub text: String,
}

/// List chats for a user, most recently active first.
pub async fn list_chats(pool: &PgPool, user_id: &Uuid) -> Result<Vec<ChatSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, ChatSessionRow>(
        r#"
        SELECT id, user_id, title, created_at, updated_at
        FROM chat_sessions
        WHERE user_id = $1
        ORDER BY updated_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Create a new chat with the default title.
pub async fn create_chat(pool: &PgPool, user_id: &Uuid) -> Result<ChatSessionRow, sqlx::Error> {
    sqlx::query_as::<_, ChatSessionRow>(
        r#"
        INSERT INTO chat_sessions (id, user_id, title)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, title, created_at, updated_at
        "#,
    )
    .bind(uuidv7())
    .bind(user_id)
    .bind(DEFAULT_CHAT_TITLE)
    .fetch_one(pool)
    .await
}

/// Get a chat by ID, scoped to its owner. `None` covers both a missing id
/// and an id owned by someone else.
pub async fn get_owned_chat(
    pool: &PgPool,
    user_id: &Uuid,
    chat_id: &Uuid,
) -> Result<Option<ChatSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, ChatSessionRow>(
        r#"
        SELECT id, user_id, title, created_at, updated_at
        FROM chat_sessions
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(chat_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Rename a chat. Returns `None` when the chat is missing or foreign-owned.
pub async fn rename_chat(
    pool: &PgPool,
    user_id: &Uuid,
    chat_id: &Uuid,
    title: &str,
) -> Result<Option<ChatSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, ChatSessionRow>(
        r#"
        UPDATE chat_sessions
        SET title = $1, updated_at = now()
        WHERE id = $2 AND user_id = $3
        RETURNING id, user_id, title, created_at, updated_at
        "#,
    )
    .bind(title)
    .bind(chat_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Delete a chat (messages cascade).
pub async fn delete_chat(
    pool: &PgPool,
    user_id: &Uuid,
    chat_id: &Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM chat_sessions WHERE id = $1 AND user_id = $2")
        .bind(chat_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Append one message to a chat.
///
/// Callers must have resolved ownership via `get_owned_chat` first; this
/// function trusts its `chat_id`.
pub async fn append_message(
    pool: &PgPool,
    chat_id: &Uuid,
    role: &str,
    text: &str,
    sources: Option<&serde_json::Value>,
) -> Result<ChatMessageRow, sqlx::Error> {
    sqlx::query_as::<_, ChatMessageRow>(
        r#"
        INSERT INTO chat_messages (id, chat_id, role, text, sources)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, chat_id, role, text, sources, created_at
        "#,
    )
    .bind(uuidv7())
    .bind(chat_id)
    .bind(role)
    .bind(text)
    .bind(sources)
    .fetch_one(pool)
    .await
}

/// Touch a chat's updated_at so it resurfaces at the top of `list_chats`.
pub async fn touch_chat(pool: &PgPool, chat_id: &Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE chat_sessions SET updated_at = now() WHERE id = $1")
        .bind(chat_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Get all messages for a chat, oldest first.
///
/// `created_at` carries the order; the UUIDv7 id breaks same-timestamp ties
/// deterministically.
pub async fn list_messages(
    pool: &PgPool,
    chat_id: &Uuid,
) -> Result<Vec<ChatMessageRow>, sqlx::Error> {
    sqlx::query_as::<_, ChatMessageRow>(
        r#"
        SELECT id, chat_id, role, text, sources, created_at
        FROM chat_messages
        WHERE chat_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(chat_id)
    .fetch_all(pool)
    .await
}

/// Get the most recent `limit` messages for a chat, reduced to
/// `{role, text}` and reordered oldest-to-newest.
pub async fn recent_turns(
    pool: &PgPool,
    chat_id: &Uuid,
    limit: i64,
) -> Result<Vec<TurnRow>, sqlx::Error> {
    let mut rows = sqlx::query_as::<_, TurnRow>(
        r#"
        SELECT role, text
        FROM chat_messages
        WHERE chat_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(chat_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.reverse();
    Ok(rows)
}
