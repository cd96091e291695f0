//! Per-user preference persistence.
//!
//! One theme document per user, stored as an open-ended jsonb field bag.
//! Writes replace the whole document; partial merging is a client concern.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// The theme every user starts with.
pub fn default_theme() -> serde_json::Value {
    json!({
        "appText": "#FFFFFF",
        "panelBg": "#09090B",
        "panelBorder": "rgba(255,255,255,0.15)",
        "userBubbleBg": "#27272A",
        "assistantBubbleBg": "#18181B",
        "inputBg": "#18181B",
        "inputBorder": "rgba(255,255,255,0.15)",
        "userText": "#FFFFFF",
        "assistantText": "#FFFFFF",
        "inputText": "#FFFFFF",
        "placeholderText": "rgba(255,255,255,0.55)",
    })
}

/// Fetch the user's theme, lazily seeding the default on first read.
///
/// The no-op `DO UPDATE` makes the statement return the stored row either
/// way; the unique index on `user_id` collapses concurrent first reads to
/// a single row.
pub async fn get_or_init_theme(
    pool: &PgPool,
    user_id: &Uuid,
) -> Result<serde_json::Value, sqlx::Error> {
    sqlx::query_scalar::<_, serde_json::Value>(
        r#"
        INSERT INTO user_preferences (user_id, theme)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET user_id = excluded.user_id
        RETURNING theme
        "#,
    )
    .bind(user_id)
    .bind(default_theme())
    .fetch_one(pool)
    .await
}

/// Replace the user's theme document wholesale. First call creates,
/// subsequent calls overwrite; fields absent from `theme` are gone.
pub async fn replace_theme(
    pool: &PgPool,
    user_id: &Uuid,
    theme: &serde_json::Value,
) -> Result<serde_json::Value, sqlx::Error> {
    sqlx::query_scalar::<_, serde_json::Value>(
        r#"
        INSERT INTO user_preferences (user_id, theme)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET theme = excluded.theme, updated_at = now()
        RETURNING theme
        "#,
    )
    .bind(user_id)
    .bind(theme)
    .fetch_one(pool)
    .await
}
