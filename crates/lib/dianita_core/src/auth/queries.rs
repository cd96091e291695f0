//! User and refresh-token database queries.

use uuid::Uuid;

use super::AuthError;
use crate::models::auth::UserRow;
use crate::uuid::uuidv7;
use sqlx::PgPool;

/// Fetch a user by email.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, AuthError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, name, image, password_hash FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Fetch a user by id.
pub async fn get_user_by_id(pool: &PgPool, user_id: &Uuid) -> Result<Option<UserRow>, AuthError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, name, image, password_hash FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Create a credential-based user.
///
/// Duplicate emails surface as a unique-constraint violation inside
/// `AuthError::DbError`; callers map that to their conflict error. No
/// existence pre-check: the unique index on `email` is the arbiter under
/// concurrent registration.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: Option<&str>,
    password_hash: &str,
) -> Result<UserRow, AuthError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) \
         RETURNING id, email, name, image, password_hash",
    )
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Idempotent per-request identity upsert.
///
/// If a user with this email exists, the profile fields are refreshed from
/// the credential's claims — COALESCE keeps the stored value whenever a
/// claim is absent. If none exists, a user with a null password hash is
/// created. The unique index on `email` resolves concurrent first-requests
/// to a single row.
pub async fn upsert_user(
    pool: &PgPool,
    email: &str,
    name: Option<&str>,
    image: Option<&str>,
) -> Result<UserRow, AuthError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (email, name, image) VALUES ($1, $2, $3) \
         ON CONFLICT (email) DO UPDATE \
         SET name = COALESCE(excluded.name, users.name), \
             image = COALESCE(excluded.image, users.image), \
             updated_at = now() \
         RETURNING id, email, name, image, password_hash",
    )
    .bind(email)
    .bind(name)
    .bind(image)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Store a refresh token hash.
pub async fn store_refresh_token(
    pool: &PgPool,
    token_hash: &str,
    user_id: &Uuid,
    expires_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), AuthError> {
    sqlx::query(
        "INSERT INTO refresh_tokens (id, token_hash, user_id, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(uuidv7())
    .bind(token_hash)
    .bind(user_id)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Find a valid, non-revoked, non-expired refresh token. Returns (token_id, user_id).
pub async fn find_valid_refresh_token(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<(Uuid, Uuid)>, AuthError> {
    let row = sqlx::query_as::<_, (Uuid, Uuid)>(
        "SELECT rt.id, rt.user_id \
         FROM refresh_tokens rt \
         WHERE rt.token_hash = $1 \
           AND rt.revoked_at IS NULL \
           AND rt.expires_at > now()",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Revoke a refresh token by ID.
pub async fn revoke_refresh_token(pool: &PgPool, token_id: &Uuid) -> Result<(), AuthError> {
    sqlx::query("UPDATE refresh_tokens SET revoked_at = now() WHERE id = $1")
        .bind(token_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Revoke a refresh token by hash.
pub async fn revoke_refresh_token_by_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<(), AuthError> {
    sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = now() \
         WHERE token_hash = $1 AND revoked_at IS NULL",
    )
    .bind(token_hash)
    .execute(pool)
    .await?;
    Ok(())
}
