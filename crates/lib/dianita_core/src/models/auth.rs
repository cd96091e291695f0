//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API wire models
//! (which carry `#[serde(rename)]` for camelCase etc.).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user row as stored in the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    /// Present only for credential-based accounts.
    pub password_hash: Option<String>,
}

/// JWT claims embedded in access tokens.
///
/// `name` and `picture` mirror what an identity provider would supply;
/// absence of either must not erase the stored profile fields on upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — user ID (standard JWT `sub` claim).
    pub sub: String,
    /// User email.
    pub email: String,
    /// Display name, when known.
    pub name: Option<String>,
    /// Avatar reference, when known.
    pub picture: Option<String>,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}
