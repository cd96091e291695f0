//! Authentication service — register/login/refresh/logout flows delegating
//! to `dianita_core::auth`.

use chrono::{Duration, Utc};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::info;

use dianita_core::auth::{AuthError, jwt, password, queries};
use dianita_core::models::auth::UserRow;

use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, LogoutResponse, TokenResponse};

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = jwt::ACCESS_TOKEN_EXPIRY_SECS;

/// Refresh token lifetime: 30 days.
const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

/// Lowercase, trimmed canonical form of an email address.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration input rules: both fields present, password long enough.
fn validate_registration(email: &str, password: &str) -> Result<(), AppError> {
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required.".into(),
        ));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(
            "Password must be at least 8 characters.".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Refresh token generation & hashing
// ---------------------------------------------------------------------------

/// Generate a cryptographically random refresh token (64 alphanumeric chars).
fn generate_refresh_token() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// SHA-256 hash a refresh token for storage.
fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Token issuance
// ---------------------------------------------------------------------------

/// Issue an access/refresh pair for a user and persist the refresh hash.
async fn issue_tokens(
    pool: &PgPool,
    user: &UserRow,
    jwt_secret: &[u8],
) -> AppResult<TokenResponse> {
    let access_token = jwt::generate_access_token(
        &user.id.to_string(),
        &user.email,
        user.name.as_deref(),
        user.image.as_deref(),
        jwt_secret,
    )
    .map_err(AppError::from)?;

    let refresh_token = generate_refresh_token();
    let token_hash = hash_refresh_token(&refresh_token);
    let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);
    queries::store_refresh_token(pool, &token_hash, &user.id, expires_at).await?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
        expires_in: ACCESS_TOKEN_EXPIRY_SECS,
        token_type: "Bearer".to_string(),
        user: AuthUser {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        },
    })
}

// ---------------------------------------------------------------------------
// Public auth operations
// ---------------------------------------------------------------------------

/// Register a new credential-based account.
///
/// The duplicate check is the unique index on `email`: a violation maps to
/// 409 so concurrent registrations of the same address cannot both win.
pub async fn register(
    pool: &PgPool,
    email: &str,
    password: &str,
    name: Option<&str>,
    jwt_secret: &[u8],
) -> AppResult<TokenResponse> {
    let email = normalize_email(email);
    validate_registration(&email, password)?;

    let name = name.map(str::trim).filter(|n| !n.is_empty());
    let pw_hash = password::hash_password(password)?;

    let user = match queries::create_user(pool, &email, name, &pw_hash).await {
        Ok(user) => user,
        Err(AuthError::DbError(e))
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation()) =>
        {
            return Err(AppError::Conflict(
                "An account with this email already exists.".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    info!(email = %user.email, "registered new user");
    issue_tokens(pool, &user, jwt_secret).await
}

/// Authenticate with email + password.
///
/// Unknown email, a credential-less account, and a wrong password all
/// collapse to the same generic error so accounts cannot be enumerated.
pub async fn login(
    pool: &PgPool,
    email: &str,
    password: &str,
    jwt_secret: &[u8],
) -> AppResult<TokenResponse> {
    let email = normalize_email(email);

    let user = match queries::find_user_by_email(pool, &email).await? {
        None => return Err(AppError::Unauthorized("Invalid credentials".into())),
        Some(u) => u,
    };

    let pw_hash = match &user.password_hash {
        None => return Err(AppError::Unauthorized("Invalid credentials".into())),
        Some(h) => h.clone(),
    };

    if !password::verify_password(password, &pw_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    issue_tokens(pool, &user, jwt_secret).await
}

/// Refresh an access token using a refresh token (single-use rotation).
pub async fn refresh(
    pool: &PgPool,
    refresh_token: &str,
    jwt_secret: &[u8],
) -> AppResult<TokenResponse> {
    let token_hash = hash_refresh_token(refresh_token);

    let row = queries::find_valid_refresh_token(pool, &token_hash).await?;
    let (token_id, user_id) = match row {
        None => return Err(AppError::Unauthorized("Invalid refresh token".into())),
        Some(r) => r,
    };

    // Revoke before reissuing; the old token never works twice.
    queries::revoke_refresh_token(pool, &token_id).await?;

    let user = queries::get_user_by_id(pool, &user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    issue_tokens(pool, &user, jwt_secret).await
}

/// Logout — revoke a specific refresh token.
pub async fn logout(pool: &PgPool, refresh_token: Option<&str>) -> AppResult<LogoutResponse> {
    if let Some(token) = refresh_token {
        let token_hash = hash_refresh_token(token);
        queries::revoke_refresh_token_by_hash(pool, &token_hash).await?;
    }
    Ok(LogoutResponse { success: true })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }

    #[test]
    fn registration_requires_both_fields() {
        assert!(matches!(
            validate_registration("", "x"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_registration("a@b.com", ""),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn registration_rejects_short_passwords() {
        assert!(matches!(
            validate_registration("a@b.com", "short"),
            Err(AppError::Validation(_))
        ));
        assert!(validate_registration("a@b.com", "long enough").is_ok());
    }

    #[test]
    fn refresh_tokens_hash_deterministically() {
        let token = generate_refresh_token();
        assert_eq!(token.len(), 64);
        assert_eq!(hash_refresh_token(&token), hash_refresh_token(&token));
        assert_ne!(hash_refresh_token(&token), token);
    }
}
