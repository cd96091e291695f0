//! Authentication middleware — session credential verification plus the
//! per-request identity upsert.
//!
//! The credential is taken from `Authorization: Bearer <token>` or, for
//! browser requests, the `dianita_access` cookie. Once the JWT checks out,
//! the email claim is resolved to a durable user row in a single atomic
//! upsert: an existing row gets its name/image refreshed from the claims
//! (absent claims never erase stored values), a missing row is created
//! with a null password hash.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use dianita_core::auth::jwt::verify_access_token;
use dianita_core::auth::queries;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::ACCESS_COOKIE;

/// The resolved caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

/// Pull the raw token out of the Authorization header or the access cookie.
fn extract_token(request: &Request) -> Option<String> {
    if let Some(header) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        return header.strip_prefix("Bearer ").map(str::to_string);
    }
    let jar = CookieJar::from_headers(request.headers());
    jar.get(ACCESS_COOKIE).map(|c| c.value().to_string())
}

/// Axum middleware: verifies the session JWT, upserts the user, and injects
/// [`CurrentUser`] into request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&request)
        .ok_or_else(|| AppError::Unauthorized("Missing session credential".into()))?;

    let claims = verify_access_token(&token, state.config.jwt_secret.as_bytes())
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))?;

    let email = claims.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::Unauthorized("Token carries no identity".into()));
    }

    let user = queries::upsert_user(
        &state.pool,
        &email,
        claims.name.as_deref(),
        claims.picture.as_deref(),
    )
    .await?;

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        email: user.email,
        name: user.name,
    });

    Ok(next.run(request).await)
}
