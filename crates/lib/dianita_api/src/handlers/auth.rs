//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    LoginRequest, LogoutRequest, LogoutResponse, RefreshRequest, RegisterRequest, TokenResponse,
};
use crate::services::{auth, cookies};

/// Attach the token pair as httpOnly cookies for browser clients; API
/// clients read the JSON body instead.
fn with_auth_cookies(jar: CookieJar, resp: &TokenResponse) -> CookieJar {
    jar.add(cookies::access_cookie(
        &resp.access_token,
        auth::ACCESS_TOKEN_EXPIRY_SECS,
    ))
    .add(cookies::refresh_cookie(&resp.refresh_token))
}

/// `POST /auth/register` — create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let resp = auth::register(
        &state.pool,
        &body.email,
        &body.password,
        body.name.as_deref(),
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    let jar = with_auth_cookies(jar, &resp);
    Ok((jar, Json(resp)))
}

/// `POST /auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let resp = auth::login(
        &state.pool,
        &body.email,
        &body.password,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    let jar = with_auth_cookies(jar, &resp);
    Ok((jar, Json(resp)))
}

/// `POST /auth/refresh` — exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RefreshRequest>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let resp = auth::refresh(
        &state.pool,
        &body.refresh_token,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    let jar = with_auth_cookies(jar, &resp);
    Ok((jar, Json(resp)))
}

/// `POST /auth/logout` — revoke a refresh token and clear auth cookies.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LogoutRequest>,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    // Fall back to the cookie so browser logouts work with an empty body.
    let from_cookie = jar
        .get(cookies::REFRESH_COOKIE)
        .map(|c| c.value().to_string());
    let token = body.refresh_token.or(from_cookie);

    let resp = auth::logout(&state.pool, token.as_deref()).await?;

    let jar = jar
        .add(cookies::clear_access_cookie())
        .add(cookies::clear_refresh_cookie());
    Ok((jar, Json(resp)))
}
