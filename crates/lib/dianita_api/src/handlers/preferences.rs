//! Preference request handlers.

use axum::Json;
use axum::extract::State;

use dianita_core::preferences;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::models::{SetThemeRequest, ThemeResponse};

/// `GET /preferences` — the caller's theme, seeded with the default on
/// first read.
pub async fn get_theme_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<CurrentUser>,
) -> AppResult<Json<ThemeResponse>> {
    let theme = preferences::get_or_init_theme(&state.pool, &user.id).await?;
    Ok(Json(ThemeResponse { theme }))
}

/// `PUT /preferences` — replace the caller's theme document wholesale.
pub async fn set_theme_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<CurrentUser>,
    Json(body): Json<SetThemeRequest>,
) -> AppResult<Json<ThemeResponse>> {
    if !body.theme.is_object() {
        return Err(AppError::Validation("Invalid payload".into()));
    }

    let theme = preferences::replace_theme(&state.pool, &user.id, &body.theme).await?;
    Ok(Json(ThemeResponse { theme }))
}
