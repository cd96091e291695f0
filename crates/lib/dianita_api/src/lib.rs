//! # dianita_api
//!
//! HTTP API library for Dianita.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use dianita_core::provider::CompletionProvider;

use crate::config::ApiConfig;
use crate::handlers::{auth, chat, chats, preferences};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
    /// Completion provider used by the chat endpoint.
    pub provider: Arc<dyn CompletionProvider>,
}

/// Run embedded database migrations.
///
/// Delegates to `dianita_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    dianita_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no session required)
    let public = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Session routes (auth middleware resolves the caller)
    let session = Router::new()
        .route("/chat", post(chat::send_message_handler))
        .route("/chats", get(chats::list_chats_handler))
        .route("/chats", post(chats::create_chat_handler))
        .route("/chats/{id}", put(chats::rename_chat_handler))
        .route("/chats/{id}", delete(chats::delete_chat_handler))
        .route("/chats/{id}/messages", get(chats::list_messages_handler))
        .route("/preferences", get(preferences::get_theme_handler))
        .route("/preferences", put(preferences::set_theme_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    Router::new()
        .merge(public)
        .merge(session)
        .layer(cors)
        .with_state(state)
}
