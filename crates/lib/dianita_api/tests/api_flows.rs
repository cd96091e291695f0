//! Integration tests — ephemeral PostgreSQL, in-memory router calls, and a
//! scripted completion provider.
//!
//! Each test starts its own PostgreSQL instance via `DbManager::ephemeral()`
//! and skips cleanly when the PostgreSQL tooling is not on PATH.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use uuid::Uuid;

use dianita_api::{AppState, config::ApiConfig};
use dianita_core::db::DbManager;
use dianita_core::provider::{
    Completion, CompletionProvider, CompletionRequest, ProviderError, Source,
};

/// Scripted provider: a fixed reply and source list, or a hard failure.
#[derive(Clone, Default)]
struct FakeProvider {
    reply: Option<String>,
    sources: Vec<Source>,
    fail: bool,
}

#[async_trait]
impl CompletionProvider for FakeProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, ProviderError> {
        if self.fail {
            return Err(ProviderError::Request("connection refused".into()));
        }
        Ok(Completion {
            text: self.reply.clone(),
            sources: self.sources.clone(),
        })
    }
}

struct TestServer {
    db: DbManager,
    pool: sqlx::PgPool,
    app: Router,
}

/// Ephemeral PG + migrated schema + router. `None` when PG is unavailable.
async fn start_server(provider: FakeProvider) -> Option<TestServer> {
    let Ok(mut db) = DbManager::ephemeral().await else {
        eprintln!("skipping: PostgreSQL tooling not on PATH");
        return None;
    };
    db.setup().await.expect("db setup");
    db.start().await.expect("db start");

    let pool = sqlx::PgPool::connect(&db.connection_url())
        .await
        .expect("connect to ephemeral PG");
    dianita_api::migrate(&pool).await.expect("migrations");

    let state = AppState {
        pool: pool.clone(),
        config: ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            pg_connection_url: db.connection_url(),
            jwt_secret: "test-secret".into(),
            openai_api_key: String::new(),
            openai_model: "test-model".into(),
        },
        provider: Arc::new(provider),
    };

    let app = dianita_api::router(state);
    Some(TestServer { db, pool, app })
}

/// Fire one request at the router and return (status, parsed body).
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON")
    };
    (status, json)
}

/// Register an account and return its access token.
async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(serde_json::json!({"email": email, "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    body["accessToken"].as_str().expect("access token").to_string()
}

/// Create a chat and return its id.
async fn create_chat(app: &Router, token: &str) -> String {
    let (status, body) = send(app, "POST", "/chats", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chat"]["title"], "New chat");
    body["chat"]["id"].as_str().expect("chat id").to_string()
}

#[tokio::test]
async fn registration_validation_and_login() {
    let Some(mut server) = start_server(FakeProvider::default()).await else {
        return;
    };
    let app = &server.app;

    // Missing fields
    let (status, _) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(serde_json::json!({"email": "", "password": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Short password
    let (status, _) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(serde_json::json!({"email": "ana@example.com", "password": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Valid registration; email is stored lowercase
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(serde_json::json!({"email": "Ana@Example.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ana@example.com");
    assert_eq!(body["tokenType"], "Bearer");
    assert!(body["accessToken"].as_str().is_some());

    // Duplicate email
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(serde_json::json!({"email": "ana@example.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    // Wrong password and unknown email fail identically
    let (status, wrong_pw) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(serde_json::json!({"email": "ana@example.com", "password": "nope-nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, unknown) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(serde_json::json!({"email": "ghost@example.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw["message"], unknown["message"]);

    // Correct login works
    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(serde_json::json!({"email": "ana@example.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].as_str().is_some());

    // Session routes reject missing and garbage credentials
    let (status, _) = send(app, "GET", "/chats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(app, "GET", "/chats", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    server.db.stop().await.expect("db stop");
}

#[tokio::test]
async fn ownership_isolation_between_users() {
    let Some(mut server) = start_server(FakeProvider {
        reply: Some("pong".into()),
        ..Default::default()
    })
    .await
    else {
        return;
    };
    let app = &server.app;

    let token_a = register(app, "a@example.com").await;
    let token_b = register(app, "b@example.com").await;

    let chat_a = create_chat(app, &token_a).await;

    // B cannot see, rename, read, or append to A's chat — and the failure
    // is identical to a nonexistent id.
    let (status, body) = send(app, "GET", "/chats", Some(&token_b), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chats"].as_array().unwrap().len(), 0);

    let (status, foreign) = send(
        app,
        "PUT",
        &format!("/chats/{chat_a}"),
        Some(&token_b),
        Some(serde_json::json!({"title": "mine now"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let missing_id = Uuid::new_v4();
    let (status, missing) = send(
        app,
        "PUT",
        &format!("/chats/{missing_id}"),
        Some(&token_b),
        Some(serde_json::json!({"title": "mine now"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(foreign, missing);

    let (status, _) = send(
        app,
        "GET",
        &format!("/chats/{chat_a}/messages"),
        Some(&token_b),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app,
        "POST",
        "/chat",
        Some(&token_b),
        Some(serde_json::json!({"chatId": chat_a, "message": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app,
        "DELETE",
        &format!("/chats/{chat_a}"),
        Some(&token_b),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A still owns an untouched chat
    let (status, body) = send(
        app,
        "GET",
        &format!("/chats/{chat_a}/messages"),
        Some(&token_a),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"].as_array().unwrap().len(), 0);

    server.db.stop().await.expect("db stop");
}

#[tokio::test]
async fn append_turns_orders_history_and_reorders_chats() {
    let Some(mut server) = start_server(FakeProvider {
        reply: Some("pong".into()),
        sources: vec![
            Source {
                title: Some("T".into()),
                url: Some("a".into()),
            },
            Source {
                title: Some("T".into()),
                url: Some("a".into()),
            },
            Source {
                title: Some("".into()),
                url: Some("".into()),
            },
            Source {
                title: None,
                url: Some("b".into()),
            },
        ],
        fail: false,
    })
    .await
    else {
        return;
    };
    let app = &server.app;

    let token = register(app, "ana@example.com").await;
    let chat_1 = create_chat(app, &token).await;
    let chat_2 = create_chat(app, &token).await;

    // Empty utterance is rejected before any side effect
    let (status, _) = send(
        app,
        "POST",
        "/chat",
        Some(&token),
        Some(serde_json::json!({"chatId": chat_1, "message": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Two turns without search: no sources surface
    let (status, body) = send(
        app,
        "POST",
        "/chat",
        Some(&token),
        Some(serde_json::json!({"chatId": chat_1, "message": "first question"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["reply"], "pong");
    assert_eq!(body["sources"].as_array().unwrap().len(), 0);

    let (status, _) = send(
        app,
        "POST",
        "/chat",
        Some(&token),
        Some(serde_json::json!({"chatId": chat_1, "message": "second question"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // A search turn surfaces the deduplicated source list
    let (status, body) = send(
        app,
        "POST",
        "/chat",
        Some(&token),
        Some(serde_json::json!({
            "chatId": chat_1,
            "message": "third question",
            "webSearch": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["sources"],
        serde_json::json!([
            {"title": "T", "url": "a"},
            {"url": "b"}
        ])
    );

    // History alternates user/assistant in call order
    let (status, body) = send(
        app,
        "GET",
        &format!("/chats/{chat_1}/messages"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 6);
    let roles: Vec<&str> = messages.iter().map(|m| m["role"].as_str().unwrap()).collect();
    assert_eq!(
        roles,
        ["user", "assistant", "user", "assistant", "user", "assistant"]
    );
    assert_eq!(messages[0]["text"], "first question");
    assert_eq!(messages[2]["text"], "second question");
    assert_eq!(messages[4]["text"], "third question");
    // Sources persisted with the assistant turn that used search
    assert!(messages[3].get("sources").is_none());
    assert_eq!(messages[5]["sources"].as_array().unwrap().len(), 2);

    // The active chat resurfaces at the top of the list
    let (status, body) = send(app, "GET", "/chats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let chats: Vec<&str> = body["chats"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(chats, [chat_1.as_str(), chat_2.as_str()]);

    server.db.stop().await.expect("db stop");
}

#[tokio::test]
async fn provider_failure_keeps_the_user_message() {
    let Some(mut server) = start_server(FakeProvider {
        fail: true,
        ..Default::default()
    })
    .await
    else {
        return;
    };
    let app = &server.app;

    let token = register(app, "ana@example.com").await;
    let chat_id = create_chat(app, &token).await;

    let (status, body) = send(
        app,
        "POST",
        "/chat",
        Some(&token),
        Some(serde_json::json!({"chatId": chat_id, "message": "are you there?"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "provider_error");
    assert!(body["message"].as_str().unwrap().contains("connection refused"));

    // The utterance survived; no assistant message was appended.
    let (status, body) = send(
        app,
        "GET",
        &format!("/chats/{chat_id}/messages"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["text"], "are you there?");

    server.db.stop().await.expect("db stop");
}

#[tokio::test]
async fn theme_defaults_then_replaces_wholesale() {
    let Some(mut server) = start_server(FakeProvider::default()).await else {
        return;
    };
    let app = &server.app;

    let token = register(app, "ana@example.com").await;

    // First read seeds and returns the default
    let (status, body) = send(app, "GET", "/preferences", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["theme"]["panelBg"], "#09090B");
    assert_eq!(body["theme"].as_object().unwrap().len(), 11);

    // Non-object payloads are rejected
    let (status, _) = send(
        app,
        "PUT",
        "/preferences",
        Some(&token),
        Some(serde_json::json!({"theme": "dark"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Replace is wholesale, not a merge
    let (status, body) = send(
        app,
        "PUT",
        "/preferences",
        Some(&token),
        Some(serde_json::json!({"theme": {"appText": "#000"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["theme"], serde_json::json!({"appText": "#000"}));

    let (status, body) = send(app, "GET", "/preferences", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["theme"], serde_json::json!({"appText": "#000"}));

    // Seed and replace reused one row
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_preferences")
        .fetch_one(&server.pool)
        .await
        .expect("count preferences");
    assert_eq!(count, 1);

    server.db.stop().await.expect("db stop");
}

#[tokio::test]
async fn identity_upsert_is_idempotent() {
    let Some(mut server) = start_server(FakeProvider::default()).await else {
        return;
    };
    let app = &server.app;

    let token = register(app, "ana@example.com").await;

    // Every session request runs the identity upsert; none of them may
    // mint a second row for the same email.
    for _ in 0..3 {
        let (status, _) = send(app, "GET", "/chats", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind("ana@example.com")
        .fetch_one(&server.pool)
        .await
        .expect("count users");
    assert_eq!(count, 1);

    let id: uuid::Uuid = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind("ana@example.com")
        .fetch_one(&server.pool)
        .await
        .expect("user id");

    // Another authenticated request keeps the original id
    let (status, _) = send(app, "GET", "/preferences", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let id_after: uuid::Uuid = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind("ana@example.com")
        .fetch_one(&server.pool)
        .await
        .expect("user id");
    assert_eq!(id, id_after);

    server.db.stop().await.expect("db stop");
}

#[tokio::test]
async fn chat_rename_and_delete() {
    let Some(mut server) = start_server(FakeProvider::default()).await else {
        return;
    };
    let app = &server.app;

    let token = register(app, "ana@example.com").await;
    let chat_id = create_chat(app, &token).await;

    // Invalid payloads: empty and non-string titles
    let (status, _) = send(
        app,
        "PUT",
        &format!("/chats/{chat_id}"),
        Some(&token),
        Some(serde_json::json!({"title": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app,
        "PUT",
        &format!("/chats/{chat_id}"),
        Some(&token),
        Some(serde_json::json!({"title": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        app,
        "PUT",
        &format!("/chats/{chat_id}"),
        Some(&token),
        Some(serde_json::json!({"title": "Trip planning"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chat"]["title"], "Trip planning");

    let (status, _) = send(
        app,
        "DELETE",
        &format!("/chats/{chat_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        app,
        "GET",
        &format!("/chats/{chat_id}/messages"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.db.stop().await.expect("db stop");
}
