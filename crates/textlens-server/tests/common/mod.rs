//! Shared helpers for server integration tests.
//!
//! Each test gets a file-backed SQLite database in a tempdir: pooled
//! `:memory:` connections would each see their own empty database.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use textlens_server::config::Config;
use textlens_server::{app, AppState};
use tower::ServiceExt;

pub fn test_app() -> (Router, TempDir) {
    test_app_with_config(Config::default())
}

pub fn test_app_with_config(config: Config) -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let db_path = dir.path().join("test.db");
    let pool = textlens_db::create_pool(
        db_path.to_str().expect("tempdir path is not utf-8"),
        textlens_db::DbRuntimeSettings {
            busy_timeout_ms: 5_000,
            pool_max_size: 2,
        },
    )
    .expect("failed to create pool");

    {
        let conn = pool.get().expect("failed to get connection");
        textlens_db::run_migrations(&conn).expect("failed to run migrations");
    }

    (app(AppState::new(pool, &config)), dir)
}

/// Sends a request and returns status plus parsed JSON body.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is not json")
    };
    (status, value)
}

/// Registers a user and logs in, returning the session token.
pub async fn register_and_login(app: &Router, email: &str, password: &str) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/api/auth/register",
        Some(json!({ "email": email, "password": password })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        Some(json!({ "email": email, "password": password })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"]
        .as_str()
        .expect("login response missing token")
        .to_string()
}
