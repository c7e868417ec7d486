mod common;

use axum::http::StatusCode;
use common::{send, test_app, test_app_with_config};
use textlens_server::config::Config;

#[tokio::test]
async fn health_reports_status_and_ai_state() {
    let (app, _dir) = test_app();

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_seconds"].is_u64());
    assert_eq!(body["ai"]["configured"], false);
    assert!(body["ai"]["providers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_lists_configured_providers() {
    let mut config = Config::default();
    config.ai.moonshot_api_key = Some("sk-test".to_string());
    let (app, _dir) = test_app_with_config(config);

    let (_, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(body["ai"]["configured"], true);
    assert_eq!(body["ai"]["providers"][0], "moonshot");
}
