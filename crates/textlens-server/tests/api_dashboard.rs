mod common;

use axum::http::StatusCode;
use common::{register_and_login, send, test_app};
use serde_json::json;

#[tokio::test]
async fn dashboard_starts_empty() {
    let (app, _dir) = test_app();
    let token = register_and_login(&app, "fresh@example.com", "secret123").await;

    let (status, body) = send(&app, "GET", "/api/dashboard", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["stats"]["total_analyses"], 0);
    assert_eq!(data["stats"]["total_favorites"], 0);
    assert_eq!(data["stats"]["success_rate"], 0);
    assert_eq!(data["stats"]["api_used"], 0);
    assert_eq!(data["stats"]["api_limit"], 100);
    assert_eq!(data["trends"].as_array().unwrap().len(), 30);
    assert!(data["keywords"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn dashboard_aggregates_activity() {
    let (app, _dir) = test_app();
    let token = register_and_login(&app, "busy@example.com", "secret123").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/analyze",
        Some(json!({ "content": "Compilers parse syntax. Compilers emit code." })),
        Some(&token),
    )
    .await;
    let analysis_id = body["id"].as_str().unwrap().to_string();
    send(
        &app,
        "POST",
        "/api/analyze",
        Some(json!({ "content": "Parsers and compilers again." })),
        Some(&token),
    )
    .await;
    send(
        &app,
        "POST",
        "/api/favorites",
        Some(json!({ "analysis_id": analysis_id })),
        Some(&token),
    )
    .await;

    let (status, body) = send(&app, "GET", "/api/dashboard", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];

    assert_eq!(data["stats"]["total_analyses"], 2);
    assert_eq!(data["stats"]["total_favorites"], 1);
    assert_eq!(data["stats"]["success_rate"], 100);
    assert_eq!(data["stats"]["analyses_growth"], 100);
    assert_eq!(data["stats"]["api_used"], 2);

    // Both analyses landed today.
    let trends = data["trends"].as_array().unwrap();
    assert_eq!(trends.len(), 30);
    assert_eq!(trends.last().unwrap()["count"], 2);

    assert_eq!(data["sources"]["text"], 2);

    let keywords = data["keywords"].as_array().unwrap();
    assert_eq!(keywords[0]["keyword"], "compilers");
    assert_eq!(keywords[0]["count"], 2);
}

#[tokio::test]
async fn dashboard_is_per_user() {
    let (app, _dir) = test_app();
    let active = register_and_login(&app, "active@example.com", "secret123").await;
    let idle = register_and_login(&app, "idle@example.com", "secret123").await;

    send(
        &app,
        "POST",
        "/api/analyze",
        Some(json!({ "content": "Only the active user analyzed." })),
        Some(&active),
    )
    .await;

    let (_, body) = send(&app, "GET", "/api/dashboard", None, Some(&idle)).await;
    assert_eq!(body["data"]["stats"]["total_analyses"], 0);
}
