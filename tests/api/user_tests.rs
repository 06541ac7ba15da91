//! User API Tests

use axum::http::StatusCode;
use serde_json::json;

use crate::common::{unique_alias, TestApp};

#[tokio::test]
async fn test_register_and_get_user() {
    let app = TestApp::new().await;
    let alias = unique_alias();

    app.register(&alias).await;
    let (status, body) = app.get(&format!("/api/v1/users/{alias}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alias"], alias.as_str());
}

#[tokio::test]
async fn test_register_taken_alias_conflicts() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let (status, _) = app
        .post_json("/api/v1/users", json!({ "alias": "alice" }))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_whitespace() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post_json("/api/v1/users", json!({ "alias": "al ice" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/v1/users/nobody").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 10001);
}

#[tokio::test]
async fn test_register_rejects_reserved_aliases() {
    let app = TestApp::new().await;

    for alias in ["ALL", "*"] {
        let (status, _) = app
            .post_json("/api/v1/users", json!({ "alias": alias }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "alias {alias}");
    }
}
