//! Health Check API Tests

use axum::http::StatusCode;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health/live").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_readiness_reports_loaded_rooms() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["rooms"]["loaded"], 1);
    assert_eq!(body["checks"]["rooms"]["sequence_gaps"], 0);
    assert_eq!(body["checks"]["database"]["message"], "not configured");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new().await;
    app.register("alice").await;
    app.send("general", "alice", None, "hello").await;

    let (status, body) = app.get("/metrics").await;

    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().expect("plain text metrics");
    assert!(text.contains("room_log_messages_sent_total"));
}
