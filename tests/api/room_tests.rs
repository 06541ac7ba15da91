//! Room API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common::TestApp;

fn names(rooms: &serde_json::Value) -> Vec<&str> {
    rooms
        .as_array()
        .expect("room list")
        .iter()
        .map(|r| r["name"].as_str().expect("name"))
        .collect()
}

#[tokio::test]
async fn test_default_room_exists_at_startup() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/v1/rooms/general").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room_type"], "public");
    assert_eq!(body["owner_alias"], "admin");
    assert_eq!(body["state"], "active");
}

#[tokio::test]
async fn test_create_room() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let (status, body) = app.create_room("team", "alice", &["bob"], "group").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "team");
    assert_eq!(body["room_type"], "group");
    assert_eq!(body["members"], serde_json::json!(["alice", "bob"]));
    assert_eq!(body["cached_messages"], 0);
}

#[tokio::test]
async fn test_create_room_requires_registered_owner() {
    let app = TestApp::new().await;

    let (status, _) = app.create_room("team", "ghost", &[], "group").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_duplicate_room_conflicts() {
    let app = TestApp::new().await;
    app.register("alice").await;
    app.create_room("team", "alice", &[], "group").await;

    let (status, _) = app.create_room("team", "alice", &[], "public").await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_room_rejects_bad_name() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let (status, _) = app.create_room("no spaces", "alice", &[], "group").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_rooms_by_member_and_owner() {
    let app = TestApp::new().await;
    app.register("alice").await;
    app.register("carol").await;
    app.create_room("zeta", "alice", &["bob"], "group").await;
    app.create_room("alpha", "carol", &["bob"], "group").await;

    let (_, all) = app.get("/api/v1/rooms").await;
    assert_eq!(names(&all), vec!["alpha", "general", "zeta"]);

    let (_, member) = app.get("/api/v1/rooms?member=bob").await;
    assert_eq!(names(&member), vec!["alpha", "zeta"]);

    let (_, owner) = app.get("/api/v1/rooms?owner=alice").await;
    assert_eq!(names(&owner), vec!["zeta"]);

    let (_, both) = app.get("/api/v1/rooms?member=bob&owner=carol").await;
    assert_eq!(names(&both), vec!["alpha"]);
}

#[tokio::test]
async fn test_delete_room_keeps_log() {
    let app = TestApp::new().await;
    app.register("alice").await;
    app.create_room("team", "alice", &[], "group").await;
    app.send("team", "alice", None, "first").await;

    let (status, body) = app.delete("/api/v1/rooms/team").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["purged_messages"].is_null());

    let (status, _) = app.get("/api/v1/rooms/team").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.message_count("team"), 1);
}

#[tokio::test]
async fn test_delete_room_with_purge() {
    let app = TestApp::new().await;
    app.register("alice").await;
    app.create_room("team", "alice", &[], "group").await;
    app.send("team", "alice", None, "first").await;
    app.send("team", "alice", None, "second").await;

    let (status, body) = app.delete("/api/v1/rooms/team?purge=true").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["purged_messages"], 2);
    assert_eq!(app.store.message_count("team"), 0);
}

#[tokio::test]
async fn test_delete_unknown_room() {
    let app = TestApp::new().await;

    let (status, _) = app.delete("/api/v1/rooms/nowhere").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
