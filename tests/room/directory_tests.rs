//! RoomDirectory Tests

use pretty_assertions::assert_eq;
use test_case::test_case;

use room_log::application::services::{RoomError, RoomState};
use room_log::domain::{RoomRepository, RoomType};

use crate::common::TestBackends;

#[tokio::test]
async fn test_rooms_restore_lazily_from_metadata() {
    let backends = TestBackends::new();
    let first = backends.directory();
    let room = first
        .create("team", "alice", vec!["bob".into()], RoomType::Group)
        .await
        .unwrap();
    room.send_message("hello", "alice", None).await.unwrap();

    let second = backends.directory();
    assert!(second.list().is_empty());

    let restored = second.get("team").await.unwrap();
    assert_eq!(restored.state(), RoomState::Active);
    assert!(restored.has_member("bob"));
    assert_eq!(second.list().len(), 1);
}

#[tokio::test]
async fn test_load_all_restores_every_room() {
    let backends = TestBackends::new();
    let first = backends.directory();
    for name in ["a", "b", "c"] {
        first
            .create(name, "alice", vec![], RoomType::Group)
            .await
            .unwrap();
    }

    let second = backends.directory();
    assert_eq!(second.load_all().await.unwrap(), 3);

    let names: Vec<String> = second.list().iter().map(|r| r.name().to_string()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_remove_deactivates_and_keeps_history() {
    let backends = TestBackends::new();
    let directory = backends.directory();
    let room = directory
        .create("team", "alice", vec![], RoomType::Group)
        .await
        .unwrap();
    room.send_message("kept", "alice", None).await.unwrap();

    directory.remove("team").await.unwrap();

    assert_eq!(room.state(), RoomState::Uninitialized);
    let err = room.send_message("late", "alice", None).await.unwrap_err();
    assert!(matches!(err, RoomError::NotActive { .. }));
    assert!(matches!(
        directory.get("team").await.unwrap_err(),
        RoomError::RoomNotFound(_)
    ));
    assert!(backends.store.find_by_name("team").await.unwrap().is_none());

    let again = directory
        .create("team", "alice", vec![], RoomType::Group)
        .await
        .unwrap();
    let found = again.find_message("kept").await.unwrap();
    assert_eq!(found.map(|m| m.sequence_num()), Some(1));
}

#[tokio::test]
async fn test_remove_unknown_room() {
    let backends = TestBackends::new();
    let err = backends.directory().remove("ghost").await.unwrap_err();
    assert!(matches!(err, RoomError::RoomNotFound(_)));
}

#[test_case("public", RoomType::Public ; "public room")]
#[test_case("group", RoomType::Group ; "group room")]
#[test_case("private", RoomType::Private ; "private room")]
#[test_case("unknown", RoomType::Private ; "unknown type falls back to private")]
fn test_room_type_parsing(raw: &str, expected: RoomType) {
    assert_eq!(RoomType::from_str(raw), expected);
}

#[tokio::test]
async fn test_unavailable_store_fails_creation() {
    let backends = TestBackends::new();
    backends.store.set_available(false);

    let err = backends
        .directory()
        .create("team", "alice", vec![], RoomType::Group)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::Persistence { .. }));
}

#[tokio::test]
async fn test_failed_purge_leaves_room_in_place() {
    let backends = TestBackends::new();
    let directory = backends.directory();
    let room = directory
        .create("team", "alice", vec![], RoomType::Group)
        .await
        .unwrap();
    room.send_message("keep me", "alice", None).await.unwrap();

    backends.store.fail_appends(true);
    assert!(directory.purge("team").await.is_err());
    backends.store.fail_appends(false);

    assert_eq!(room.state(), RoomState::Active);
    assert!(backends.store.find_by_name("team").await.unwrap().is_some());
    assert_eq!(backends.store.message_count("team"), 1);
    assert_eq!(directory.list().len(), 1);

    let found = room.find_message("keep me").await.unwrap();
    assert!(found.is_some());
}
