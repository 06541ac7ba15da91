//! ChatRoom Tests

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};

use room_log::application::services::{ChatRoom, GapReason, RoomError, RoomState};
use room_log::domain::{
    Message, MessageKind, MessageQuery, MessageStore, Recipient, RoomType, SequenceAllocator,
};

use crate::common::TestBackends;

async fn general(backends: &TestBackends) -> Arc<ChatRoom> {
    backends
        .directory()
        .create("general", "alice", vec!["bob".into()], RoomType::Public)
        .await
        .unwrap()
}

async fn send_four(room: &ChatRoom) {
    for text in ["first", "second", "third", "fourth"] {
        assert_ok!(room.send_message(text, "alice", Some("bob")).await);
    }
}

fn texts(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.text.as_str()).collect()
}

fn seqs(messages: &[Message]) -> Vec<i64> {
    messages.iter().map(Message::sequence_num).collect()
}

#[tokio::test]
async fn test_messages_are_numbered_in_send_order() {
    let backends = TestBackends::new();
    let room = general(&backends).await;
    send_four(&room).await;

    let messages = room
        .get_messages(&Recipient::parse("bob"), None)
        .await
        .unwrap();

    assert_eq!(texts(&messages), vec!["first", "second", "third", "fourth"]);
    assert_eq!(seqs(&messages), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_limit_returns_oldest_entries() {
    let backends = TestBackends::new();
    let room = general(&backends).await;
    send_four(&room).await;

    let messages = room
        .get_messages(&Recipient::parse("bob"), Some(2))
        .await
        .unwrap();

    assert_eq!(texts(&messages), vec!["first", "second"]);
    assert_eq!(seqs(&messages), vec![1, 2]);
}

#[tokio::test]
async fn test_find_message_by_text() {
    let backends = TestBackends::new();
    let room = general(&backends).await;
    send_four(&room).await;

    let found = room.find_message("third").await.unwrap().unwrap();
    assert_eq!(found.sequence_num(), 3);
    assert!(room.find_message("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_append_never_reuses_sequence() {
    let backends = TestBackends::new();
    let room = general(&backends).await;
    assert_ok!(room.send_message("first", "alice", None).await);

    backends.store.fail_appends(true);
    let err = room.send_message("second", "alice", None).await.unwrap_err();
    assert!(matches!(
        err,
        RoomError::Persistence {
            sequence_num: Some(2),
            ..
        }
    ));

    let next = backends.store.next("general").await.unwrap();
    assert!(next > 2);

    let gaps = room.failed_sequences();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].sequence_num, 2);
    assert_eq!(gaps[0].reason, GapReason::NotPersisted);
}

#[tokio::test]
async fn test_send_after_outage_continues_past_gap() {
    let backends = TestBackends::new();
    let room = general(&backends).await;
    assert_ok!(room.send_message("first", "alice", None).await);

    backends.store.fail_appends(true);
    assert_err!(room.send_message("lost", "alice", None).await);
    backends.store.fail_appends(false);

    let after = room.send_message("after", "alice", None).await.unwrap();
    assert_eq!(after.sequence_num(), 3);

    let all = room.get_messages(&Recipient::All, None).await.unwrap();
    assert_eq!(seqs(&all), vec![1, 3]);
}

#[tokio::test]
async fn test_restore_matches_state_before_restart() {
    let backends = TestBackends::with_capacity(8);
    let room = general(&backends).await;
    for i in 0..5 {
        room.send_message(&format!("m{i}"), "alice", Some("bob"))
            .await
            .unwrap();
    }
    let before = room.get_messages(&Recipient::All, None).await.unwrap();

    let restarted = TestBackends::over(backends.store.clone(), 8);
    let restored = restarted.directory().get("general").await.unwrap();

    assert_eq!(restored.state(), RoomState::Active);
    let after = restored.get_messages(&Recipient::All, None).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(restored.cache().len(), 5);
    assert!(restored.cache().is_complete());

    let next = restored.send_message("m5", "alice", None).await.unwrap();
    assert_eq!(next.sequence_num(), 6);
}

#[tokio::test]
async fn test_restore_keeps_only_newest_entries_in_cache() {
    let backends = TestBackends::with_capacity(3);
    let room = general(&backends).await;
    for i in 1..=6 {
        room.send_message(&format!("m{i}"), "alice", None)
            .await
            .unwrap();
    }

    let restarted = TestBackends::over(backends.store.clone(), 3);
    let restored = restarted.directory().get("general").await.unwrap();

    assert_eq!(restored.cache().oldest_sequence(), Some(4));
    assert!(!restored.cache().is_complete());
    let all = restored.get_messages(&Recipient::All, None).await.unwrap();
    assert_eq!(seqs(&all), vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn test_reads_span_cache_and_store() {
    let backends = TestBackends::with_capacity(2);
    let room = general(&backends).await;
    for text in ["first", "second", "third", "fourth"] {
        room.send_message(text, "alice", Some("bob")).await.unwrap();
    }

    assert_eq!(room.cache().len(), 2);
    assert_eq!(room.cache().oldest_sequence(), Some(3));

    let bob = room
        .get_messages(&Recipient::parse("bob"), None)
        .await
        .unwrap();
    assert_eq!(texts(&bob), vec!["first", "second", "third", "fourth"]);

    let oldest_two = room
        .get_messages(&Recipient::parse("bob"), Some(2))
        .await
        .unwrap();
    assert_eq!(texts(&oldest_two), vec!["first", "second"]);

    let found = room.find_message("first").await.unwrap().unwrap();
    assert_eq!(found.sequence_num(), 1);
}

#[tokio::test]
async fn test_store_read_failure_surfaces_as_persistence_error() {
    let backends = TestBackends::with_capacity(1);
    let room = general(&backends).await;
    room.send_message("first", "alice", None).await.unwrap();
    room.send_message("second", "alice", None).await.unwrap();

    backends.store.fail_next_reads(10);
    let err = room.get_messages(&Recipient::All, None).await.unwrap_err();
    assert!(matches!(
        err,
        RoomError::Persistence {
            sequence_num: None,
            ..
        }
    ));
    backends.store.fail_next_reads(0);
}

#[tokio::test]
async fn test_private_room_defaults_to_other_member() {
    let backends = TestBackends::new();
    let room = backends
        .directory()
        .create("dm", "alice", vec!["bob".into()], RoomType::Private)
        .await
        .unwrap();

    let sent = room.send_message("hi", "alice", None).await.unwrap();
    assert_eq!(sent.properties.to_alias, "bob");

    let reply = room.send_message("hey", "bob", None).await.unwrap();
    assert_eq!(reply.properties.to_alias, "alice");
}

#[tokio::test]
async fn test_purge_deletes_log_but_not_counter() {
    let backends = TestBackends::new();
    let directory = backends.directory();
    let room = directory
        .create("general", "alice", vec![], RoomType::Public)
        .await
        .unwrap();
    send_four(&room).await;

    let deleted = directory.purge("general").await.unwrap();
    assert_eq!(deleted, 4);
    assert_eq!(backends.store.message_count("general"), 0);
    assert_eq!(room.state(), RoomState::Uninitialized);

    let again = directory
        .create("general", "alice", vec![], RoomType::Public)
        .await
        .unwrap();
    let sent = again.send_message("fresh", "alice", None).await.unwrap();
    assert_eq!(sent.sequence_num(), 5);
}

#[tokio::test]
async fn test_instances_sharing_a_store_read_each_others_messages() {
    let node_a = TestBackends::with_capacity(8);
    let node_b = TestBackends::over(node_a.store.clone(), 8);
    let room_a = general(&node_a).await;
    let room_b = node_b.directory().get("general").await.unwrap();

    room_a.send_message("from_a", "alice", Some("bob")).await.unwrap();
    room_b.send_message("from_b", "carol", Some("bob")).await.unwrap();

    assert!(room_b.cache().is_complete());
    assert_eq!(node_a.store.stored_sequences("general"), vec![1, 2]);

    let bob = room_b
        .get_messages(&Recipient::parse("bob"), None)
        .await
        .unwrap();
    assert_eq!(texts(&bob), vec!["from_a", "from_b"]);
    assert_eq!(seqs(&bob), vec![1, 2]);

    let oldest = room_b
        .get_messages(&Recipient::parse("bob"), Some(2))
        .await
        .unwrap();
    assert_eq!(seqs(&oldest), vec![1, 2]);

    let found = room_b.find_message("from_a").await.unwrap().unwrap();
    assert_eq!(found.sequence_num(), 1);
    assert_eq!(found.properties.from_alias, "alice");

    let from_a = room_a.get_messages(&Recipient::All, None).await.unwrap();
    assert_eq!(from_a, room_b.get_messages(&Recipient::All, None).await.unwrap());
}

#[tokio::test]
async fn test_repeated_reads_return_identical_results() {
    let backends = TestBackends::with_capacity(2);
    let room = general(&backends).await;
    for (text, to) in [
        ("one", "bob"),
        ("two", "carol"),
        ("three", "bob"),
        ("four", "bob"),
        ("five", "carol"),
    ] {
        room.send_message(text, "alice", Some(to)).await.unwrap();
    }
    assert!(!room.cache().is_complete());

    for (recipient, limit) in [
        (Recipient::parse("bob"), None),
        (Recipient::parse("bob"), Some(2)),
        (Recipient::parse("carol"), Some(5)),
        (Recipient::All, None),
        (Recipient::All, Some(3)),
    ] {
        let first = room.get_messages(&recipient, limit).await.unwrap();
        let second = room.get_messages(&recipient, limit).await.unwrap();
        assert_eq!(first, second, "{recipient:?} limit {limit:?}");
    }

    let bob = room
        .get_messages(&Recipient::parse("bob"), None)
        .await
        .unwrap();
    assert_eq!(texts(&bob), vec!["one", "three", "four"]);
}

#[tokio::test]
async fn test_repeated_reads_on_complete_cache_are_identical() {
    let backends = TestBackends::new();
    let room = general(&backends).await;
    send_four(&room).await;
    assert!(room.cache().is_complete());

    let first = room
        .get_messages(&Recipient::parse("bob"), Some(3))
        .await
        .unwrap();
    let second = room
        .get_messages(&Recipient::parse("bob"), Some(3))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(seqs(&first), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_stored_message_reads_back_unchanged() {
    let backends = TestBackends::with_capacity(1);
    let room = general(&backends).await;

    let sent = room.send_message("hi bob", "alice", Some("bob")).await.unwrap();
    room.send_message("hi carol", "alice", Some("carol"))
        .await
        .unwrap();

    let read = room
        .get_messages(&Recipient::parse("bob"), None)
        .await
        .unwrap();
    assert_eq!(read, vec![sent.clone()]);

    let query = MessageQuery::for_recipient(&Recipient::parse("bob"));
    let stored = backends.store.query("general", &query, None).await.unwrap();
    assert_eq!(stored.len(), 1);
    let props = &stored[0].properties;
    assert_eq!(props.from_alias, "alice");
    assert_eq!(props.to_alias, "bob");
    assert_eq!(props.kind, MessageKind::Sent);
    assert_eq!(props.sequence_num, sent.sequence_num());
    assert_eq!(stored[0].text, "hi bob");
}
