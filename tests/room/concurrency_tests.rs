//! Concurrent access to one room

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use pretty_assertions::assert_eq;

use room_log::application::services::RoomState;
use room_log::domain::{Recipient, RoomType};

use crate::common::TestBackends;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_get_unique_sequences() {
    let backends = TestBackends::with_capacity(16);
    let room = backends
        .directory()
        .create("busy", "alice", vec![], RoomType::Public)
        .await
        .unwrap();

    let sends = (0..50).map(|i| {
        let room = Arc::clone(&room);
        tokio::spawn(async move {
            room.send_message(&format!("m{i}"), "alice", None)
                .await
                .map(|m| m.sequence_num())
        })
    });
    let sequences: Vec<i64> = join_all(sends)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let unique: BTreeSet<i64> = sequences.iter().copied().collect();
    assert_eq!(unique.len(), 50);
    assert_eq!(unique.first(), Some(&1));
    assert_eq!(unique.last(), Some(&50));

    let cached: Vec<i64> = room
        .cache()
        .most_recent(16)
        .iter()
        .map(|m| m.sequence_num())
        .collect();
    let mut sorted = cached.clone();
    sorted.sort_unstable();
    assert_eq!(cached, sorted);
    assert_eq!(cached.len(), 16);

    let all = room.get_messages(&Recipient::All, None).await.unwrap();
    let ordered: Vec<i64> = all.iter().map(|m| m.sequence_num()).collect();
    assert_eq!(ordered, (1..=50).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_send_waits_for_restore() {
    let backends = TestBackends::new();
    let room = backends
        .directory()
        .create("slow", "alice", vec![], RoomType::Public)
        .await
        .unwrap();
    room.send_message("before", "alice", None).await.unwrap();

    backends.store.set_replay_latency(Duration::from_millis(100));
    let restoring = {
        let room = Arc::clone(&room);
        tokio::spawn(async move { room.restore().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(room.state(), RoomState::Restoring);

    let sent = room.send_message("during", "alice", None).await.unwrap();
    assert!(restoring.await.unwrap().unwrap());

    assert_eq!(sent.sequence_num(), 2);
    assert_eq!(room.state(), RoomState::Active);
    let texts: Vec<String> = room
        .get_messages(&Recipient::All, None)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.text)
        .collect();
    assert_eq!(texts, vec!["before", "during"]);
}
