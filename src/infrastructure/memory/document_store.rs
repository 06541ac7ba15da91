//! In-memory document store.
//!
//! Implements every storage trait of the domain (messages, sequence counters,
//! room metadata and users) on one shared value, the way a single document
//! database would back all of them.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use parking_lot::RwLock;

use crate::domain::{
    Message, MessageQuery, MessageStore, Room, RoomRepository, SequenceAllocator, User,
    UserRepository,
};
use crate::shared::error::StoreError;

#[derive(Debug, Default)]
struct Faults {
    unavailable: AtomicBool,
    fail_appends: AtomicBool,
    fail_allocations: AtomicBool,
    failing_reads: AtomicU32,
    append_latency_ms: AtomicU64,
    replay_latency_ms: AtomicU64,
}

/// Messages, counters, rooms and users held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    messages: DashMap<String, BTreeMap<i64, Message>>,
    sequences: DashMap<String, i64>,
    rooms: RwLock<BTreeMap<String, Room>>,
    users: DashMap<String, User>,
    faults: Faults,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the whole store offline (`false`) or back online (`true`).
    /// While offline every operation fails with `StoreError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.faults.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Make message log writes (append and purge) fail while counters and
    /// room metadata keep working.
    pub fn fail_appends(&self, fail: bool) {
        self.faults.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Make sequence allocation fail while the message log keeps working.
    pub fn fail_allocations(&self, fail: bool) {
        self.faults.fail_allocations.store(fail, Ordering::SeqCst);
    }

    /// Fail the next `count` read operations with a backend error.
    pub fn fail_next_reads(&self, count: u32) {
        self.faults.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Delay every append by `latency` before it is applied.
    pub fn set_append_latency(&self, latency: Duration) {
        self.faults
            .append_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delay the start of every replay by `latency`.
    pub fn set_replay_latency(&self, latency: Duration) {
        self.faults
            .replay_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Sequence numbers persisted for a room, ascending.
    pub fn stored_sequences(&self, room_name: &str) -> Vec<i64> {
        self.messages
            .get(room_name)
            .map(|log| log.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of messages persisted for a room.
    pub fn message_count(&self, room_name: &str) -> usize {
        self.messages.get(room_name).map_or(0, |log| log.len())
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("document store offline".into()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), StoreError> {
        self.ensure_available()?;
        let consumed = self
            .faults
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            return Err(StoreError::Backend("injected read failure".into()));
        }
        Ok(())
    }

    async fn delay(latency_ms: &AtomicU64) {
        let millis = latency_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    fn log_snapshot(&self, room_name: &str) -> Vec<Message> {
        self.messages
            .get(room_name)
            .map(|log| log.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageStore for InMemoryDocumentStore {
    async fn append(&self, message: &Message) -> Result<Message, StoreError> {
        Self::delay(&self.faults.append_latency_ms).await;
        self.ensure_available()?;
        if self.faults.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("message log offline".into()));
        }

        let mut log = self
            .messages
            .entry(message.room_name().to_string())
            .or_default();
        match log.entry(message.sequence_num()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(format!(
                "room '{}' already holds sequence {}",
                message.room_name(),
                message.sequence_num()
            ))),
            Entry::Vacant(slot) => Ok(slot.insert(message.clone()).clone()),
        }
    }

    async fn query(
        &self,
        room_name: &str,
        query: &MessageQuery,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, StoreError> {
        self.check_read()?;

        let Some(log) = self.messages.get(room_name) else {
            return Ok(Vec::new());
        };
        Ok(log
            .values()
            .filter(|m| query.matches(m))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn replay<'a>(&'a self, room_name: &'a str) -> BoxStream<'a, Result<Message, StoreError>> {
        stream::once(async move {
            Self::delay(&self.faults.replay_latency_ms).await;
            self.check_read()?;
            Ok::<_, StoreError>(self.log_snapshot(room_name))
        })
        .map_ok(|messages| stream::iter(messages.into_iter().map(Ok::<_, StoreError>)))
        .try_flatten()
        .boxed()
    }

    async fn purge(&self, room_name: &str) -> Result<u64, StoreError> {
        self.ensure_available()?;
        if self.faults.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("message log offline".into()));
        }
        Ok(self
            .messages
            .remove(room_name)
            .map_or(0, |(_, log)| log.len() as u64))
    }
}

#[async_trait]
impl SequenceAllocator for InMemoryDocumentStore {
    async fn next(&self, room_name: &str) -> Result<i64, StoreError> {
        self.ensure_available()?;
        if self.faults.fail_allocations.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("sequence counter offline".into()));
        }

        let mut counter = self.sequences.entry(room_name.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn current(&self, room_name: &str) -> Result<i64, StoreError> {
        self.check_read()?;
        Ok(self.sequences.get(room_name).map_or(0, |seq| *seq))
    }
}

#[async_trait]
impl RoomRepository for InMemoryDocumentStore {
    async fn insert(&self, room: &Room) -> Result<Room, StoreError> {
        self.ensure_available()?;
        match self.rooms.write().entry(room.name.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(format!(
                "room '{}' already exists",
                room.name
            ))),
            Entry::Vacant(slot) => Ok(slot.insert(room.clone()).clone()),
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Room>, StoreError> {
        self.check_read()?;
        Ok(self.rooms.read().get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<Room>, StoreError> {
        self.check_read()?;
        Ok(self.rooms.read().values().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        self.ensure_available()?;
        Ok(self.rooms.write().remove(name).is_some())
    }
}

#[async_trait]
impl UserRepository for InMemoryDocumentStore {
    async fn register(&self, user: &User) -> Result<User, StoreError> {
        self.ensure_available()?;
        match self.users.entry(user.alias.clone()) {
            MapEntry::Occupied(_) => Err(StoreError::Duplicate(format!(
                "alias '{}' is taken",
                user.alias
            ))),
            MapEntry::Vacant(slot) => Ok(slot.insert(user.clone()).clone()),
        }
    }

    async fn find_by_alias(&self, alias: &str) -> Result<Option<User>, StoreError> {
        self.check_read()?;
        Ok(self.users.get(alias).map(|user| user.clone()))
    }
}
