//! Room Cache
//!
//! Bounded in-memory window over the newest entries of one room's log.
//!
//! The window is always ascending by sequence number and always a suffix of
//! the durable log as far as acknowledged appends go. When it holds more than
//! `capacity` entries the lowest sequence numbers are evicted first. Once
//! anything has been evicted, dropped on arrival or left unconfirmed, the
//! window no longer mirrors the whole log.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::Message;

/// Default number of entries kept per room.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct CacheWindow {
    entries: VecDeque<Arc<Message>>,
    /// Whether `entries` holds every message of the log
    complete: bool,
}

/// Point-in-time copy of a room's window.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    entries: Vec<Arc<Message>>,
    complete: bool,
}

impl CacheSnapshot {
    pub fn entries(&self) -> &[Arc<Message>] {
        &self.entries
    }

    /// True when the snapshot holds the room's entire log.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn oldest_sequence(&self) -> Option<i64> {
        self.entries.first().map(|m| m.sequence_num())
    }

    pub fn find_by_text(&self, text: &str) -> Option<&Arc<Message>> {
        self.entries.iter().find(|m| m.text == text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-room bounded cache. Mutations are serialized by the inner lock;
/// readers never see a half-applied `put` or `rebuild`.
#[derive(Debug)]
pub struct RoomCache {
    capacity: usize,
    window: RwLock<CacheWindow>,
}

impl Default for RoomCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl RoomCache {
    /// Create an empty cache. A capacity of 0 is raised to 1.
    ///
    /// A new cache is not complete until the first `rebuild`.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            window: RwLock::new(CacheWindow::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert a message the store has already accepted.
    ///
    /// The message goes to its sorted position, so appends that complete out
    /// of order still leave the window ascending. Returns false when the
    /// message was not kept: it is already cached, or it is older than every
    /// entry of a full window.
    pub fn put(&self, message: Arc<Message>) -> bool {
        let seq = message.sequence_num();
        let mut window = self.window.write();

        if window.entries.len() >= self.capacity
            && window.entries.front().is_some_and(|m| seq < m.sequence_num())
        {
            window.complete = false;
            return false;
        }

        let position = window.entries.partition_point(|m| m.sequence_num() < seq);
        if window
            .entries
            .get(position)
            .is_some_and(|m| m.sequence_num() == seq)
        {
            return false;
        }
        window.entries.insert(position, message);

        while window.entries.len() > self.capacity {
            if let Some(evicted) = window.entries.pop_front() {
                debug!(
                    room = %evicted.room_name(),
                    sequence_num = evicted.sequence_num(),
                    "Evicted cache entry"
                );
            }
            window.complete = false;
        }

        true
    }

    /// Up to the newest `n` entries, ascending.
    pub fn most_recent(&self, n: usize) -> Vec<Arc<Message>> {
        let window = self.window.read();
        let skip = window.entries.len().saturating_sub(n);
        window.entries.iter().skip(skip).cloned().collect()
    }

    /// Oldest cached entry whose text equals `text`.
    pub fn find_by_text(&self, text: &str) -> Option<Arc<Message>> {
        self.window
            .read()
            .entries
            .iter()
            .find(|m| m.text == text)
            .cloned()
    }

    /// Replace the contents with the newest `capacity` entries of `replayed`.
    ///
    /// The new window is assembled before the lock is taken, then swapped in.
    pub fn rebuild<I>(&self, replayed: I)
    where
        I: IntoIterator<Item = Message>,
    {
        let mut messages: Vec<Message> = replayed.into_iter().collect();
        messages.sort_by_key(Message::sequence_num);
        messages.dedup_by_key(|m| m.sequence_num());

        let total = messages.len();
        let skip = total.saturating_sub(self.capacity);
        let entries: VecDeque<Arc<Message>> =
            messages.into_iter().skip(skip).map(Arc::new).collect();

        let fresh = CacheWindow {
            entries,
            complete: skip == 0,
        };

        *self.window.write() = fresh;
    }

    /// Drop every entry. The cache is then complete only if the log is empty,
    /// which the caller asserts with `log_is_empty`.
    pub fn clear(&self, log_is_empty: bool) {
        let mut window = self.window.write();
        window.entries.clear();
        window.complete = log_is_empty;
    }

    /// Stop treating the window as the whole log. Set when an append may
    /// have landed in the store without reaching the window.
    pub fn mark_incomplete(&self) {
        self.window.write().complete = false;
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let window = self.window.read();
        CacheSnapshot {
            entries: window.entries.iter().cloned().collect(),
            complete: window.complete,
        }
    }

    pub fn oldest_sequence(&self) -> Option<i64> {
        self.window.read().entries.front().map(|m| m.sequence_num())
    }

    pub fn is_complete(&self) -> bool {
        self.window.read().complete
    }

    pub fn len(&self) -> usize {
        self.window.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.read().entries.is_empty()
    }
}
