//! Application Services
//!
//! Coordinate the room log's storage handles into rooms and directories.
//!
//! ## Available Services
//!
//! - **ChatRoom**: one room's log (send, read, search, restore)
//! - **RoomDirectory**: room name to `ChatRoom` registry
//! - **UserDirectory**: alias registration and lookup

pub mod chat_room;
pub mod error;
pub mod room_directory;
pub mod user_directory;

use std::sync::Arc;

use crate::domain::{MessagePublisher, MessageStore, RoomRepository, SequenceAllocator};
use crate::infrastructure::cache::DEFAULT_CACHE_CAPACITY;
use crate::shared::retry::StorePolicy;

pub use chat_room::{ChatRoom, GapReason, RoomState, SequenceGap};
pub use error::RoomError;
pub use room_directory::RoomDirectory;
pub use user_directory::UserDirectory;

/// Storage handles shared by every room.
#[derive(Clone)]
pub struct RoomBackends {
    pub allocator: Arc<dyn SequenceAllocator>,
    pub store: Arc<dyn MessageStore>,
    pub rooms: Arc<dyn RoomRepository>,
    pub publisher: Arc<dyn MessagePublisher>,
    pub policy: StorePolicy,
    pub cache_capacity: usize,
}

impl RoomBackends {
    pub fn new(
        allocator: Arc<dyn SequenceAllocator>,
        store: Arc<dyn MessageStore>,
        rooms: Arc<dyn RoomRepository>,
        publisher: Arc<dyn MessagePublisher>,
    ) -> Self {
        Self {
            allocator,
            store,
            rooms,
            publisher,
            policy: StorePolicy::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    pub fn with_policy(mut self, policy: StorePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}
