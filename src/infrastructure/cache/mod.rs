//! Cache Module
//!
//! In-memory room windows plus Redis connection management.
//!
//! This module provides:
//! - `RoomCache`, the bounded per-room window over a message log
//! - Redis connection management with automatic reconnection
//! - A Redis-backed `SequenceAllocator`
//! - Predefined key prefixes for consistent Redis key naming

mod room_cache;
mod sequence_cache;

pub use room_cache::{CacheSnapshot, RoomCache, DEFAULT_CACHE_CAPACITY};
pub use sequence_cache::RedisSequenceAllocator;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
///
/// # Example
/// ```rust,ignore
/// let conn = create_redis_client(&settings.redis).await?;
/// ```
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Redis key and channel names.
pub mod keys {
    /// Prefix for per-room sequence counters (e.g., "room:seq:general")
    pub const ROOM_SEQUENCE: &str = "room:seq:";

    /// Prefix for per-room pub/sub channels (e.g., "room:general")
    pub const ROOM_CHANNEL: &str = "room:";

    /// Generates a sequence counter key for a room
    #[inline]
    pub fn sequence(room_name: &str) -> String {
        format!("{}{}", ROOM_SEQUENCE, room_name)
    }

    /// Generates the pub/sub channel a room's messages are published on
    #[inline]
    pub fn room_channel(room_name: &str) -> String {
        format!("{}{}", ROOM_CHANNEL, room_name)
    }

}
