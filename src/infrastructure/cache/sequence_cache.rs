//! Redis Sequence Counter
//!
//! Per-room counters held in Redis. `INCR` is atomic on the server, so every
//! service instance sharing the Redis database draws from the same counter.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, instrument};

use super::keys;
use crate::domain::SequenceAllocator;
use crate::shared::error::StoreError;

#[derive(Clone)]
pub struct RedisSequenceAllocator {
    conn: ConnectionManager,
}

impl RedisSequenceAllocator {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SequenceAllocator for RedisSequenceAllocator {
    #[instrument(skip(self), level = "debug")]
    async fn next(&self, room_name: &str) -> Result<i64, StoreError> {
        let key = keys::sequence(room_name);
        let mut conn = self.conn.clone();

        let value: i64 = conn.incr(&key, 1).await?;
        debug!(key = %key, value = value, "Sequence increment");

        Ok(value)
    }

    async fn current(&self, room_name: &str) -> Result<i64, StoreError> {
        let key = keys::sequence(room_name);
        let mut conn = self.conn.clone();

        let value: Option<i64> = conn.get(&key).await?;
        Ok(value.unwrap_or(0))
    }
}
