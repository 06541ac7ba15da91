//! Per-room sequence counter.
//!
//! Maps to the `room_sequences` table (or a Redis counter key).

use async_trait::async_trait;

use crate::shared::error::StoreError;

/// Hands out per-room sequence numbers.
///
/// Implementations must perform the increment atomically in the backing
/// storage, not in process memory, so that several service instances sharing
/// the storage never hand out the same number. The first number issued for a
/// room is 1.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SequenceAllocator: Send + Sync {
    /// Increment the room's counter and return the new value.
    async fn next(&self, room_name: &str) -> Result<i64, StoreError>;

    /// Last value handed out for the room, 0 if none.
    async fn current(&self, room_name: &str) -> Result<i64, StoreError>;
}
