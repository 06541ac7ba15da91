//! Room log errors.

use thiserror::Error;

use super::chat_room::RoomState;
use crate::shared::error::{AppError, StoreError};

/// Errors surfaced by rooms, the room directory and the user directory.
///
/// Storage failures carry the room and, once one was allocated, the
/// sequence number they concern.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Room '{room}': sequence counter unavailable")]
    AllocationUnavailable {
        room: String,
        #[source]
        source: StoreError,
    },

    #[error("Room '{room}': storage failure (sequence {sequence_num:?})")]
    Persistence {
        room: String,
        sequence_num: Option<i64>,
        #[source]
        source: StoreError,
    },

    #[error("Room '{room}': storage deadline exceeded (sequence {sequence_num:?})")]
    Timeout {
        room: String,
        sequence_num: Option<i64>,
    },

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Room '{0}' already exists")]
    RoomExists(String),

    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("Room '{room}' is not active ({state})")]
    NotActive { room: String, state: RoomState },
}

impl RoomError {
    /// Classify a storage failure of a room operation.
    pub fn from_store(room: &str, sequence_num: Option<i64>, err: StoreError) -> Self {
        match err {
            StoreError::Timeout(_) => RoomError::Timeout {
                room: room.to_string(),
                sequence_num,
            },
            StoreError::Duplicate(msg) => RoomError::Duplicate(msg),
            source => RoomError::Persistence {
                room: room.to_string(),
                sequence_num,
                source,
            },
        }
    }

    /// Sequence number the failure concerns, when one had been allocated.
    pub fn sequence_num(&self) -> Option<i64> {
        match self {
            RoomError::Persistence { sequence_num, .. } | RoomError::Timeout { sequence_num, .. } => {
                *sequence_num
            }
            _ => None,
        }
    }
}

impl From<RoomError> for AppError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::Validation(msg) => AppError::Validation(msg),
            RoomError::NotFound(_) | RoomError::RoomNotFound(_) => AppError::NotFound(err.to_string()),
            RoomError::Duplicate(_) | RoomError::RoomExists(_) => AppError::Conflict(err.to_string()),
            RoomError::AllocationUnavailable { .. }
            | RoomError::Persistence { .. }
            | RoomError::NotActive { .. } => AppError::ServiceUnavailable(err.to_string()),
            RoomError::Timeout { .. } => AppError::Timeout(err.to_string()),
        }
    }
}
