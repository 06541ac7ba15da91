//! Response DTOs
//!
//! Data structures for API response bodies.

use serde::Serialize;

use crate::application::services::ChatRoom;
use crate::domain::{Message, User};

/// User response
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub alias: String,
    pub created_at: String,
    pub modified_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            alias: user.alias,
            created_at: user.created_at.to_rfc3339(),
            modified_at: user.modified_at.to_rfc3339(),
        }
    }
}

/// Room response
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub name: String,
    pub room_type: String,
    pub owner_alias: String,
    pub members: Vec<String>,
    pub state: String,
    pub cached_messages: usize,
    pub failed_sequences: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<&ChatRoom> for RoomResponse {
    fn from(room: &ChatRoom) -> Self {
        let metadata = room.metadata();
        Self {
            name: room.name().to_string(),
            room_type: metadata
                .as_ref()
                .map(|m| m.room_type.as_str().to_string())
                .unwrap_or_default(),
            owner_alias: metadata
                .as_ref()
                .map(|m| m.owner_alias.clone())
                .unwrap_or_default(),
            members: metadata
                .as_ref()
                .map(|m| m.members.iter().cloned().collect())
                .unwrap_or_default(),
            state: room.state().to_string(),
            cached_messages: room.cache().len(),
            failed_sequences: room
                .failed_sequences()
                .into_iter()
                .map(|gap| gap.sequence_num)
                .collect(),
            created_at: metadata.map(|m| m.created_at.to_rfc3339()),
        }
    }
}

/// Message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub room: String,
    pub sequence_num: i64,
    pub text: String,
    pub from_alias: String,
    pub to_alias: String,
    pub kind: String,
    pub sent_at: String,
    pub received_at: String,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        let props = message.properties;
        Self {
            id: message.id.to_string(),
            room: props.room_name,
            sequence_num: props.sequence_num,
            text: message.text,
            from_alias: props.from_alias,
            to_alias: props.to_alias,
            kind: props.kind.as_str().to_string(),
            sent_at: props.sent_at.to_rfc3339(),
            received_at: props.received_at.to_rfc3339(),
        }
    }
}
