//! Request DTOs
//!
//! Data structures for API request bodies and query strings.

use serde::Deserialize;
use validator::Validate;

use crate::domain::ALL_RECIPIENTS;

/// Register alias request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 32, message = "Alias must be 1-32 characters"))]
    pub alias: String,
}

/// Create room request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 32, message = "Owner alias must be 1-32 characters"))]
    pub owner_alias: String,

    #[serde(default)]
    pub members: Vec<String>,

    /// "private" (default), "public" or "group"
    pub room_type: Option<String>,
}

/// Send message request
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 32, message = "Alias must be 1-32 characters"))]
    pub alias: String,

    /// Defaults to the room's default recipient
    pub to_alias: Option<String>,

    #[validate(length(min = 1, max = 4000, message = "Message must be 1-4000 characters"))]
    pub message: String,
}

/// `GET /rooms/{name}/messages` query
#[derive(Debug, Deserialize, Validate)]
pub struct MessageListQuery {
    /// Recipient alias, or "ALL"
    pub alias: Option<String>,

    #[validate(range(min = 1, message = "Limit must be at least 1"))]
    pub limit: Option<usize>,
}

impl MessageListQuery {
    pub fn recipient(&self) -> &str {
        self.alias.as_deref().unwrap_or(ALL_RECIPIENTS)
    }
}

/// `GET /rooms/{name}/messages/search` query
#[derive(Debug, Deserialize, Validate)]
pub struct SearchMessageQuery {
    #[validate(length(min = 1, message = "Search text must not be empty"))]
    pub text: String,
}

/// `GET /rooms` query
#[derive(Debug, Default, Deserialize)]
pub struct RoomListQuery {
    pub member: Option<String>,
    pub owner: Option<String>,
}

/// `DELETE /rooms/{name}` query
#[derive(Debug, Default, Deserialize)]
pub struct DeleteRoomQuery {
    /// Also delete the message log
    #[serde(default)]
    pub purge: bool,
}
