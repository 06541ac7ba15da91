//! Room entity and repository trait.
//!
//! Maps to the `rooms` table in the database schema.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::BROADCAST_ALIAS;
use crate::shared::error::StoreError;

/// Room visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    /// Direct conversation between members
    #[default]
    Private,
    /// Anyone may read and post
    Public,
    /// Member-only group conversation
    Group,
}

impl RoomType {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "public" => Self::Public,
            "group" => Self::Group,
            _ => Self::Private,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
            Self::Group => "group",
        }
    }
}

impl std::fmt::Display for RoomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Durable room metadata.
///
/// Maps to the `rooms` table:
/// - name: VARCHAR(64) PRIMARY KEY
/// - room_type: VARCHAR(16) NOT NULL
/// - owner_alias: VARCHAR(32) NOT NULL
/// - members: TEXT[] NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    pub room_type: RoomType,
    pub owner_alias: String,
    pub members: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Build a room record. The owner is always a member.
    pub fn new<I, S>(
        name: impl Into<String>,
        owner_alias: impl Into<String>,
        members: I,
        room_type: RoomType,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let owner_alias = owner_alias.into();
        let mut members: BTreeSet<String> = members.into_iter().map(Into::into).collect();
        members.insert(owner_alias.clone());

        Self {
            name: name.into(),
            room_type,
            owner_alias,
            members,
            created_at: Utc::now(),
        }
    }

    pub fn has_member(&self, alias: &str) -> bool {
        self.members.contains(alias)
    }

    pub fn is_owned_by(&self, alias: &str) -> bool {
        self.owner_alias == alias
    }

    /// Recipient used when a sender does not name one: the other member of
    /// a private room, the whole room otherwise.
    pub fn default_recipient(&self, from_alias: &str) -> &str {
        match self.room_type {
            RoomType::Public | RoomType::Group => BROADCAST_ALIAS,
            RoomType::Private => self
                .members
                .iter()
                .find(|member| member.as_str() != from_alias)
                .map(String::as_str)
                .unwrap_or(BROADCAST_ALIAS),
        }
    }
}

/// Repository trait for room metadata.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Insert a new room; `StoreError::Duplicate` if the name is taken.
    async fn insert(&self, room: &Room) -> Result<Room, StoreError>;

    /// Find a room by its unique name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Room>, StoreError>;

    /// All rooms, ordered by name.
    async fn list(&self) -> Result<Vec<Room>, StoreError>;

    /// Delete a room record. Returns false if none existed.
    async fn delete(&self, name: &str) -> Result<bool, StoreError>;
}
