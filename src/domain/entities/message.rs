//! Message entity, store and publisher traits.
//!
//! Maps to the `messages` table in the database schema.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::StoreError;

/// Recipient alias used for messages addressed to the whole room.
pub const BROADCAST_ALIAS: &str = "*";

/// Sentinel accepted by `Recipient::parse` to select every addressee.
pub const ALL_RECIPIENTS: &str = "ALL";

/// Direction of a message relative to this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Sent through this service's API
    #[default]
    Sent,
    /// Accepted from the broker
    Received,
}

impl MessageKind {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "received" => Self::Received,
            _ => Self::Sent,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Received => "received",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Routing and ordering properties of a stored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageProperties {
    /// Room whose log holds the message
    pub room_name: String,

    /// Sender alias
    pub from_alias: String,

    /// Recipient alias, or `BROADCAST_ALIAS`
    pub to_alias: String,

    /// Sent or received
    pub kind: MessageKind,

    /// Position in the room's log, unique within the room
    pub sequence_num: i64,

    /// When the sender produced the message
    pub sent_at: DateTime<Utc>,

    /// When the room log accepted the message
    pub received_at: DateTime<Utc>,
}

impl MessageProperties {
    pub fn is_broadcast(&self) -> bool {
        self.to_alias == BROADCAST_ALIAS
    }
}

/// A persisted chat message.
///
/// Maps to the `messages` table:
/// - id: UUID PRIMARY KEY (UUIDv7)
/// - room_name: VARCHAR(64) NOT NULL
/// - sequence_num: BIGINT NOT NULL, UNIQUE (room_name, sequence_num)
/// - text: TEXT NOT NULL
/// - from_alias / to_alias: VARCHAR(32) NOT NULL
/// - kind: VARCHAR(16) NOT NULL
/// - sent_at / received_at: TIMESTAMPTZ NOT NULL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub properties: MessageProperties,
}

impl Message {
    pub fn sequence_num(&self) -> i64 {
        self.properties.sequence_num
    }

    pub fn room_name(&self) -> &str {
        &self.properties.room_name
    }
}

/// A message that has not been assigned a sequence number yet.
///
/// `sequenced` is the only way to turn a draft into a `Message`, so a
/// message can never reach the store without its number.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    room_name: String,
    text: String,
    from_alias: String,
    to_alias: String,
    kind: MessageKind,
    sent_at: DateTime<Utc>,
}

impl MessageDraft {
    pub fn new(
        room_name: impl Into<String>,
        text: impl Into<String>,
        from_alias: impl Into<String>,
        to_alias: impl Into<String>,
    ) -> Self {
        Self {
            room_name: room_name.into(),
            text: text.into(),
            from_alias: from_alias.into(),
            to_alias: to_alias.into(),
            kind: MessageKind::Sent,
            sent_at: Utc::now(),
        }
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_sent_at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = sent_at;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Attach the allocated sequence number.
    pub fn sequenced(self, sequence_num: i64) -> Message {
        Message {
            id: Uuid::now_v7(),
            text: self.text,
            properties: MessageProperties {
                room_name: self.room_name,
                from_alias: self.from_alias,
                to_alias: self.to_alias,
                kind: self.kind,
                sequence_num,
                sent_at: self.sent_at,
                received_at: Utc::now(),
            },
        }
    }
}

/// Addressee filter for reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every message regardless of addressee
    All,
    /// Messages whose `to_alias` equals the alias
    Alias(String),
}

impl Recipient {
    pub fn parse(value: &str) -> Self {
        if value == ALL_RECIPIENTS {
            Self::All
        } else {
            Self::Alias(value.to_string())
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Alias(alias) => Some(alias),
        }
    }

    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Self::All => true,
            Self::Alias(alias) => message.properties.to_alias == *alias,
        }
    }
}

/// Filter for `MessageStore::query`. Sequence bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub recipient: Option<String>,
    pub text: Option<String>,
    pub min_seq: Option<i64>,
    pub max_seq: Option<i64>,
}

impl MessageQuery {
    pub fn for_recipient(recipient: &Recipient) -> Self {
        Self {
            recipient: recipient.alias().map(str::to_string),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Restrict to sequence numbers strictly below `sequence_num`.
    pub fn below(mut self, sequence_num: i64) -> Self {
        self.max_seq = Some(sequence_num - 1);
        self
    }

    pub fn matches(&self, message: &Message) -> bool {
        let props = &message.properties;
        self.recipient.as_deref().map_or(true, |r| props.to_alias == r)
            && self.text.as_deref().map_or(true, |t| message.text == t)
            && self.min_seq.map_or(true, |min| props.sequence_num >= min)
            && self.max_seq.map_or(true, |max| props.sequence_num <= max)
    }
}

/// Append-only durable log of messages, partitioned by room.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a sequenced message.
    ///
    /// Fails with `StoreError::Duplicate` if the room already holds a
    /// message with the same sequence number.
    async fn append(&self, message: &Message) -> Result<Message, StoreError>;

    /// Messages of a room matching `query`, ascending by sequence number.
    async fn query(
        &self,
        room_name: &str,
        query: &MessageQuery,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, StoreError>;

    /// Every message of a room, ascending by sequence number.
    ///
    /// The stream is lazy and finite; calling `replay` again starts over.
    fn replay<'a>(&'a self, room_name: &'a str) -> BoxStream<'a, Result<Message, StoreError>>;

    /// Delete a room's whole log. Returns the number of deleted messages.
    async fn purge(&self, room_name: &str) -> Result<u64, StoreError>;
}

/// Hand-off point to the message broker.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(
        &self,
        destination: &str,
        payload: &[u8],
        headers: &BTreeMap<String, String>,
    ) -> Result<(), StoreError>;
}
