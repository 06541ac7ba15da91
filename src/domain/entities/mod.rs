//! # Domain Entities
//!
//! Core domain entities of the room log, and the storage traits each one is
//! read and written through.
//!
//! - **Message**: a sequenced, immutable chat message (and its draft form)
//! - **Room**: durable room metadata (type, owner, members)
//! - **User**: a registered alias
//! - **SequenceAllocator**: the per-room counter
//!
//! ## Repository Traits
//!
//! Traits are implemented in the infrastructure layer (PostgreSQL, Redis and
//! an in-memory document store), following the dependency inversion principle.

mod message;
mod room;
mod sequence;
mod user;

pub use message::{
    Message, MessageDraft, MessageKind, MessageProperties, MessagePublisher, MessageQuery,
    MessageStore, Recipient, ALL_RECIPIENTS, BROADCAST_ALIAS,
};
pub use room::{Room, RoomRepository, RoomType};
pub use sequence::SequenceAllocator;
#[cfg(test)]
pub use sequence::MockSequenceAllocator;
pub use user::{User, UserRepository};
