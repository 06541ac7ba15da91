//! # Domain Layer
//!
//! The domain layer contains the core types of the room log.
//! It is independent of any storage or transport concerns.
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - A message cannot exist without its sequence number (`MessageDraft::sequenced`)

pub mod entities;

pub use entities::*;
