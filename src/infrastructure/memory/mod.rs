//! In-memory backends for tests and local development.
//!
//! Data is lost on restart. Every backend supports fault injection so the
//! failure paths of the room log can be exercised without real outages.

mod document_store;
mod publisher;

pub use document_store::InMemoryDocumentStore;
pub use publisher::{MemoryPublisher, PublishedMessage};
