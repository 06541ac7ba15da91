//! Broker Module
//!
//! Publishers that hand persisted messages to subscribers.

mod redis_publisher;

pub use redis_publisher::{NoopPublisher, PublishEnvelope, RedisPublisher};
