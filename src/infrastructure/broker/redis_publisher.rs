//! Redis Pub/Sub Publisher
//!
//! Publishes each message on the room's channel as a JSON envelope that
//! carries the headers next to the payload, since Redis pub/sub has no
//! header frame of its own.

use std::collections::BTreeMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::MessagePublisher;
use crate::shared::error::StoreError;

/// Wire format of a published message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishEnvelope {
    pub headers: BTreeMap<String, String>,
    pub payload: String,
}

impl PublishEnvelope {
    pub fn new(payload: &[u8], headers: &BTreeMap<String, String>) -> Self {
        Self {
            headers: headers.clone(),
            payload: String::from_utf8_lossy(payload).into_owned(),
        }
    }
}

#[derive(Clone)]
pub struct RedisPublisher {
    conn: ConnectionManager,
}

impl RedisPublisher {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl MessagePublisher for RedisPublisher {
    #[instrument(skip(self, payload, headers), level = "debug")]
    async fn publish(
        &self,
        destination: &str,
        payload: &[u8],
        headers: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let envelope = serde_json::to_string(&PublishEnvelope::new(payload, headers))
            .map_err(|e| StoreError::Backend(format!("envelope serialization failed: {}", e)))?;
        let mut conn = self.conn.clone();

        let receivers: i64 = conn.publish(destination, envelope).await?;
        debug!(destination = %destination, receivers = receivers, "Published message");

        Ok(())
    }
}

/// Publisher used when no broker is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl MessagePublisher for NoopPublisher {
    async fn publish(
        &self,
        _destination: &str,
        _payload: &[u8],
        _headers: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}
