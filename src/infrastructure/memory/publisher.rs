//! Recording publisher.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::MessagePublisher;
use crate::shared::error::StoreError;

/// One call to `publish`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub destination: String,
    pub payload: Vec<u8>,
    pub headers: BTreeMap<String, String>,
}

/// Keeps every published message in memory; can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    published: Mutex<Vec<PublishedMessage>>,
    failing: AtomicBool,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl MessagePublisher for MemoryPublisher {
    async fn publish(
        &self,
        destination: &str,
        payload: &[u8],
        headers: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("broker offline".into()));
        }
        self.published.lock().push(PublishedMessage {
            destination: destination.to_string(),
            payload: payload.to_vec(),
            headers: headers.clone(),
        });
        Ok(())
    }
}
