//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use room_log::application::services::{RoomBackends, RoomDirectory};
use room_log::config::Settings;
use room_log::infrastructure::memory::{InMemoryDocumentStore, MemoryPublisher};
use room_log::shared::retry::{RetryConfig, StorePolicy};
use room_log::startup::{build_router, AppState};

/// Settings for tests: in-memory storage, short deadlines, fast retries.
pub fn test_settings() -> Settings {
    let mut settings = Settings::in_memory().expect("in-memory settings");
    settings.store.timeout_ms = 200;
    settings.store.max_attempts = 2;
    settings.store.initial_backoff_ms = 1;
    settings.store.max_backoff_ms = 5;
    settings
}

/// Storage policy matching `test_settings`.
pub fn test_policy() -> StorePolicy {
    StorePolicy::new(
        std::time::Duration::from_millis(200),
        RetryConfig {
            max_attempts: 2,
            initial_delay: std::time::Duration::from_millis(1),
            max_delay: std::time::Duration::from_millis(5),
            ..RetryConfig::default()
        },
    )
}

/// A room directory over one in-memory store and a recording publisher.
pub struct TestBackends {
    pub store: Arc<InMemoryDocumentStore>,
    pub publisher: Arc<MemoryPublisher>,
    pub backends: RoomBackends,
}

impl TestBackends {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::over(Arc::new(InMemoryDocumentStore::new()), capacity)
    }

    /// Backends over an existing store, as after a process restart.
    pub fn over(store: Arc<InMemoryDocumentStore>, capacity: usize) -> Self {
        let publisher = Arc::new(MemoryPublisher::new());
        let backends = RoomBackends::new(
            store.clone(),
            store.clone(),
            store.clone(),
            publisher.clone(),
        )
        .with_policy(test_policy())
        .with_cache_capacity(capacity);
        Self {
            store,
            publisher,
            backends,
        }
    }

    pub fn directory(&self) -> RoomDirectory {
        RoomDirectory::new(self.backends.clone())
    }
}

/// Test application builder
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryDocumentStore>,
}

impl TestApp {
    /// Create a test application over a fresh in-memory store
    pub async fn new() -> Self {
        Self::with_settings(test_settings()).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let store = Arc::new(InMemoryDocumentStore::new());
        let state = AppState::in_memory(settings, store.clone());
        state.prepare_rooms().await.expect("default rooms");

        Self {
            router: build_router(state.clone()),
            state,
            store,
        }
    }

    async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri, None).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request("DELETE", uri, None).await
    }

    pub async fn register(&self, alias: &str) {
        let (status, _) = self
            .post_json("/api/v1/users", json!({ "alias": alias }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "registering {alias}");
    }

    pub async fn create_room(
        &self,
        name: &str,
        owner: &str,
        members: &[&str],
        room_type: &str,
    ) -> (StatusCode, Value) {
        self.post_json(
            "/api/v1/rooms",
            json!({
                "name": name,
                "owner_alias": owner,
                "members": members,
                "room_type": room_type,
            }),
        )
        .await
    }

    pub async fn send(
        &self,
        room: &str,
        from: &str,
        to: Option<&str>,
        text: &str,
    ) -> (StatusCode, Value) {
        self.post_json(
            &format!("/api/v1/rooms/{room}/messages"),
            json!({ "alias": from, "to_alias": to, "message": text }),
        )
        .await
    }
}

/// Sequence numbers of a JSON message list
pub fn sequences(messages: &Value) -> Vec<i64> {
    messages
        .as_array()
        .expect("message list")
        .iter()
        .map(|m| m["sequence_num"].as_i64().expect("sequence_num"))
        .collect()
}

/// Generate a unique alias from the random tail of a v7 id
pub fn unique_alias() -> String {
    let id = uuid::Uuid::now_v7().simple().to_string();
    format!("user_{}", &id[id.len() - 12..])
}
