//! Chat Room
//!
//! One room's durable log: sequence allocation, persistence, the in-memory
//! window and ordered reads.
//!
//! A send is allocate, then append, then cache, then publish. A sequence
//! number that was allocated but never confirmed as stored is recorded as a
//! gap and never handed out again.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use super::error::RoomError;
use super::RoomBackends;
use crate::domain::{
    Message, MessageDraft, MessageKind, MessageQuery, Recipient, Room, BROADCAST_ALIAS,
};
use crate::infrastructure::cache::{keys, RoomCache};
use crate::infrastructure::metrics;
use crate::shared::error::StoreError;
use crate::shared::validation::{check_alias, check_message_text, check_recipient};

/// Lifecycle of a room. Only `Active` rooms accept sends and reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomState {
    #[default]
    Uninitialized,
    Restoring,
    Active,
}

impl RoomState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Restoring => "restoring",
            Self::Active => "active",
        }
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a sequence number has no stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapReason {
    /// The append failed.
    NotPersisted,
    /// The append ran past its deadline; it may or may not have landed.
    Unconfirmed,
}

impl GapReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotPersisted => "not_persisted",
            Self::Unconfirmed => "unconfirmed",
        }
    }
}

/// A consumed sequence number without a confirmed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceGap {
    pub sequence_num: i64,
    pub reason: GapReason,
    pub recorded_at: DateTime<Utc>,
}

pub struct ChatRoom {
    name: String,
    backends: RoomBackends,
    metadata: RwLock<Option<Room>>,
    cache: RoomCache,
    state: RwLock<RoomState>,
    /// Held shared by sends and reads, exclusively by restore/deactivate/purge.
    gate: tokio::sync::RwLock<()>,
    gaps: Mutex<Vec<SequenceGap>>,
}

impl std::fmt::Debug for ChatRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRoom")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl ChatRoom {
    /// Create an uninitialized room handle. Call `restore` before use.
    pub fn new(name: impl Into<String>, backends: RoomBackends) -> Self {
        let cache = RoomCache::new(backends.cache_capacity);
        Self {
            name: name.into(),
            backends,
            metadata: RwLock::new(None),
            cache,
            state: RwLock::new(RoomState::Uninitialized),
            gate: tokio::sync::RwLock::new(()),
            gaps: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RoomState {
        *self.state.read()
    }

    pub fn metadata(&self) -> Option<Room> {
        self.metadata.read().clone()
    }

    pub fn cache(&self) -> &RoomCache {
        &self.cache
    }

    /// Sequence numbers consumed without a confirmed message, in allocation order.
    pub fn failed_sequences(&self) -> Vec<SequenceGap> {
        self.gaps.lock().clone()
    }

    pub fn has_member(&self, alias: &str) -> bool {
        self.metadata
            .read()
            .as_ref()
            .is_some_and(|room| room.has_member(alias))
    }

    pub fn is_owned_by(&self, alias: &str) -> bool {
        self.metadata
            .read()
            .as_ref()
            .is_some_and(|room| room.is_owned_by(alias))
    }

    /// Load metadata and rebuild the cache from the durable log.
    ///
    /// Returns `Ok(false)` when no metadata record exists. Sends and reads
    /// wait while the rebuild runs. On failure the previous state is kept.
    #[instrument(skip(self), fields(room = %self.name))]
    pub async fn restore(&self) -> Result<bool, RoomError> {
        let _gate = self.gate.write().await;
        let previous = self.set_state(RoomState::Restoring);

        match self.load().await {
            Ok(Some(count)) => {
                self.set_state(RoomState::Active);
                info!(
                    messages = count,
                    cached = self.cache.len(),
                    "Room restored"
                );
                Ok(true)
            }
            Ok(None) => {
                self.set_state(previous);
                debug!("No metadata record for room");
                Ok(false)
            }
            Err(e) => {
                self.set_state(previous);
                error!(error = %e, "Room restore failed");
                Err(e)
            }
        }
    }

    async fn load(&self) -> Result<Option<usize>, RoomError> {
        let name = self.name.as_str();
        let policy = &self.backends.policy;
        let rooms = &self.backends.rooms;
        let store = &self.backends.store;

        let metadata = policy
            .read("rooms.find_by_name", || rooms.find_by_name(name))
            .await
            .map_err(|e| RoomError::from_store(name, None, e))?;
        let Some(metadata) = metadata else {
            return Ok(None);
        };

        let replayed: Vec<Message> = policy
            .read("messages.replay", || store.replay(name).try_collect())
            .await
            .map_err(|e| RoomError::from_store(name, None, e))?;

        let count = replayed.len();
        self.cache.rebuild(replayed);
        *self.metadata.write() = Some(metadata);

        Ok(Some(count))
    }

    /// Take the room out of service: later sends and reads fail with
    /// `NotActive` until it is restored again.
    pub async fn deactivate(&self) {
        let _gate = self.gate.write().await;
        self.set_state(RoomState::Uninitialized);
        self.cache.clear(false);
    }

    /// Delete the room's whole log and deactivate it. The sequence counter
    /// is left untouched, so numbers are never reissued.
    #[instrument(skip(self), fields(room = %self.name))]
    pub async fn purge(&self) -> Result<u64, RoomError> {
        let _gate = self.gate.write().await;
        let name = self.name.as_str();
        let store = &self.backends.store;

        let deleted = self
            .backends
            .policy
            .write("messages.purge", || store.purge(name))
            .await
            .map_err(|e| RoomError::from_store(name, None, e))?;

        self.set_state(RoomState::Uninitialized);
        self.cache.clear(true);
        self.gaps.lock().clear();
        info!(deleted, "Room log purged");

        Ok(deleted)
    }

    /// Append a new message to the room's log.
    ///
    /// `to_alias = None` addresses the room's default recipient: the other
    /// member of a private room, everyone otherwise.
    #[instrument(skip(self, text), fields(room = %self.name))]
    pub async fn send_message(
        &self,
        text: &str,
        from_alias: &str,
        to_alias: Option<&str>,
    ) -> Result<Message, RoomError> {
        check_message_text(text).map_err(RoomError::Validation)?;
        check_alias(from_alias).map_err(RoomError::Validation)?;
        if let Some(to_alias) = to_alias {
            check_recipient(to_alias).map_err(RoomError::Validation)?;
        }

        let stored = {
            let _gate = self.gate.read().await;
            self.ensure_active()?;

            let to_alias = match to_alias {
                Some(alias) => alias.to_string(),
                None => self.default_recipient(from_alias),
            };
            self.commit(MessageDraft::new(&self.name, text, from_alias, to_alias))
                .await?
        };

        self.publish(&stored).await;
        Ok(Message::clone(&stored))
    }

    /// Accept a message that arrived from the broker.
    ///
    /// It gets a number in this room's log like any send, with kind
    /// `received`. The sender's timestamp is kept. It is not published again.
    #[instrument(skip(self, message), fields(room = %self.name))]
    pub async fn receive_message(&self, message: Message) -> Result<Message, RoomError> {
        check_message_text(&message.text).map_err(RoomError::Validation)?;

        let _gate = self.gate.read().await;
        self.ensure_active()?;

        let props = message.properties;
        let draft = MessageDraft::new(&self.name, message.text, props.from_alias, props.to_alias)
            .with_kind(MessageKind::Received)
            .with_sent_at(props.sent_at);

        let stored = self.commit(draft).await?;
        Ok(Message::clone(&stored))
    }

    async fn commit(&self, draft: MessageDraft) -> Result<Arc<Message>, RoomError> {
        let name = self.name.as_str();
        let policy = &self.backends.policy;
        let allocator = &self.backends.allocator;
        let store = &self.backends.store;

        let sequence_num = match policy.write("sequence.next", || allocator.next(name)).await {
            Ok(seq) => seq,
            Err(StoreError::Timeout(_)) => {
                metrics::record_send("timeout");
                warn!("Sequence allocation timed out");
                return Err(RoomError::Timeout {
                    room: name.to_string(),
                    sequence_num: None,
                });
            }
            Err(source) => {
                metrics::record_send("allocation_unavailable");
                warn!(error = %source, "Sequence allocation failed");
                return Err(RoomError::AllocationUnavailable {
                    room: name.to_string(),
                    source,
                });
            }
        };

        let message = draft.sequenced(sequence_num);
        let stored = match policy
            .write("messages.append", || store.append(&message))
            .await
        {
            Ok(stored) => Arc::new(stored),
            Err(StoreError::Timeout(_)) => {
                // The insert may still land; the window can no longer vouch
                // for the whole log.
                self.cache.mark_incomplete();
                self.record_gap(sequence_num, GapReason::Unconfirmed);
                metrics::record_send("timeout");
                return Err(RoomError::Timeout {
                    room: name.to_string(),
                    sequence_num: Some(sequence_num),
                });
            }
            Err(source) => {
                self.record_gap(sequence_num, GapReason::NotPersisted);
                metrics::record_send("persistence_error");
                error!(sequence_num, error = %source, "Append failed after allocation");
                return Err(RoomError::Persistence {
                    room: name.to_string(),
                    sequence_num: Some(sequence_num),
                    source,
                });
            }
        };

        self.cache.put(stored.clone());
        metrics::record_send("ok");
        debug!(sequence_num, "Message stored");

        Ok(stored)
    }

    async fn publish(&self, message: &Message) {
        let payload = match serde_json::to_vec(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Could not encode message for the broker");
                return;
            }
        };

        let props = &message.properties;
        let headers = BTreeMap::from([
            ("room".to_string(), self.name.clone()),
            ("sequence_num".to_string(), props.sequence_num.to_string()),
            ("from_alias".to_string(), props.from_alias.clone()),
            ("to_alias".to_string(), props.to_alias.clone()),
            ("kind".to_string(), props.kind.to_string()),
        ]);

        if let Err(e) = self
            .backends
            .publisher
            .publish(&keys::room_channel(&self.name), &payload, &headers)
            .await
        {
            warn!(
                room = %self.name,
                sequence_num = props.sequence_num,
                error = %e,
                "Publish failed; message is stored"
            );
        }
    }

    /// Messages for `recipient`, oldest first, at most `limit` of them.
    ///
    /// Served from the cache alone when it mirrors the whole log and already
    /// holds `limit` matching entries. Otherwise the store is queried and its
    /// rows are merged with the cached ones by sequence number, so entries
    /// written by other instances on the same store are included.
    #[instrument(skip(self), fields(room = %self.name))]
    pub async fn get_messages(
        &self,
        recipient: &Recipient,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, RoomError> {
        let _gate = self.gate.read().await;
        self.ensure_active()?;

        let snapshot = self.cache.snapshot();
        let cached: Vec<Message> = snapshot
            .entries()
            .iter()
            .filter(|m| recipient.matches(m))
            .map(|m| Message::clone(m))
            .collect();

        if let Some(limit) = limit {
            if snapshot.is_complete() && cached.len() >= limit {
                metrics::record_cache_read("hit");
                return Ok(cached.into_iter().take(limit).collect());
            }
        }

        metrics::record_cache_read("fallback");
        let query = MessageQuery::for_recipient(recipient);
        let name = self.name.as_str();
        let store = &self.backends.store;
        let stored = self
            .backends
            .policy
            .read("messages.query", || store.query(name, &query, limit))
            .await
            .map_err(|e| RoomError::from_store(name, None, e))?;

        let mut merged: BTreeMap<i64, Message> = stored
            .into_iter()
            .map(|m| (m.sequence_num(), m))
            .collect();
        for message in cached {
            merged.entry(message.sequence_num()).or_insert(message);
        }

        Ok(merged
            .into_values()
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    /// Oldest message whose text equals `text`.
    ///
    /// A cache hit is final only while the cache mirrors the whole log;
    /// otherwise the store may hold an older match.
    #[instrument(skip(self), fields(room = %self.name))]
    pub async fn find_message(&self, text: &str) -> Result<Option<Message>, RoomError> {
        let _gate = self.gate.read().await;
        self.ensure_active()?;

        let snapshot = self.cache.snapshot();
        let cached = snapshot.find_by_text(text).map(|m| Message::clone(m));

        if cached.is_some() && snapshot.is_complete() {
            metrics::record_cache_read("hit");
            return Ok(cached);
        }

        metrics::record_cache_read("fallback");
        let mut query = MessageQuery::default().with_text(text);
        if let Some(hit) = &cached {
            query = query.below(hit.sequence_num());
        }

        let name = self.name.as_str();
        let store = &self.backends.store;
        let older = self
            .backends
            .policy
            .read("messages.query", || store.query(name, &query, Some(1)))
            .await
            .map_err(|e| RoomError::from_store(name, None, e))?;

        Ok(older.into_iter().next().or(cached))
    }

    /// Last sequence number handed out for this room, 0 if none.
    pub async fn last_sequence(&self) -> Result<i64, RoomError> {
        let name = self.name.as_str();
        let allocator = &self.backends.allocator;
        self.backends
            .policy
            .read("sequence.current", || allocator.current(name))
            .await
            .map_err(|e| RoomError::from_store(name, None, e))
    }

    fn default_recipient(&self, from_alias: &str) -> String {
        self.metadata
            .read()
            .as_ref()
            .map_or(BROADCAST_ALIAS, |room| room.default_recipient(from_alias))
            .to_string()
    }

    fn ensure_active(&self) -> Result<(), RoomError> {
        let state = self.state();
        if state != RoomState::Active {
            return Err(RoomError::NotActive {
                room: self.name.clone(),
                state,
            });
        }
        Ok(())
    }

    fn set_state(&self, next: RoomState) -> RoomState {
        std::mem::replace(&mut *self.state.write(), next)
    }

    fn record_gap(&self, sequence_num: i64, reason: GapReason) {
        metrics::record_gap(reason.as_str());
        warn!(
            room = %self.name,
            sequence_num,
            reason = reason.as_str(),
            "Sequence number consumed without a confirmed message"
        );
        self.gaps.lock().push(SequenceGap {
            sequence_num,
            reason,
            recorded_at: Utc::now(),
        });
    }
}
