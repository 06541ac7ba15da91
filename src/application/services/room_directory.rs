//! Room Directory
//!
//! Registry of loaded rooms. Rooms enter it on explicit creation or lazily
//! on the first lookup of a name whose metadata exists durably.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{error, info, instrument, warn};

use super::chat_room::ChatRoom;
use super::error::RoomError;
use super::RoomBackends;
use crate::domain::{Room, RoomType};
use crate::shared::error::StoreError;
use crate::shared::validation::{check_alias, check_room_name};

pub struct RoomDirectory {
    rooms: DashMap<String, Arc<ChatRoom>>,
    backends: RoomBackends,
    default_room: String,
    default_owner: String,
}

impl RoomDirectory {
    pub fn new(backends: RoomBackends) -> Self {
        Self {
            rooms: DashMap::new(),
            backends,
            default_room: "general".to_string(),
            default_owner: "admin".to_string(),
        }
    }

    /// Name and owner of the public room `ensure_default_rooms` creates.
    pub fn with_default_room(mut self, name: impl Into<String>, owner: impl Into<String>) -> Self {
        self.default_room = name.into();
        self.default_owner = owner.into();
        self
    }

    pub fn backends(&self) -> &RoomBackends {
        &self.backends
    }

    /// Create a room. The owner is always a member.
    ///
    /// The metadata record is written first; the name is taken once that
    /// insert succeeds. If the room cannot be brought up afterwards the
    /// record is deleted again.
    #[instrument(skip(self, members))]
    pub async fn create(
        &self,
        name: &str,
        owner_alias: &str,
        members: Vec<String>,
        room_type: RoomType,
    ) -> Result<Arc<ChatRoom>, RoomError> {
        check_room_name(name).map_err(RoomError::Validation)?;
        check_alias(owner_alias).map_err(RoomError::Validation)?;
        for member in &members {
            check_alias(member).map_err(RoomError::Validation)?;
        }

        if self.rooms.contains_key(name) {
            return Err(RoomError::RoomExists(name.to_string()));
        }

        let record = Room::new(name, owner_alias, members, room_type);
        let rooms = &self.backends.rooms;
        match self
            .backends
            .policy
            .write("rooms.insert", || rooms.insert(&record))
            .await
        {
            Ok(_) => {}
            Err(StoreError::Duplicate(_)) => return Err(RoomError::RoomExists(name.to_string())),
            Err(e) => return Err(RoomError::from_store(name, None, e)),
        }

        let room = Arc::new(ChatRoom::new(name, self.backends.clone()));
        let restored = match room.restore().await {
            Ok(restored) => restored,
            Err(e) => {
                self.discard_record(name).await;
                return Err(e);
            }
        };
        if !restored {
            return Err(RoomError::RoomNotFound(name.to_string()));
        }

        // A concurrent `get` may have restored the fresh record already.
        let room = match self.rooms.entry(name.to_string()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => slot.insert(room).clone(),
        };

        info!(room = %name, owner = %owner_alias, room_type = %room_type, "Room created");
        Ok(room)
    }

    async fn discard_record(&self, name: &str) {
        let rooms = &self.backends.rooms;
        if let Err(e) = self
            .backends
            .policy
            .write("rooms.delete", || rooms.delete(name))
            .await
        {
            error!(room = %name, error = %e, "Could not discard metadata of a failed room");
        }
    }

    /// Look a room up, restoring it from durable metadata when it is not loaded.
    pub async fn get(&self, name: &str) -> Result<Arc<ChatRoom>, RoomError> {
        if let Some(room) = self.rooms.get(name) {
            return Ok(room.clone());
        }

        let room = Arc::new(ChatRoom::new(name, self.backends.clone()));
        if !room.restore().await? {
            return Err(RoomError::RoomNotFound(name.to_string()));
        }

        let room = self.rooms.entry(name.to_string()).or_insert(room).clone();
        Ok(room)
    }

    /// Loaded rooms the alias is a member of, sorted by name.
    pub fn find_by_member(&self, alias: &str) -> Vec<Arc<ChatRoom>> {
        self.filtered(|room| room.has_member(alias))
    }

    /// Loaded rooms the alias owns, sorted by name.
    pub fn find_by_owner(&self, alias: &str) -> Vec<Arc<ChatRoom>> {
        self.filtered(|room| room.is_owned_by(alias))
    }

    /// Every loaded room, sorted by name.
    pub fn list(&self) -> Vec<Arc<ChatRoom>> {
        self.filtered(|_| true)
    }

    fn filtered<F>(&self, predicate: F) -> Vec<Arc<ChatRoom>>
    where
        F: Fn(&ChatRoom) -> bool,
    {
        let mut rooms: Vec<Arc<ChatRoom>> = self
            .rooms
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        rooms.sort_by(|a, b| a.name().cmp(b.name()));
        rooms
    }

    /// Remove a room from the directory and delete its metadata record.
    ///
    /// The message log and the sequence counter are kept; creating the room
    /// again brings its history back.
    #[instrument(skip(self))]
    pub async fn remove(&self, name: &str) -> Result<(), RoomError> {
        let rooms = &self.backends.rooms;
        let deleted = self
            .backends
            .policy
            .write("rooms.delete", || rooms.delete(name))
            .await
            .map_err(|e| RoomError::from_store(name, None, e))?;

        let loaded = self.rooms.remove(name).map(|(_, room)| room);
        if let Some(room) = &loaded {
            room.deactivate().await;
        }

        if !deleted && loaded.is_none() {
            return Err(RoomError::RoomNotFound(name.to_string()));
        }

        info!(room = %name, "Room removed");
        Ok(())
    }

    /// Delete a room's message log, then remove the room. Returns the number
    /// of deleted messages.
    ///
    /// If the log cannot be deleted the room stays as it was. If the log is
    /// gone but the metadata record survives, the room is unloaded so the
    /// next lookup restores it with an empty log.
    #[instrument(skip(self))]
    pub async fn purge(&self, name: &str) -> Result<u64, RoomError> {
        let room = self.get(name).await?;
        let deleted = room.purge().await?;

        if let Err(e) = self.remove(name).await {
            self.rooms.remove(name);
            error!(
                room = %name,
                deleted,
                error = %e,
                "Message log purged but the room could not be removed"
            );
            return Err(e);
        }
        Ok(deleted)
    }

    /// Restore every room with a metadata record. A room that fails to
    /// restore is logged and skipped. Returns the number of loaded rooms.
    pub async fn load_all(&self) -> Result<usize, RoomError> {
        let rooms = &self.backends.rooms;
        let records = self
            .backends
            .policy
            .read("rooms.list", || rooms.list())
            .await
            .map_err(|e| RoomError::from_store("*", None, e))?;

        let mut loaded = 0;
        for record in records {
            match self.get(&record.name).await {
                Ok(_) => loaded += 1,
                Err(e) => warn!(room = %record.name, error = %e, "Skipping room at startup"),
            }
        }

        info!(rooms = loaded, "Rooms loaded");
        Ok(loaded)
    }

    /// Create the default public room if it does not exist.
    /// Returns true when it was created.
    pub async fn ensure_default_rooms(&self) -> Result<bool, RoomError> {
        match self.get(&self.default_room).await {
            Ok(_) => return Ok(false),
            Err(RoomError::RoomNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        match self
            .create(
                &self.default_room,
                &self.default_owner,
                Vec::new(),
                RoomType::Public,
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(RoomError::RoomExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
