//! Room directory: creates rooms, finds them, and forgets them.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use duelhall_protocol::{GameType, RoomId, UserId};

use crate::actor::spawn_room;
use crate::room::{Room, RoomSnapshot};
use crate::{RoomConfig, RoomError, RoomHandle};

/// Filter for [`RoomDirectory::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomFilter {
    pub game_type: Option<GameType>,
}

/// Every live room, keyed by id.
///
/// Lookups and inserts on different rooms proceed in parallel. Handles
/// are cloned out of the map before anything is awaited, so no shard
/// lock is held while talking to a room actor.
#[derive(Debug)]
pub struct RoomDirectory {
    rooms: DashMap<RoomId, RoomHandle>,
    next_id: AtomicU64,
    config: RoomConfig,
}

impl RoomDirectory {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates a room with `host` seated and spawns its actor.
    ///
    /// # Errors
    /// [`RoomError::InvalidName`] if `name` is blank.
    pub fn create_room(
        &self,
        host: UserId,
        name: &str,
        game_type: GameType,
        private: bool,
    ) -> Result<RoomHandle, RoomError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoomError::InvalidName);
        }

        let room_id = RoomId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let room = Room::new(room_id, name, game_type, host, private, self.config.clone());
        let handle = spawn_room(room, self.config.command_buffer);
        self.rooms.insert(room_id, handle.clone());
        tracing::info!(%room_id, host = %host, game = %game_type, private, "room created");
        Ok(handle)
    }

    pub fn get(&self, room_id: RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(&room_id)
            .map(|entry| entry.value().clone())
            .ok_or(RoomError::NotFound(room_id))
    }

    pub fn contains(&self, room_id: RoomId) -> bool {
        self.rooms.contains_key(&room_id)
    }

    /// Drops the directory's handle. The actor itself stops when told to
    /// or once every handle is gone.
    pub fn remove(&self, room_id: RoomId) -> Option<RoomHandle> {
        let removed = self.rooms.remove(&room_id).map(|(_, handle)| handle);
        if removed.is_some() {
            tracing::info!(%room_id, "room destroyed");
        }
        removed
    }

    /// Handles for every room, oldest first.
    pub fn handles(&self) -> Vec<RoomHandle> {
        let mut handles: Vec<RoomHandle> =
            self.rooms.iter().map(|entry| entry.value().clone()).collect();
        handles.sort_by_key(|handle| (handle.created_at(), handle.room_id()));
        handles
    }

    /// Snapshots of every room matching `filter`, oldest first.
    ///
    /// Rooms that stop while being listed are skipped.
    pub async fn list(&self, filter: RoomFilter) -> Vec<RoomSnapshot> {
        let mut snapshots = Vec::new();
        for handle in self.handles() {
            if let Ok(snapshot) = handle.snapshot().await {
                if filter.game_type.is_none_or(|wanted| wanted == snapshot.game_type) {
                    snapshots.push(snapshot);
                }
            }
        }
        snapshots
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Stops every room and empties the directory.
    pub async fn shutdown_all(&self) {
        let handles = self.handles();
        self.rooms.clear();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
        tracing::info!("all rooms shut down");
    }
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
