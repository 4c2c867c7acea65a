//! The room registry: which channels are tracked rooms.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use voxroom_protocol::ChannelId;

use crate::{RoomError, RoomHandle};

/// Process-wide map from channel id to the actor owning that room.
///
/// Injected, never global: the manager creates one and hands clones to
/// every actor so an actor can remove its own entry when its room is
/// destroyed. The lock is only held for the map operation itself; all
/// per-room work happens inside the actors.
#[derive(Debug, Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<ChannelId, RoomHandle>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `id`, if tracked.
    pub async fn get(&self, id: ChannelId) -> Option<RoomHandle> {
        self.rooms.read().await.get(&id).cloned()
    }

    /// Starts tracking a room.
    ///
    /// # Errors
    /// [`RoomError::AlreadyTracked`] if the id is live already; ids are
    /// never reused while an entry exists.
    pub async fn insert(&self, handle: RoomHandle) -> Result<(), RoomError> {
        let mut rooms = self.rooms.write().await;
        let id = handle.room_id();
        if rooms.contains_key(&id) {
            return Err(RoomError::AlreadyTracked(id));
        }
        rooms.insert(id, handle);
        Ok(())
    }

    /// Stops tracking a room and returns its handle.
    pub async fn remove(&self, id: ChannelId) -> Option<RoomHandle> {
        self.rooms.write().await.remove(&id)
    }

    pub async fn contains(&self, id: ChannelId) -> bool {
        self.rooms.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    /// Lists every tracked room id.
    pub async fn ids(&self) -> Vec<ChannelId> {
        self.rooms.read().await.keys().copied().collect()
    }

    /// Returns cloned handles to every tracked room, so callers can talk
    /// to the actors without holding the registry lock.
    pub async fn handles(&self) -> Vec<RoomHandle> {
        self.rooms.read().await.values().cloned().collect()
    }
}
