//! Room manager: the entry point for events and commands.
//!
//! The manager ties the layers together. It owns the backend, the
//! [`RoomRegistry`], the [`PresenceTracker`] and the config, and spawns
//! one actor per room. Event handling lives in `lifecycle.rs`, admin
//! commands and room creation in `commands.rs`.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use voxroom_backend::ChannelBackend;
use voxroom_presence::PresenceTracker;
use voxroom_protocol::{ChannelId, GroupId, Notice, UserId};

use crate::room::spawn_room;
use crate::{Room, RoomConfig, RoomError, RoomHandle, RoomRegistry};

/// Where published notices go.
pub type NoticeSender = mpsc::UnboundedSender<Notice>;

/// The permanent room that creates a new room for whoever enters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnPoint {
    pub channel: ChannelId,
    /// Group new rooms are created in.
    pub group: Option<GroupId>,
}

/// Manages every room and routes events and commands to them.
///
/// Cheap to clone; clones share all state. Safe to use from many tasks at
/// once: the registry and presence locks are held only for single map
/// operations, and everything per-room is serialized by the room's actor.
pub struct RoomManager<B: ChannelBackend> {
    pub(crate) backend: Arc<B>,
    pub(crate) registry: RoomRegistry,
    pub(crate) presence: Arc<Mutex<PresenceTracker>>,
    pub(crate) config: Arc<RoomConfig>,
    pub(crate) spawn: Option<SpawnPoint>,
    notices: Option<NoticeSender>,
}

impl<B: ChannelBackend> Clone for RoomManager<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            registry: self.registry.clone(),
            presence: Arc::clone(&self.presence),
            config: Arc::clone(&self.config),
            spawn: self.spawn,
            notices: self.notices.clone(),
        }
    }
}

impl<B: ChannelBackend> RoomManager<B> {
    /// Creates a manager with no rooms, no spawn room and no notice
    /// subscriber. `config` is validated first.
    pub fn new(backend: Arc<B>, config: RoomConfig) -> Self {
        Self {
            backend,
            registry: RoomRegistry::new(),
            presence: Arc::new(Mutex::new(PresenceTracker::new())),
            config: Arc::new(config.validated()),
            spawn: None,
            notices: None,
        }
    }

    /// Sets the spawn room.
    pub fn with_spawn(mut self, spawn: SpawnPoint) -> Self {
        self.spawn = Some(spawn);
        self
    }

    /// Publishes every notice to `sender` as well as returning it.
    pub fn with_notices(mut self, sender: NoticeSender) -> Self {
        self.notices = Some(sender);
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn spawn_point(&self) -> Option<SpawnPoint> {
        self.spawn
    }

    /// Returns `true` if `channel` is the spawn room.
    pub fn is_spawn(&self, channel: ChannelId) -> bool {
        self.spawn.is_some_and(|s| s.channel == channel)
    }

    /// The channel `user` is connected to, as last reported.
    pub async fn location(&self, user: UserId) -> Option<ChannelId> {
        self.presence.lock().await.location(user)
    }

    /// The tracked room `user` is in, if any.
    pub(crate) async fn current_room(&self, user: UserId) -> Result<RoomHandle, RoomError> {
        let channel = self
            .location(user)
            .await
            .ok_or(RoomError::NotInRoom(user))?;
        self.registry
            .get(channel)
            .await
            .ok_or(RoomError::NotInRoom(user))
    }

    /// The handle of a tracked room.
    pub(crate) async fn room(&self, channel: ChannelId) -> Result<RoomHandle, RoomError> {
        self.registry
            .get(channel)
            .await
            .ok_or(RoomError::UnknownRoom(channel))
    }

    pub async fn room_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn room_ids(&self) -> Vec<ChannelId> {
        self.registry.ids().await
    }

    /// Spawns an actor for `room` and registers it.
    pub(crate) async fn track(&self, room: Room) -> Result<RoomHandle, RoomError> {
        let handle = spawn_room(
            room,
            Arc::clone(&self.backend),
            self.registry.clone(),
            Arc::clone(&self.config),
        );
        if let Err(err) = self.registry.insert(handle.clone()).await {
            let _ = handle.shutdown();
            return Err(err);
        }
        Ok(handle)
    }

    /// Sends a notice to the subscriber, if there is one. A subscriber
    /// that went away is not an error.
    pub(crate) fn publish(&self, notice: &Notice) {
        if let Some(sender) = &self.notices {
            let _ = sender.send(notice.clone());
        }
    }
}
