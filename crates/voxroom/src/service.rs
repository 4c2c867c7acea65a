//! `VoxroomService` builder and event loop.
//!
//! This is the entry point for running Voxroom against a chat platform.
//! It ties the layers together: backend → presence → rooms.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use voxroom_backend::{ChannelBackend, ChannelSpec, UserLimit};
use voxroom_protocol::{ChannelId, TransitionEvent};
use voxroom_room::{NoticeSender, RoomManager, SpawnPoint};

use crate::{ServiceConfig, VoxroomError};

/// Builder for configuring and starting a Voxroom service.
///
/// # Example
///
/// ```rust,ignore
/// use voxroom::prelude::*;
///
/// let service = VoxroomServiceBuilder::new()
///     .config(ServiceConfig::from_env()?)
///     .build(Arc::new(my_backend))
///     .await?;
/// service.run(events).await
/// ```
pub struct VoxroomServiceBuilder {
    config: ServiceConfig,
    notices: Option<NoticeSender>,
}

impl VoxroomServiceBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
            notices: None,
        }
    }

    /// Sets the service configuration.
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Publishes every lifecycle and command notice to `sender`.
    pub fn notices(mut self, sender: NoticeSender) -> Self {
        self.notices = Some(sender);
        self
    }

    /// Provisions the spawn room on `backend` and builds the service.
    ///
    /// The category is created if missing. Unless a spawn channel id is
    /// configured, the spawn room is looked up by name inside the
    /// category and created there when absent.
    pub async fn build<B: ChannelBackend>(
        self,
        backend: Arc<B>,
    ) -> Result<VoxroomService<B>, VoxroomError> {
        let group = backend.ensure_group(&self.config.category_name).await?;

        let channel = match self.config.spawn_channel {
            Some(channel) => channel,
            None => {
                let name = &self.config.spawn_channel_name;
                match backend.find_channel(name, Some(group)).await? {
                    Some(channel) => channel,
                    None => {
                        let channel = backend
                            .create_channel(ChannelSpec {
                                name: name.clone(),
                                parent: Some(group),
                                limit: UserLimit::Unlimited,
                                bitrate_kbps: None,
                                permissions: Vec::new(),
                            })
                            .await?;
                        tracing::info!(spawn = %channel, %group, "spawn room created");
                        channel
                    }
                }
            }
        };

        let mut manager = RoomManager::new(backend, self.config.room.clone()).with_spawn(
            SpawnPoint {
                channel,
                group: Some(group),
            },
        );
        if let Some(sender) = self.notices {
            manager = manager.with_notices(sender);
        }

        Ok(VoxroomService {
            manager,
            config: self.config,
            spawn: channel,
        })
    }
}

impl Default for VoxroomServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured Voxroom service.
///
/// Call [`run()`](Self::run) to start consuming transition events. Admin
/// commands go through [`manager()`](Self::manager).
pub struct VoxroomService<B: ChannelBackend> {
    manager: RoomManager<B>,
    config: ServiceConfig,
    spawn: ChannelId,
}

impl<B: ChannelBackend> VoxroomService<B> {
    /// The room manager: command handlers, room creation, lookups.
    pub fn manager(&self) -> &RoomManager<B> {
        &self.manager
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The channel users enter to get a room of their own.
    pub fn spawn_channel(&self) -> ChannelId {
        self.spawn
    }

    /// Starts the idle reaper, or returns `None` if it is disabled.
    ///
    /// Every `reap_interval` the reaper removes tracked rooms that are
    /// empty and older than `idle_grace`.
    pub fn spawn_reaper(&self) -> Option<JoinHandle<()>> {
        let period = self.config.reap_interval;
        if period.is_zero() {
            return None;
        }
        let grace = self.config.idle_grace;
        let manager = self.manager.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let reaped = manager.reap_idle(grace).await;
                if !reaped.is_empty() {
                    tracing::debug!(count = reaped.len(), "idle rooms reaped");
                }
            }
        }))
    }

    /// Runs the event loop until `events` is closed.
    ///
    /// Events are dispatched in arrival order, so each room sees its own
    /// events in order; waiting for the rooms' answers happens on separate
    /// tasks. The idle reaper runs alongside. On return every dispatched
    /// event has been settled.
    pub async fn run(self, mut events: mpsc::Receiver<TransitionEvent>) -> Result<(), VoxroomError> {
        tracing::info!(spawn = %self.spawn, "voxroom service running");
        let reaper = self.spawn_reaper();
        let mut settling = JoinSet::new();

        while let Some(event) = events.recv().await {
            let ticket = self.manager.dispatch_event(event).await;
            if ticket.is_empty() {
                continue;
            }
            settling.spawn(async move {
                if let Err(e) = ticket.settle().await {
                    tracing::debug!(error = %e, "event settled with error");
                }
            });
            while settling.try_join_next().is_some() {}
        }

        while settling.join_next().await.is_some() {}
        if let Some(reaper) = reaper {
            reaper.abort();
        }
        tracing::info!("event stream closed, voxroom service stopped");
        Ok(())
    }
}
