//! Admin commands and explicit room creation.

use serde::{Deserialize, Serialize};
use voxroom_backend::{ChannelBackend, ChannelSpec, PermissionOverride, PermissionTarget};
use voxroom_protocol::{ChannelId, Command, Notice, SizePreset, UserId};

use crate::plan::{everyone_connect, validate_limit, validate_name};
use crate::{CommandOutcome, Effect, Room, RoomError, RoomHandle, RoomManager, RoomSnapshot};

/// Arguments of an explicit create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// `None` names the room after its owner.
    pub name: Option<String>,
    /// `0` means unlimited.
    pub limit: i64,
}

impl<B: ChannelBackend> RoomManager<B> {
    /// Runs an admin command against the room `actor` is connected to.
    ///
    /// # Errors
    /// - [`RoomError::NotInRoom`] if the actor is not in a tracked room,
    ///   including a room destroyed while the command was queued
    /// - [`RoomError::NotAuthorized`], [`RoomError::InvalidArgument`],
    ///   [`RoomError::NotFound`] from validation; nothing was changed
    /// - [`RoomError::ExternalEffectFailed`] if the change was committed
    ///   but the backend failed to apply it; [`Notice::Updated`] is still
    ///   published
    /// - [`RoomError::Lookup`] if the room's occupants could not be read;
    ///   nothing was changed
    pub async fn execute(
        &self,
        actor: UserId,
        command: Command,
    ) -> Result<CommandOutcome, RoomError> {
        let handle = self.current_room(actor).await?;
        let channel = handle.room_id();
        let action = command.action();

        let result = handle
            .execute(actor, command)
            .await
            .map_err(|err| match err {
                RoomError::Unavailable(_) => RoomError::NotInRoom(actor),
                other => other,
            });

        // A failed effect still leaves the new state committed.
        let committed = matches!(result, Ok(_) | Err(RoomError::ExternalEffectFailed(_)));
        if committed && !action.is_read_only() {
            self.publish(&Notice::Updated {
                channel,
                actor,
                action,
            });
        }
        result
    }

    /// Creates a room owned by `owner` and publishes [`Notice::Created`].
    ///
    /// The channel is created with everyone allowed to connect and the
    /// owner allowed to connect and manage. If the owner is in voice they
    /// are moved into it; if that move fails the new room is torn down
    /// again and the error returned.
    pub async fn create_room(
        &self,
        owner: UserId,
        request: CreateRequest,
    ) -> Result<RoomSnapshot, RoomError> {
        let snapshot = self.create_unpublished(owner, request).await?;
        self.publish(&Notice::Created {
            channel: snapshot.id,
            owner,
            name: snapshot.name.clone(),
        });
        Ok(snapshot)
    }

    pub(crate) async fn create_unpublished(
        &self,
        owner: UserId,
        request: CreateRequest,
    ) -> Result<RoomSnapshot, RoomError> {
        let limit = validate_limit(request.limit, &self.config)?;
        let name = match request.name {
            Some(name) => validate_name(&name, &self.config)?,
            None => {
                let display = self.backend.display_name(owner).await?;
                self.config.default_name_for(&display)
            }
        };

        let spec = ChannelSpec {
            name: name.clone(),
            parent: self.spawn.and_then(|s| s.group),
            limit,
            bitrate_kbps: Some(self.config.default_bitrate_kbps),
            permissions: vec![
                (PermissionTarget::Everyone, everyone_connect(false)),
                (PermissionTarget::User(owner), PermissionOverride::MANAGER),
            ],
        };
        let channel = self.backend.create_channel(spec).await?;

        let room = Room::new(channel, owner, name, limit, self.config.default_bitrate_kbps);
        let snapshot = room.snapshot();
        let handle = self.track(room).await?;
        tracing::info!(room_id = %channel, %owner, name = %snapshot.name, "room created");

        if self.location(owner).await.is_some() {
            if let Err(err) = self.backend.move_user(owner, Some(channel)).await {
                tracing::warn!(
                    room_id = %channel,
                    %owner,
                    error = %err,
                    "could not move owner, removing room"
                );
                self.abandon(channel, &handle).await;
                return Err(err.into());
            }
        }
        Ok(snapshot)
    }

    /// Creates a room sized by a preset. Same path as [`create_room`](Self::create_room).
    pub async fn quick_create(
        &self,
        owner: UserId,
        preset: SizePreset,
    ) -> Result<RoomSnapshot, RoomError> {
        self.create_room(
            owner,
            CreateRequest {
                name: None,
                limit: i64::from(preset.limit()),
            },
        )
        .await
    }

    /// Current state of a tracked room.
    pub async fn snapshot(&self, channel: ChannelId) -> Result<RoomSnapshot, RoomError> {
        self.room(channel)
            .await?
            .snapshot()
            .await
            .map_err(|_| RoomError::UnknownRoom(channel))
    }

    /// Puts a previous room state back, typically the `previous` of an
    /// [`EffectFailure`](crate::EffectFailure). The backend is not touched.
    pub async fn restore(&self, previous: Room) -> Result<RoomSnapshot, RoomError> {
        let channel = previous.id;
        self.room(channel)
            .await?
            .restore(previous)
            .await
            .map_err(|_| RoomError::UnknownRoom(channel))
    }

    /// Retries effects against a tracked room, typically the
    /// [`remaining`](crate::EffectFailure::remaining) of a failure.
    pub async fn apply_effects(
        &self,
        channel: ChannelId,
        effects: Vec<Effect>,
    ) -> Result<(), RoomError> {
        self.room(channel).await?.apply(effects).await
    }

    /// Tears down a room whose creation could not be completed.
    async fn abandon(&self, channel: ChannelId, handle: &RoomHandle) {
        self.registry.remove(channel).await;
        let _ = handle.shutdown();
        if let Err(err) = self.backend.delete_channel(channel).await {
            tracing::error!(room_id = %channel, error = %err, "failed to delete abandoned room");
        }
    }
}
