//! Side-effect requests a command produces for the backend.

use serde::{Deserialize, Serialize};
use voxroom_backend::{
    BackendError, ChannelBackend, ChannelEdit, PermissionOverride, PermissionTarget, VoiceState,
};
use voxroom_protocol::{ChannelId, UserId};

/// One request to the backend, relative to a room's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Edit the room's channel.
    Edit { edit: ChannelEdit },
    /// Set or clear a permission override on the room's channel.
    SetPermission {
        target: PermissionTarget,
        permissions: PermissionOverride,
    },
    /// Move a user; `to: None` disconnects them.
    Move {
        user: UserId,
        to: Option<ChannelId>,
    },
    /// Change a user's server-side voice state.
    VoiceState { user: UserId, state: VoiceState },
}

impl Effect {
    /// Disconnects `user` from voice.
    pub fn evict(user: UserId) -> Self {
        Self::Move { user, to: None }
    }

    pub fn permission(target: PermissionTarget, permissions: PermissionOverride) -> Self {
        Self::SetPermission {
            target,
            permissions,
        }
    }

    /// Carries out this effect against `channel`.
    pub async fn execute<B: ChannelBackend>(
        &self,
        backend: &B,
        channel: ChannelId,
    ) -> Result<(), BackendError> {
        match self {
            Self::Edit { edit } => backend.edit_channel(channel, edit.clone()).await,
            Self::SetPermission {
                target,
                permissions,
            } => backend.set_permission(channel, *target, *permissions).await,
            Self::Move { user, to } => backend.move_user(*user, *to).await,
            Self::VoiceState { user, state } => backend.set_voice_state(*user, *state).await,
        }
    }
}
