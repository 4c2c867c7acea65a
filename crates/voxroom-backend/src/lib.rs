//! Channel backend abstraction for Voxroom.
//!
//! The core never talks to a chat platform directly. Everything it needs
//! from the outside world (creating and deleting voice channels, editing
//! them, setting permission overrides, moving and muting users, asking who
//! is connected) goes through the [`ChannelBackend`] trait.
//!
//! # Feature Flags
//!
//! - `memory` (default): [`MemoryBackend`], an in-process backend that
//!   models channels, permission overrides and user locations. Used by the
//!   test suites and the walkthrough demo.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::BackendError;
#[cfg(feature = "memory")]
pub use memory::{BackendOp, ChannelRecord, MemoryBackend};

use std::collections::HashSet;
use std::future::Future;

use serde::{Deserialize, Serialize};
use voxroom_protocol::{ChannelId, GroupId, UserId};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// How many users a channel admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserLimit {
    #[default]
    Unlimited,
    Max(u32),
}

impl UserLimit {
    /// Maps the transport's "0 means unlimited" convention onto the enum.
    pub fn from_count(count: u32) -> Self {
        if count == 0 {
            Self::Unlimited
        } else {
            Self::Max(count)
        }
    }

    /// The inverse of [`from_count`](Self::from_count).
    pub fn as_count(self) -> u32 {
        match self {
            Self::Unlimited => 0,
            Self::Max(n) => n,
        }
    }
}

/// Whom a permission override applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionTarget {
    /// The default role: every user without a more specific override.
    Everyone,
    User(UserId),
}

/// A per-target permission override on a channel.
///
/// `None` means "inherit": the override says nothing about that bit.
/// An override with both bits `None` is equivalent to having no override,
/// and setting one removes any existing override for the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionOverride {
    pub connect: Option<bool>,
    pub manage: Option<bool>,
}

impl PermissionOverride {
    /// No opinion on either bit. Removes an override when applied.
    pub const INHERIT: Self = Self {
        connect: None,
        manage: None,
    };

    /// Explicitly allow connecting.
    pub const ALLOW_CONNECT: Self = Self {
        connect: Some(true),
        manage: None,
    };

    /// Explicitly deny connecting.
    pub const DENY_CONNECT: Self = Self {
        connect: Some(false),
        manage: None,
    };

    /// Connect and manage: what an owner holds.
    pub const MANAGER: Self = Self {
        connect: Some(true),
        manage: Some(true),
    };

    /// Returns `true` if this override carries no information.
    pub fn is_inherit(&self) -> bool {
        self.connect.is_none() && self.manage.is_none()
    }
}

/// Everything needed to create a voice channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    pub parent: Option<GroupId>,
    pub limit: UserLimit,
    /// `None` leaves the platform default.
    pub bitrate_kbps: Option<u32>,
    pub permissions: Vec<(PermissionTarget, PermissionOverride)>,
}

/// A partial edit of a voice channel. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelEdit {
    pub name: Option<String>,
    pub limit: Option<UserLimit>,
    pub bitrate_kbps: Option<u32>,
}

/// A partial change of a user's server-side voice state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoiceState {
    pub muted: Option<bool>,
}

// ---------------------------------------------------------------------------
// ChannelBackend
// ---------------------------------------------------------------------------

/// The chat platform, as seen by the room core.
///
/// Every method is an asynchronous request. Implementations must be
/// shareable across tasks: each room runs in its own Tokio task and calls
/// the backend concurrently with other rooms.
///
/// The futures are required to be `Send` so that callers can hold them
/// inside spawned tasks; implementations can still be written with plain
/// `async fn`.
pub trait ChannelBackend: Send + Sync + 'static {
    /// Creates a voice channel and returns its id.
    fn create_channel(
        &self,
        spec: ChannelSpec,
    ) -> impl Future<Output = Result<ChannelId, BackendError>> + Send;

    /// Deletes a voice channel.
    fn delete_channel(
        &self,
        channel: ChannelId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Edits name, limit and/or bitrate.
    fn edit_channel(
        &self,
        channel: ChannelId,
        edit: ChannelEdit,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Sets (or with [`PermissionOverride::INHERIT`], clears) a permission
    /// override.
    fn set_permission(
        &self,
        channel: ChannelId,
        target: PermissionTarget,
        permissions: PermissionOverride,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Moves a user into a channel, or disconnects them with `None`.
    fn move_user(
        &self,
        user: UserId,
        to: Option<ChannelId>,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Changes a user's server-side voice state.
    fn set_voice_state(
        &self,
        user: UserId,
        state: VoiceState,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Returns the users currently connected to a channel.
    fn current_occupants(
        &self,
        channel: ChannelId,
    ) -> impl Future<Output = Result<HashSet<UserId>, BackendError>> + Send;

    /// Returns the name a user is shown under. Used to name new rooms.
    fn display_name(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Returns the group with the given name, creating it if missing.
    fn ensure_group(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<GroupId, BackendError>> + Send;

    /// Looks up a channel by name within a group (or at top level).
    fn find_channel(
        &self,
        name: &str,
        parent: Option<GroupId>,
    ) -> impl Future<Output = Result<Option<ChannelId>, BackendError>> + Send;
}
