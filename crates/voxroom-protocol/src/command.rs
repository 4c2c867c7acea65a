//! Admin commands and the authority each one requires.
//!
//! A [`Command`] is what a collaborator asks the core to do on behalf of a
//! user; an [`Action`] is the same thing with the arguments stripped off,
//! which is all the access evaluator and the audit notices need.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, UserId};

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// An admin operation against the actor's current room.
///
/// The room is never named here: it is resolved from where the actor is
/// currently connected. Numeric arguments are signed on purpose so that a
/// collaborator can forward whatever the user typed (`size -1`) and get a
/// proper `InvalidArgument` back instead of a parse failure upstream.
///
/// `#[serde(tag = "action")]` produces `{ "action": "resize", "limit": 4 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    Rename { name: String },
    /// `0` means unlimited.
    Resize { limit: i64 },
    SetBitrate { kbps: i64 },
    TogglePrivacy,
    WhitelistAdd { user: UserId },
    BlacklistAdd { user: UserId },
    GuestAdd { user: UserId },
    GuestRemove { user: UserId },
    GuestList,
    SetHost { user: UserId },
    TransferOwnership { user: UserId },
    Reset,
    Mute { user: UserId },
    Unmute { user: UserId },
    Ban { user: UserId },
    Unban { user: UserId },
    Info,
}

impl Command {
    /// The argument-free action this command performs.
    pub fn action(&self) -> Action {
        match self {
            Self::Rename { .. } => Action::Rename,
            Self::Resize { .. } => Action::Resize,
            Self::SetBitrate { .. } => Action::SetBitrate,
            Self::TogglePrivacy => Action::TogglePrivacy,
            Self::WhitelistAdd { .. } => Action::WhitelistAdd,
            Self::BlacklistAdd { .. } => Action::BlacklistAdd,
            Self::GuestAdd { .. } => Action::GuestAdd,
            Self::GuestRemove { .. } => Action::GuestRemove,
            Self::GuestList => Action::GuestList,
            Self::SetHost { .. } => Action::SetHost,
            Self::TransferOwnership { .. } => Action::TransferOwnership,
            Self::Reset => Action::Reset,
            Self::Mute { .. } => Action::Mute,
            Self::Unmute { .. } => Action::Unmute,
            Self::Ban { .. } => Action::Ban,
            Self::Unban { .. } => Action::Unban,
            Self::Info => Action::Info,
        }
    }

    /// The user this command targets, if any.
    pub fn target(&self) -> Option<UserId> {
        match self {
            Self::WhitelistAdd { user }
            | Self::BlacklistAdd { user }
            | Self::GuestAdd { user }
            | Self::GuestRemove { user }
            | Self::SetHost { user }
            | Self::TransferOwnership { user }
            | Self::Mute { user }
            | Self::Unmute { user }
            | Self::Ban { user }
            | Self::Unban { user } => Some(*user),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Action / Authority
// ---------------------------------------------------------------------------

/// Who may perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    /// Only the room owner.
    Owner,
    /// The owner or the current host.
    OwnerOrHost,
    /// Anyone connected to the room.
    Anyone,
}

/// The kind of a [`Command`], without its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Rename,
    Resize,
    SetBitrate,
    TogglePrivacy,
    WhitelistAdd,
    BlacklistAdd,
    GuestAdd,
    GuestRemove,
    GuestList,
    SetHost,
    TransferOwnership,
    Reset,
    Mute,
    Unmute,
    Ban,
    Unban,
    Info,
}

impl Action {
    /// The authority required to perform this action.
    pub fn required_authority(self) -> Authority {
        match self {
            Self::Rename
            | Self::Resize
            | Self::SetBitrate
            | Self::TogglePrivacy
            | Self::WhitelistAdd
            | Self::BlacklistAdd
            | Self::SetHost
            | Self::TransferOwnership
            | Self::Reset
            | Self::Ban
            | Self::Unban => Authority::Owner,
            Self::Mute
            | Self::Unmute
            | Self::GuestAdd
            | Self::GuestRemove
            | Self::GuestList => Authority::OwnerOrHost,
            Self::Info => Authority::Anyone,
        }
    }

    /// Returns `true` for actions that change nothing.
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::GuestList | Self::Info)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rename => "rename",
            Self::Resize => "resize",
            Self::SetBitrate => "set_bitrate",
            Self::TogglePrivacy => "toggle_privacy",
            Self::WhitelistAdd => "whitelist_add",
            Self::BlacklistAdd => "blacklist_add",
            Self::GuestAdd => "guest_add",
            Self::GuestRemove => "guest_remove",
            Self::GuestList => "guest_list",
            Self::SetHost => "set_host",
            Self::TransferOwnership => "transfer_ownership",
            Self::Reset => "reset",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::Info => "info",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// SizePreset
// ---------------------------------------------------------------------------

/// Room sizes offered by the quick-create affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizePreset {
    Duo,
    Trio,
    Quad,
    Penta,
    Hexa,
    Septa,
    Octa,
    Deca,
    Unlimited,
}

impl SizePreset {
    /// Every preset, in the order they are usually presented.
    pub const ALL: [SizePreset; 9] = [
        Self::Duo,
        Self::Trio,
        Self::Quad,
        Self::Penta,
        Self::Hexa,
        Self::Septa,
        Self::Octa,
        Self::Deca,
        Self::Unlimited,
    ];

    /// The user limit for this preset. 0 = unlimited.
    pub fn limit(self) -> u32 {
        match self {
            Self::Duo => 2,
            Self::Trio => 3,
            Self::Quad => 4,
            Self::Penta => 5,
            Self::Hexa => 6,
            Self::Septa => 7,
            Self::Octa => 8,
            Self::Deca => 10,
            Self::Unlimited => 0,
        }
    }

    /// Lowercase label, also accepted by [`FromStr`].
    pub fn label(self) -> &'static str {
        match self {
            Self::Duo => "duo",
            Self::Trio => "trio",
            Self::Quad => "quad",
            Self::Penta => "penta",
            Self::Hexa => "hexa",
            Self::Septa => "septa",
            Self::Octa => "octa",
            Self::Deca => "deca",
            Self::Unlimited => "unlimited",
        }
    }
}

/// Accepts either a label (`"Quad"`, case-insensitive) or a button id of
/// the form `size_<limit>` (`"size_4"`, `"size_0"`).
impl FromStr for SizePreset {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if let Some(limit) = lowered.strip_prefix("size_") {
            let limit: u32 = limit
                .parse()
                .map_err(|_| ProtocolError::UnknownPreset(s.to_string()))?;
            return Self::ALL
                .into_iter()
                .find(|p| p.limit() == limit)
                .ok_or_else(|| ProtocolError::UnknownPreset(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|p| p.label() == lowered)
            .ok_or_else(|| ProtocolError::UnknownPreset(s.to_string()))
    }
}

// =========================================================================
// Tests
// =========================================================================
