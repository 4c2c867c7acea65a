//! Error types for the room layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use voxroom_backend::BackendError;
use voxroom_protocol::{Action, ChannelId, UserId};

use crate::{Effect, Room};

/// The error taxonomy a collaborator sees.
///
/// Every [`RoomError`] maps onto exactly one kind; the kind plus the
/// error's `Display` text is what gets reported back to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The actor is not connected to a tracked room.
    NotInRoom,
    /// The actor lacks the role the action requires.
    NotAuthorized,
    /// An argument was out of range or otherwise unacceptable.
    InvalidArgument,
    /// The thing to act on does not exist.
    NotFound,
    /// The backend failed to carry out a request.
    ExternalEffectFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotInRoom => "NotInRoom",
            Self::NotAuthorized => "NotAuthorized",
            Self::InvalidArgument => "InvalidArgument",
            Self::NotFound => "NotFound",
            Self::ExternalEffectFailed => "ExternalEffectFailed",
        };
        f.write_str(name)
    }
}

/// A backend failure after a command's state change was committed.
///
/// Holds what the caller needs to decide between rolling back (pass
/// `previous` to `RoomManager::restore`) and retrying (pass
/// [`remaining`](Self::remaining) to `RoomManager::apply_effects`).
#[derive(Debug, Clone)]
pub struct EffectFailure {
    pub room: ChannelId,
    /// The room as it was before the command.
    pub previous: Room,
    /// The effect that failed.
    pub failed: Effect,
    /// Effects after the failed one, never attempted.
    pub pending: Vec<Effect>,
    pub source: BackendError,
}

impl EffectFailure {
    /// The failed effect followed by the ones never attempted.
    pub fn remaining(&self) -> Vec<Effect> {
        std::iter::once(self.failed.clone())
            .chain(self.pending.iter().cloned())
            .collect()
    }
}

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The user is not connected to any tracked room.
    #[error("{0} is not in a room")]
    NotInRoom(UserId),

    #[error("{actor} may not {action} in this room")]
    NotAuthorized { actor: UserId, action: Action },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// No tracked room has this id.
    #[error("room {0} not found")]
    UnknownRoom(ChannelId),

    /// A room with this id is already tracked.
    #[error("room {0} is already tracked")]
    AlreadyTracked(ChannelId),

    /// The command was committed but one of its effects failed.
    #[error("room {} changed but the backend failed: {}", .0.room, .0.source)]
    ExternalEffectFailed(Box<EffectFailure>),

    /// Reading the room's occupants failed before the command was
    /// planned. Nothing was changed.
    #[error("could not read room occupants, nothing changed: {0}")]
    Lookup(BackendError),

    /// A backend request outside of a committed command failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// The room's actor is gone (the room was destroyed).
    #[error("room {0} is unavailable")]
    Unavailable(ChannelId),
}

impl RoomError {
    /// The collaborator-facing kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInRoom(_) | Self::Unavailable(_) => ErrorKind::NotInRoom,
            Self::NotAuthorized { .. } => ErrorKind::NotAuthorized,
            Self::InvalidArgument(_) | Self::AlreadyTracked(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) | Self::UnknownRoom(_) => ErrorKind::NotFound,
            Self::ExternalEffectFailed(_) | Self::Lookup(_) | Self::Backend(_) => {
                ErrorKind::ExternalEffectFailed
            }
        }
    }

    /// The failure details, if this is an [`ExternalEffectFailed`](Self::ExternalEffectFailed).
    ///
    /// `None` for every other variant, including [`Lookup`](Self::Lookup)
    /// and [`Backend`](Self::Backend): those failed before any state was
    /// committed, so there is nothing to roll back or retry.
    pub fn effect_failure(&self) -> Option<&EffectFailure> {
        match self {
            Self::ExternalEffectFailed(failure) => Some(&**failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_maps_unavailable_to_not_in_room() {
        assert_eq!(
            RoomError::Unavailable(ChannelId(1)).kind(),
            ErrorKind::NotInRoom
        );
    }

    #[test]
    fn test_kind_maps_backend_to_external_effect_failed() {
        let err = RoomError::from(BackendError::Unavailable("timeout".into()));
        assert_eq!(err.kind(), ErrorKind::ExternalEffectFailed);
        assert!(err.effect_failure().is_none());
    }

    #[test]
    fn test_lookup_reports_nothing_changed() {
        let err = RoomError::Lookup(BackendError::Unavailable("timeout".into()));
        assert_eq!(err.kind(), ErrorKind::ExternalEffectFailed);
        assert!(err.effect_failure().is_none());
        assert!(err.to_string().contains("nothing changed"));
    }

    #[test]
    fn test_not_authorized_message_names_action() {
        let err = RoomError::NotAuthorized {
            actor: UserId(3),
            action: Action::GuestAdd,
        };
        assert_eq!(err.to_string(), "U-3 may not guest_add in this room");
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);
    }

    #[test]
    fn test_error_kind_serializes_as_variant_name() {
        let json = serde_json::to_string(&ErrorKind::InvalidArgument).unwrap();
        assert_eq!(json, "\"InvalidArgument\"");
        assert_eq!(ErrorKind::InvalidArgument.to_string(), "InvalidArgument");
    }
}
