//! Identity types and the membership transition event.
//!
//! Every id here is assigned by the chat transport. The core never invents
//! one; it only carries them around and compares them.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a user of the shared space.
///
/// Newtype over the transport's numeric id so a `UserId` can never be passed
/// where a `ChannelId` is expected. `#[serde(transparent)]` keeps the JSON
/// form a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A unique identifier for a voice channel resource.
///
/// Every room is backed by exactly one channel, so the room's id *is* its
/// channel id. The spawn room is a channel too, just not a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A channel group (category) that channels are created under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TransitionEvent
// ---------------------------------------------------------------------------

/// A user's voice membership changed.
///
/// ```text
/// from: None,    to: Some(c) → user connected to c
/// from: Some(a), to: Some(b) → user moved from a to b
/// from: Some(c), to: None    → user disconnected from c
/// ```
///
/// The transport emits one of these *after* the move has happened, so
/// occupancy queries made while handling it already reflect the new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub user: UserId,
    pub from: Option<ChannelId>,
    pub to: Option<ChannelId>,
}

impl TransitionEvent {
    /// Builds an event from its parts.
    pub fn new(user: UserId, from: Option<ChannelId>, to: Option<ChannelId>) -> Self {
        Self { user, from, to }
    }

    /// Returns `true` if the user did not actually change channel.
    ///
    /// Transports also report mute/deafen changes through the same stream;
    /// those arrive with `from == to` and carry no membership information.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&UserId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_ids_display_with_prefix() {
        assert_eq!(UserId(7).to_string(), "U-7");
        assert_eq!(ChannelId(3).to_string(), "C-3");
        assert_eq!(GroupId(9).to_string(), "G-9");
    }

    #[test]
    fn test_transition_event_json_format() {
        let event = TransitionEvent::new(UserId(1), None, Some(ChannelId(10)));
        let json: serde_json::Value = serde_json::to_value(event).unwrap();

        assert_eq!(json["user"], 1);
        assert!(json["from"].is_null());
        assert_eq!(json["to"], 10);
    }

    #[test]
    fn test_transition_event_is_noop_when_channel_unchanged() {
        let muted = TransitionEvent::new(UserId(1), Some(ChannelId(5)), Some(ChannelId(5)));
        assert!(muted.is_noop());

        let moved = TransitionEvent::new(UserId(1), Some(ChannelId(5)), Some(ChannelId(6)));
        assert!(!moved.is_noop());

        let left = TransitionEvent::new(UserId(1), Some(ChannelId(5)), None);
        assert!(!left.is_noop());
    }
}
