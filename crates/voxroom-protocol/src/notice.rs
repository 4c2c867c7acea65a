//! Notices: what the core reports after handling an event or a command.
//!
//! The core never formats anything for humans. It emits these values and
//! the collaborator decides whether they become a log line, an embed in an
//! audit channel, or nothing at all.

use serde::{Deserialize, Serialize};

use crate::{Action, ChannelId, UserId};

/// Something observable happened to a room.
///
/// `#[serde(tag = "type")]` gives `{ "type": "Created", "channel": 10, ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notice {
    /// A room was created and registered.
    Created {
        channel: ChannelId,
        owner: UserId,
        name: String,
    },

    /// A user entered a tracked room.
    Joined { channel: ChannelId, user: UserId },

    /// A user entered a tracked room they are not eligible for and was
    /// disconnected again.
    Evicted { channel: ChannelId, user: UserId },

    /// A user left a tracked room that still has occupants.
    Left { channel: ChannelId, user: UserId },

    /// A room was emptied and destroyed.
    Deleted { channel: ChannelId, name: String },

    /// An admin command was committed.
    Updated {
        channel: ChannelId,
        actor: UserId,
        action: Action,
    },
}

impl Notice {
    /// The channel this notice is about.
    pub fn channel(&self) -> ChannelId {
        match self {
            Self::Created { channel, .. }
            | Self::Joined { channel, .. }
            | Self::Evicted { channel, .. }
            | Self::Left { channel, .. }
            | Self::Deleted { channel, .. }
            | Self::Updated { channel, .. } => *channel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_created_json_format() {
        let notice = Notice::Created {
            channel: ChannelId(10),
            owner: UserId(1),
            name: "alice's Channel".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&notice).unwrap();

        assert_eq!(json["type"], "Created");
        assert_eq!(json["channel"], 10);
        assert_eq!(json["owner"], 1);
        assert_eq!(json["name"], "alice's Channel");
    }

    #[test]
    fn test_notice_updated_carries_snake_case_action() {
        let notice = Notice::Updated {
            channel: ChannelId(4),
            actor: UserId(2),
            action: Action::BlacklistAdd,
        };
        let json: serde_json::Value = serde_json::to_value(&notice).unwrap();

        assert_eq!(json["type"], "Updated");
        assert_eq!(json["action"], "blacklist_add");
    }

    #[test]
    fn test_notice_channel_accessor() {
        let notice = Notice::Left {
            channel: ChannelId(8),
            user: UserId(1),
        };
        assert_eq!(notice.channel(), ChannelId(8));
    }
}
