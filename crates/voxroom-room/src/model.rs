//! The room entity and its serializable snapshot.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use voxroom_backend::UserLimit;
use voxroom_protocol::{ChannelId, UserId};

/// One user-owned voice room.
///
/// Every field is owned by the room's actor; outside the actor a room is
/// only ever seen as a [`RoomSnapshot`] or as the `previous` state in an
/// [`EffectFailure`](crate::EffectFailure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: ChannelId,
    pub name: String,
    /// The name given at creation. `reset` goes back to it.
    pub default_name: String,
    pub owner: UserId,
    /// Delegated control. Equal to `owner` unless reassigned.
    pub host: UserId,
    pub guests: BTreeSet<UserId>,
    /// Informational only: nothing is enforced from it.
    pub whitelist: BTreeSet<UserId>,
    pub blacklist: BTreeSet<UserId>,
    pub is_private: bool,
    pub limit: UserLimit,
    pub bitrate_kbps: u32,
    /// Users holding a per-user permission override placed by this room.
    pub overrides: BTreeSet<UserId>,
    pub created_at: Instant,
}

impl Room {
    /// A freshly created room: public, owner is also host, owner holds
    /// the only per-user override.
    pub fn new(
        id: ChannelId,
        owner: UserId,
        name: String,
        limit: UserLimit,
        bitrate_kbps: u32,
    ) -> Self {
        Self {
            id,
            default_name: name.clone(),
            name,
            owner,
            host: owner,
            guests: BTreeSet::new(),
            whitelist: BTreeSet::new(),
            blacklist: BTreeSet::new(),
            is_private: false,
            limit,
            bitrate_kbps,
            overrides: BTreeSet::from([owner]),
            created_at: Instant::now(),
        }
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner == user
    }

    pub fn is_host(&self, user: UserId) -> bool {
        self.host == user
    }

    /// How long ago the room was created.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id,
            name: self.name.clone(),
            default_name: self.default_name.clone(),
            owner: self.owner,
            host: self.host,
            guests: self.guests.clone(),
            whitelist: self.whitelist.clone(),
            blacklist: self.blacklist.clone(),
            is_private: self.is_private,
            limit: self.limit,
            bitrate_kbps: self.bitrate_kbps,
            overrides: self.overrides.clone(),
        }
    }
}

/// A point-in-time copy of a [`Room`], safe to hand to collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub id: ChannelId,
    pub name: String,
    pub default_name: String,
    pub owner: UserId,
    pub host: UserId,
    pub guests: BTreeSet<UserId>,
    pub whitelist: BTreeSet<UserId>,
    pub blacklist: BTreeSet<UserId>,
    pub is_private: bool,
    pub limit: UserLimit,
    pub bitrate_kbps: u32,
    pub overrides: BTreeSet<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_room_owner_is_host() {
        let room = Room::new(ChannelId(1), UserId(7), "r".into(), UserLimit::Unlimited, 64);
        assert!(room.is_owner(UserId(7)));
        assert!(room.is_host(UserId(7)));
        assert!(!room.is_private);
        assert_eq!(room.default_name, "r");
        assert_eq!(room.overrides, BTreeSet::from([UserId(7)]));
    }

    #[test]
    fn test_snapshot_json_format() {
        let room = Room::new(ChannelId(4), UserId(1), "r".into(), UserLimit::Max(4), 64);
        let json = serde_json::to_value(room.snapshot()).unwrap();

        assert_eq!(json["id"], 4);
        assert_eq!(json["owner"], 1);
        assert_eq!(json["limit"], serde_json::json!({ "max": 4 }));
        assert_eq!(json["guests"], serde_json::json!([]));
        assert!(json.get("created_at").is_none());
    }
}
