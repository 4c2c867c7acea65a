//! Access control: who may do what in a room, and who may be in it.
//!
//! Pure functions over a [`Room`]. Nothing here touches the backend or
//! mutates state.

use voxroom_protocol::{Action, Authority, UserId};

use crate::Room;

/// The outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    fn from_bool(allowed: bool) -> Self {
        if allowed { Self::Allowed } else { Self::Denied }
    }
}

/// Whether `actor` may perform `action` in `room`.
///
/// Purely role based: owner actions need `actor == owner`, owner-or-host
/// actions accept either. Guests, whitelisted users and everyone else
/// hold no admin rights.
pub fn authorize(room: &Room, actor: UserId, action: Action) -> Decision {
    let allowed = match action.required_authority() {
        Authority::Owner => room.is_owner(actor),
        Authority::OwnerOrHost => room.is_owner(actor) || room.is_host(actor),
        Authority::Anyone => true,
    };
    Decision::from_bool(allowed)
}

/// Whether `user` may be connected to `room`.
///
/// The blacklist always wins, whatever the whitelist or guest list say.
pub fn connect_eligibility(room: &Room, user: UserId) -> Decision {
    Decision::from_bool(!room.blacklist.contains(&user))
}

// =========================================================================
// Tests
// =========================================================================
