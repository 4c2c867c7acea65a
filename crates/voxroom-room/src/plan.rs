//! Command planning: the pure half of every admin command.
//!
//! [`plan`] takes a room, an actor and a [`Command`] and returns the room
//! as it should look afterwards plus the [`Effect`]s the backend must carry
//! out to match. It never calls the backend. The room actor commits the
//! new state and then runs the effects in order.

use std::collections::HashSet;

use voxroom_backend::{ChannelEdit, PermissionOverride, PermissionTarget, UserLimit, VoiceState};
use voxroom_protocol::{Command, UserId};

use crate::access::{self, Decision};
use crate::{Effect, Room, RoomConfig, RoomError};

/// Facts about the outside world a plan may depend on.
#[derive(Debug, Clone, Default)]
pub struct PlanContext {
    /// Users currently connected to the room's channel.
    pub occupants: HashSet<UserId>,
}

impl PlanContext {
    /// Whether [`plan`] needs occupancy for `command`. Fetching it costs a
    /// backend round trip, so the actor only does so when this is true.
    pub fn needs_occupants(command: &Command) -> bool {
        matches!(command, Command::BlacklistAdd { .. } | Command::Ban { .. })
    }
}

/// The result of planning a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub next: Room,
    pub effects: Vec<Effect>,
}

impl Plan {
    fn unchanged(room: &Room) -> Self {
        Self {
            next: room.clone(),
            effects: Vec::new(),
        }
    }
}

/// Authorizes and plans `command` issued by `actor` against `room`.
///
/// # Errors
/// - [`RoomError::NotAuthorized`] if the actor's role does not allow it
/// - [`RoomError::InvalidArgument`] for out-of-range sizes, bitrates and
///   names, and for targets the action cannot apply to (blacklisting the
///   owner, handing the room to a blacklisted user)
/// - [`RoomError::NotFound`] when removing a guest that is not listed
pub fn plan(
    room: &Room,
    actor: UserId,
    command: &Command,
    ctx: &PlanContext,
    config: &RoomConfig,
) -> Result<Plan, RoomError> {
    let action = command.action();
    if access::authorize(room, actor, action) == Decision::Denied {
        return Err(RoomError::NotAuthorized { actor, action });
    }

    let mut next = room.clone();
    let mut effects = Vec::new();

    match command {
        Command::Info | Command::GuestList => return Ok(Plan::unchanged(room)),

        Command::Rename { name } => {
            let name = validate_name(name, config)?;
            next.name = name.clone();
            effects.push(Effect::Edit {
                edit: ChannelEdit {
                    name: Some(name),
                    ..ChannelEdit::default()
                },
            });
        }

        Command::Resize { limit } => {
            let limit = validate_limit(*limit, config)?;
            next.limit = limit;
            effects.push(Effect::Edit {
                edit: ChannelEdit {
                    limit: Some(limit),
                    ..ChannelEdit::default()
                },
            });
        }

        Command::SetBitrate { kbps } => {
            let kbps = validate_bitrate(*kbps, config)?;
            next.bitrate_kbps = kbps;
            effects.push(Effect::Edit {
                edit: ChannelEdit {
                    bitrate_kbps: Some(kbps),
                    ..ChannelEdit::default()
                },
            });
        }

        Command::TogglePrivacy => {
            next.is_private = !room.is_private;
            effects.push(Effect::permission(
                PermissionTarget::Everyone,
                everyone_connect(next.is_private),
            ));
        }

        Command::WhitelistAdd { user } => {
            next.whitelist.insert(*user);
        }

        Command::BlacklistAdd { user } => {
            if room.is_owner(*user) {
                return Err(RoomError::InvalidArgument(
                    "the owner cannot be blacklisted".into(),
                ));
            }
            next.blacklist.insert(*user);
            if next.host == *user {
                next.host = next.owner;
            }
            deny_and_evict(&mut next, &mut effects, *user, ctx);
        }

        Command::GuestAdd { user } => {
            next.guests.insert(*user);
        }

        Command::GuestRemove { user } => {
            if !next.guests.remove(user) {
                return Err(RoomError::NotFound(format!("{user} is not a guest")));
            }
        }

        Command::SetHost { user } => {
            if room.blacklist.contains(user) {
                return Err(RoomError::InvalidArgument(format!(
                    "{user} is blacklisted and cannot host"
                )));
            }
            next.host = *user;
        }

        Command::TransferOwnership { user } => {
            if room.is_owner(*user) {
                return Err(RoomError::InvalidArgument(format!(
                    "{user} already owns this room"
                )));
            }
            if room.blacklist.contains(user) {
                return Err(RoomError::InvalidArgument(format!(
                    "{user} is blacklisted and cannot own this room"
                )));
            }
            let previous_owner = room.owner;
            next.owner = *user;
            next.host = *user;
            next.overrides.insert(previous_owner);
            next.overrides.insert(*user);
            effects.push(Effect::permission(
                PermissionTarget::User(previous_owner),
                PermissionOverride::ALLOW_CONNECT,
            ));
            effects.push(Effect::permission(
                PermissionTarget::User(*user),
                PermissionOverride::MANAGER,
            ));
        }

        Command::Reset => {
            next.guests.clear();
            next.whitelist.clear();
            next.blacklist.clear();
            next.is_private = false;
            next.host = room.owner;
            next.name = room.default_name.clone();
            next.limit = UserLimit::Unlimited;
            next.bitrate_kbps = config.default_bitrate_kbps;
            next.overrides.retain(|u| *u == room.owner);

            for user in room.overrides.iter().filter(|u| **u != room.owner) {
                effects.push(Effect::permission(
                    PermissionTarget::User(*user),
                    PermissionOverride::INHERIT,
                ));
            }
            effects.push(Effect::permission(
                PermissionTarget::Everyone,
                everyone_connect(false),
            ));
            effects.push(Effect::Edit {
                edit: ChannelEdit {
                    name: Some(next.name.clone()),
                    limit: Some(next.limit),
                    bitrate_kbps: Some(next.bitrate_kbps),
                },
            });
        }

        Command::Mute { user } => {
            effects.push(Effect::VoiceState {
                user: *user,
                state: VoiceState { muted: Some(true) },
            });
        }

        Command::Unmute { user } => {
            effects.push(Effect::VoiceState {
                user: *user,
                state: VoiceState { muted: Some(false) },
            });
        }

        Command::Ban { user } => {
            if room.is_owner(*user) {
                return Err(RoomError::InvalidArgument(
                    "the owner cannot be banned".into(),
                ));
            }
            deny_and_evict(&mut next, &mut effects, *user, ctx);
        }

        Command::Unban { user } => {
            next.blacklist.remove(user);
            next.overrides.insert(*user);
            effects.push(Effect::permission(
                PermissionTarget::User(*user),
                PermissionOverride::ALLOW_CONNECT,
            ));
        }
    }

    Ok(Plan { next, effects })
}

fn deny_and_evict(next: &mut Room, effects: &mut Vec<Effect>, user: UserId, ctx: &PlanContext) {
    next.overrides.insert(user);
    effects.push(Effect::permission(
        PermissionTarget::User(user),
        PermissionOverride::DENY_CONNECT,
    ));
    if ctx.occupants.contains(&user) {
        effects.push(Effect::evict(user));
    }
}

/// The `Everyone` override for a room's privacy flag.
pub(crate) fn everyone_connect(is_private: bool) -> PermissionOverride {
    PermissionOverride {
        connect: Some(!is_private),
        manage: None,
    }
}

/// `0` is unlimited, `1..=max_user_limit` a cap, anything else invalid.
pub(crate) fn validate_limit(limit: i64, config: &RoomConfig) -> Result<UserLimit, RoomError> {
    match u32::try_from(limit) {
        Ok(n) if n <= config.max_user_limit => Ok(UserLimit::from_count(n)),
        _ => Err(RoomError::InvalidArgument(format!(
            "size must be between 0 and {}, got {limit}",
            config.max_user_limit
        ))),
    }
}

pub(crate) fn validate_bitrate(kbps: i64, config: &RoomConfig) -> Result<u32, RoomError> {
    match u32::try_from(kbps) {
        Ok(n) if (config.min_bitrate_kbps..=config.max_bitrate_kbps).contains(&n) => Ok(n),
        _ => Err(RoomError::InvalidArgument(format!(
            "bitrate must be between {} and {} kbps, got {kbps}",
            config.min_bitrate_kbps, config.max_bitrate_kbps
        ))),
    }
}

/// Trims surrounding whitespace and checks the length in characters.
pub(crate) fn validate_name(name: &str, config: &RoomConfig) -> Result<String, RoomError> {
    let name = name.trim();
    let len = name.chars().count();
    if len == 0 || len > config.max_name_len {
        return Err(RoomError::InvalidArgument(format!(
            "name must be 1 to {} characters",
            config.max_name_len
        )));
    }
    Ok(name.to_string())
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use voxroom_protocol::ChannelId;

    use crate::ErrorKind;

    const OWNER: UserId = UserId(1);

    fn uid(n: u64) -> UserId {
        UserId(n)
    }

    fn room() -> Room {
        Room::new(ChannelId(10), OWNER, "alice's Channel".into(), UserLimit::Unlimited, 64)
    }

    fn run(room: &Room, actor: UserId, command: Command) -> Result<Plan, RoomError> {
        plan(room, actor, &command, &PlanContext::default(), &RoomConfig::default())
    }

    fn run_with_occupants(room: &Room, command: Command, occupants: &[UserId]) -> Plan {
        let ctx = PlanContext {
            occupants: occupants.iter().copied().collect(),
        };
        plan(room, OWNER, &command, &ctx, &RoomConfig::default()).unwrap()
    }

    fn kind(result: Result<Plan, RoomError>) -> ErrorKind {
        result.unwrap_err().kind()
    }

    // ---- authorization ----

    #[test]
    fn test_plan_non_owner_rename_not_authorized() {
        let result = run(&room(), uid(2), Command::Rename { name: "x".into() });
        assert_eq!(kind(result), ErrorKind::NotAuthorized);
    }

    #[test]
    fn test_plan_host_may_manage_guests_but_not_rename() {
        let mut room = room();
        room.host = uid(2);

        assert!(run(&room, uid(2), Command::GuestAdd { user: uid(3) }).is_ok());
        let result = run(&room, uid(2), Command::Rename { name: "x".into() });
        assert_eq!(kind(result), ErrorKind::NotAuthorized);
    }

    // ---- rename / resize / bitrate ----

    #[test]
    fn test_plan_rename_trims_and_edits() {
        let plan = run(&room(), OWNER, Command::Rename { name: "  lounge ".into() }).unwrap();
        assert_eq!(plan.next.name, "lounge");
        assert_eq!(plan.next.default_name, "alice's Channel");
        assert_eq!(
            plan.effects,
            vec![Effect::Edit {
                edit: ChannelEdit {
                    name: Some("lounge".into()),
                    ..ChannelEdit::default()
                }
            }]
        );
    }

    #[test]
    fn test_plan_rename_rejects_empty_and_too_long() {
        assert_eq!(
            kind(run(&room(), OWNER, Command::Rename { name: "   ".into() })),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            kind(run(&room(), OWNER, Command::Rename { name: "x".repeat(101) })),
            ErrorKind::InvalidArgument
        );
        assert!(run(&room(), OWNER, Command::Rename { name: "x".repeat(100) }).is_ok());
    }

    #[test]
    fn test_plan_resize_bounds() {
        let plan = run(&room(), OWNER, Command::Resize { limit: 0 }).unwrap();
        assert_eq!(plan.next.limit, UserLimit::Unlimited);

        let plan = run(&room(), OWNER, Command::Resize { limit: 99 }).unwrap();
        assert_eq!(plan.next.limit, UserLimit::Max(99));

        for bad in [-1, 100, i64::MAX, i64::MIN] {
            assert_eq!(
                kind(run(&room(), OWNER, Command::Resize { limit: bad })),
                ErrorKind::InvalidArgument,
                "{bad}"
            );
        }
    }

    #[test]
    fn test_plan_bitrate_bounds() {
        assert_eq!(
            run(&room(), OWNER, Command::SetBitrate { kbps: 8 }).unwrap().next.bitrate_kbps,
            8
        );
        assert_eq!(
            run(&room(), OWNER, Command::SetBitrate { kbps: 96 }).unwrap().next.bitrate_kbps,
            96
        );
        for bad in [7, 97, -64] {
            assert_eq!(
                kind(run(&room(), OWNER, Command::SetBitrate { kbps: bad })),
                ErrorKind::InvalidArgument
            );
        }
    }

    // ---- privacy / lists ----

    #[test]
    fn test_plan_toggle_privacy_flips_everyone_connect() {
        let plan = run(&room(), OWNER, Command::TogglePrivacy).unwrap();
        assert!(plan.next.is_private);
        assert_eq!(
            plan.effects,
            vec![Effect::permission(
                PermissionTarget::Everyone,
                PermissionOverride::DENY_CONNECT
            )]
        );

        let back = run(&plan.next, OWNER, Command::TogglePrivacy).unwrap();
        assert!(!back.next.is_private);
    }

    #[test]
    fn test_plan_whitelist_add_has_no_effects() {
        let plan = run(&room(), OWNER, Command::WhitelistAdd { user: uid(5) }).unwrap();
        assert!(plan.next.whitelist.contains(&uid(5)));
        assert!(plan.effects.is_empty());
    }

    #[test]
    fn test_plan_blacklist_connected_user_denies_and_evicts() {
        let plan = run_with_occupants(&room(), Command::BlacklistAdd { user: uid(5) }, &[uid(5)]);

        assert!(plan.next.blacklist.contains(&uid(5)));
        assert!(plan.next.overrides.contains(&uid(5)));
        assert_eq!(
            plan.effects,
            vec![
                Effect::permission(PermissionTarget::User(uid(5)), PermissionOverride::DENY_CONNECT),
                Effect::evict(uid(5)),
            ]
        );
    }

    #[test]
    fn test_plan_blacklist_absent_user_skips_eviction() {
        let plan = run_with_occupants(&room(), Command::BlacklistAdd { user: uid(5) }, &[OWNER]);
        assert_eq!(plan.effects.len(), 1);
    }

    #[test]
    fn test_plan_blacklist_host_hands_host_back_to_owner() {
        let mut room = room();
        room.host = uid(2);
        let plan = run(&room, OWNER, Command::BlacklistAdd { user: uid(2) }).unwrap();
        assert_eq!(plan.next.host, OWNER);
    }

    #[test]
    fn test_plan_blacklist_owner_invalid() {
        assert_eq!(
            kind(run(&room(), OWNER, Command::BlacklistAdd { user: OWNER })),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_plan_guest_remove_absent_not_found() {
        assert_eq!(
            kind(run(&room(), OWNER, Command::GuestRemove { user: uid(3) })),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_plan_guest_add_then_remove() {
        let added = run(&room(), OWNER, Command::GuestAdd { user: uid(3) }).unwrap().next;
        let removed = run(&added, OWNER, Command::GuestRemove { user: uid(3) }).unwrap().next;
        assert!(removed.guests.is_empty());
    }

    // ---- host / ownership ----

    #[test]
    fn test_plan_set_host_state_only() {
        let plan = run(&room(), OWNER, Command::SetHost { user: uid(2) }).unwrap();
        assert_eq!(plan.next.host, uid(2));
        assert_eq!(plan.next.owner, OWNER);
        assert!(plan.effects.is_empty());
    }

    #[test]
    fn test_plan_set_host_blacklisted_invalid() {
        let mut room = room();
        room.blacklist.insert(uid(2));
        assert_eq!(
            kind(run(&room, OWNER, Command::SetHost { user: uid(2) })),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_plan_transfer_moves_owner_and_host_together() {
        let mut room = room();
        room.host = uid(3);
        let plan = run(&room, OWNER, Command::TransferOwnership { user: uid(2) }).unwrap();

        assert_eq!(plan.next.owner, uid(2));
        assert_eq!(plan.next.host, uid(2));
        assert_eq!(
            plan.effects,
            vec![
                Effect::permission(PermissionTarget::User(OWNER), PermissionOverride::ALLOW_CONNECT),
                Effect::permission(PermissionTarget::User(uid(2)), PermissionOverride::MANAGER),
            ]
        );
    }

    #[test]
    fn test_plan_transfer_to_self_invalid() {
        assert_eq!(
            kind(run(&room(), OWNER, Command::TransferOwnership { user: OWNER })),
            ErrorKind::InvalidArgument
        );
    }

    // ---- reset ----

    #[test]
    fn test_plan_reset_reverts_everything_but_owner_override() {
        let mut room = room();
        room.name = "renamed".into();
        room.host = uid(2);
        room.guests.insert(uid(3));
        room.whitelist.insert(uid(4));
        room.blacklist.insert(uid(5));
        room.overrides.insert(uid(5));
        room.is_private = true;
        room.limit = UserLimit::Max(4);
        room.bitrate_kbps = 32;

        let plan = run(&room, OWNER, Command::Reset).unwrap();
        let next = &plan.next;

        assert_eq!(next.name, "alice's Channel");
        assert_eq!(next.host, OWNER);
        assert!(next.guests.is_empty() && next.whitelist.is_empty() && next.blacklist.is_empty());
        assert!(!next.is_private);
        assert_eq!(next.limit, UserLimit::Unlimited);
        assert_eq!(next.bitrate_kbps, 64);
        assert_eq!(next.overrides.len(), 1);

        assert_eq!(
            plan.effects[0],
            Effect::permission(PermissionTarget::User(uid(5)), PermissionOverride::INHERIT)
        );
        assert!(!plan.effects.contains(&Effect::permission(
            PermissionTarget::User(OWNER),
            PermissionOverride::INHERIT
        )));
    }

    #[test]
    fn test_plan_reset_is_idempotent() {
        let mut room = room();
        room.guests.insert(uid(3));
        room.overrides.insert(uid(3));

        let once = run(&room, OWNER, Command::Reset).unwrap().next;
        let twice = run(&once, OWNER, Command::Reset).unwrap().next;
        assert_eq!(once, twice);
    }

    // ---- moderation ----

    #[test]
    fn test_plan_mute_and_unmute() {
        let mut room = room();
        room.host = uid(2);
        let plan = run(&room, uid(2), Command::Mute { user: uid(3) }).unwrap();
        assert_eq!(
            plan.effects,
            vec![Effect::VoiceState {
                user: uid(3),
                state: VoiceState { muted: Some(true) }
            }]
        );
        assert_eq!(plan.next, room);

        let plan = run(&room, uid(2), Command::Unmute { user: uid(3) }).unwrap();
        assert!(matches!(
            plan.effects[0],
            Effect::VoiceState { state: VoiceState { muted: Some(false) }, .. }
        ));
    }

    #[test]
    fn test_plan_ban_keeps_blacklist_untouched() {
        let plan = run_with_occupants(&room(), Command::Ban { user: uid(6) }, &[uid(6)]);
        assert!(plan.next.blacklist.is_empty());
        assert_eq!(plan.effects.last(), Some(&Effect::evict(uid(6))));
    }

    #[test]
    fn test_plan_unban_clears_blacklist_and_allows_connect() {
        let mut room = room();
        room.blacklist.insert(uid(6));
        let plan = run(&room, OWNER, Command::Unban { user: uid(6) }).unwrap();

        assert!(!plan.next.blacklist.contains(&uid(6)));
        assert_eq!(
            plan.effects,
            vec![Effect::permission(
                PermissionTarget::User(uid(6)),
                PermissionOverride::ALLOW_CONNECT
            )]
        );
    }

    #[test]
    fn test_plan_read_only_commands_change_nothing() {
        let room = room();
        let plan = run(&room, uid(9), Command::Info).unwrap();
        assert_eq!(plan.next, room);
        assert!(plan.effects.is_empty());

        assert_eq!(kind(run(&room, uid(9), Command::GuestList)), ErrorKind::NotAuthorized);
    }
}
