//! The presence tracker: a user → channel index.
//!
//! # Concurrency note
//!
//! `PresenceTracker` is a plain `HashMap` wrapper and is not thread-safe by
//! itself. The room manager owns it behind a mutex and only holds that lock
//! for the duration of a lookup or an update, never across a backend call.

use std::collections::HashMap;

use voxroom_protocol::{ChannelId, TransitionEvent, UserId};

/// What a [`TransitionEvent`] meant, once applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub user: UserId,
    /// The channel the user left, if any.
    pub left: Option<ChannelId>,
    /// The channel the user entered, if any.
    pub joined: Option<ChannelId>,
}

/// Tracks where every connected user is.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    locations: HashMap<UserId, ChannelId>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event into the index.
    ///
    /// Returns `None` for events that do not change membership (same
    /// channel on both sides). The event is authoritative: if the index
    /// disagrees about where the user came from, the index is corrected.
    pub fn apply(&mut self, event: &TransitionEvent) -> Option<Transition> {
        if event.is_noop() {
            return None;
        }

        let previous = match event.to {
            Some(channel) => self.locations.insert(event.user, channel),
            None => self.locations.remove(&event.user),
        };
        if previous != event.from {
            tracing::debug!(
                user = %event.user,
                recorded = ?previous,
                reported = ?event.from,
                "presence resynced from event"
            );
        }

        Some(Transition {
            user: event.user,
            left: event.from,
            joined: event.to,
        })
    }

    /// The channel `user` is connected to, if any.
    pub fn location(&self, user: UserId) -> Option<ChannelId> {
        self.locations.get(&user).copied()
    }

    /// Drops every entry that points at `channel`. Called after the channel
    /// was deleted.
    pub fn forget_channel(&mut self, channel: ChannelId) {
        self.locations.retain(|_, c| *c != channel);
    }

    /// Number of users currently connected anywhere.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u64) -> UserId {
        UserId(n)
    }

    fn cid(n: u64) -> ChannelId {
        ChannelId(n)
    }

    #[test]
    fn test_apply_connect_records_location() {
        let mut tracker = PresenceTracker::new();
        let t = tracker
            .apply(&TransitionEvent::new(uid(1), None, Some(cid(5))))
            .unwrap();

        assert_eq!(t.joined, Some(cid(5)));
        assert_eq!(t.left, None);
        assert_eq!(tracker.location(uid(1)), Some(cid(5)));
    }

    #[test]
    fn test_apply_move_updates_location() {
        let mut tracker = PresenceTracker::new();
        tracker.apply(&TransitionEvent::new(uid(1), None, Some(cid(5))));
        let t = tracker
            .apply(&TransitionEvent::new(uid(1), Some(cid(5)), Some(cid(6))))
            .unwrap();

        assert_eq!(t.left, Some(cid(5)));
        assert_eq!(t.joined, Some(cid(6)));
        assert_eq!(tracker.location(uid(1)), Some(cid(6)));
    }

    #[test]
    fn test_apply_disconnect_removes_user() {
        let mut tracker = PresenceTracker::new();
        tracker.apply(&TransitionEvent::new(uid(1), None, Some(cid(5))));
        tracker.apply(&TransitionEvent::new(uid(1), Some(cid(5)), None));

        assert_eq!(tracker.location(uid(1)), None);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_apply_noop_returns_none() {
        let mut tracker = PresenceTracker::new();
        tracker.apply(&TransitionEvent::new(uid(1), None, Some(cid(5))));

        let t = tracker.apply(&TransitionEvent::new(uid(1), Some(cid(5)), Some(cid(5))));
        assert!(t.is_none());
        assert_eq!(tracker.location(uid(1)), Some(cid(5)));
    }

    #[test]
    fn test_apply_trusts_event_over_stale_index() {
        let mut tracker = PresenceTracker::new();
        // Missed the connect to 5; the move out of 5 still lands the user in 6.
        let t = tracker
            .apply(&TransitionEvent::new(uid(1), Some(cid(5)), Some(cid(6))))
            .unwrap();

        assert_eq!(t.left, Some(cid(5)));
        assert_eq!(tracker.location(uid(1)), Some(cid(6)));
    }

    #[test]
    fn test_forget_channel_drops_only_that_channel() {
        let mut tracker = PresenceTracker::new();
        tracker.apply(&TransitionEvent::new(uid(1), None, Some(cid(5))));
        tracker.apply(&TransitionEvent::new(uid(2), None, Some(cid(5))));
        tracker.apply(&TransitionEvent::new(uid(3), None, Some(cid(6))));

        tracker.forget_channel(cid(5));
        assert_eq!(tracker.location(uid(1)), None);
        assert_eq!(tracker.location(uid(2)), None);
        assert_eq!(tracker.location(uid(3)), Some(cid(6)));
        assert_eq!(tracker.len(), 1);
    }
}
