//! Voice presence tracking for Voxroom.
//!
//! Knows which channel every user is connected to, as last reported by the
//! transport's [`TransitionEvent`](voxroom_protocol::TransitionEvent)
//! stream. The room layer uses it to resolve "the actor's current room"
//! for commands.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)      ← asks "where is this user?"
//!     ↕
//! Presence Layer (this crate)  ← folds transition events into an index
//!     ↕
//! Protocol Layer (below)  ← provides UserId, ChannelId, TransitionEvent
//! ```

mod tracker;

pub use tracker::{PresenceTracker, Transition};
