//! Shared vocabulary for Voxroom.
//!
//! This crate defines the "language" the core speaks with its collaborators:
//!
//! - **Identity** ([`UserId`], [`ChannelId`], [`GroupId`]): opaque ids
//!   assigned by the chat transport.
//! - **Events** ([`TransitionEvent`]): a user moved between voice
//!   channels (or connected / disconnected).
//! - **Commands** ([`Command`], [`Action`], [`Authority`], [`SizePreset`]):
//!   the admin operations a room owner or host can request.
//! - **Notices** ([`Notice`]): what happened, for the collaborator to format
//!   and post wherever it likes.
//!
//! # Architecture
//!
//! ```text
//! Transport (events, commands) → Protocol (typed vocabulary) → Room core
//! ```
//!
//! Nothing in here knows about rooms, locks, or backends. It only names
//! things.

mod command;
mod error;
mod notice;
mod types;

pub use command::{Action, Authority, Command, SizePreset};
pub use error::ProtocolError;
pub use notice::Notice;
pub use types::{ChannelId, GroupId, TransitionEvent, UserId};
