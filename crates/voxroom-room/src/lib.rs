//! Room lifecycle, access control and admin commands for Voxroom.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! room's state. The [`RoomManager`] turns transition events and admin
//! commands into messages for those actors.
//!
//! # Key types
//!
//! - [`RoomManager`]: event entry point, command handlers, room creation
//! - [`RoomRegistry`]: which channels are tracked rooms
//! - [`RoomHandle`]: send messages to a running room actor
//! - [`Room`] / [`RoomSnapshot`]: the room entity and its public copy
//! - [`plan()`] and [`access`]: the pure decision logic
//! - [`RoomError`] / [`ErrorKind`]: what goes wrong, and how to report it
//!
//! # How it fits in the stack
//!
//! ```text
//! voxroom (above)          ← service wiring, config, event loop
//!     ↕
//! Room Layer (this crate)  ← rooms, roles, lifecycle
//!     ↕
//! Presence + Backend       ← where users are; the chat platform
//! ```

pub mod access;
mod commands;
mod config;
mod effect;
mod error;
mod lifecycle;
mod manager;
mod model;
mod plan;
mod registry;
mod room;

pub use commands::CreateRequest;
pub use config::{NAME_PLACEHOLDER, RoomConfig};
pub use effect::Effect;
pub use error::{EffectFailure, ErrorKind, RoomError};
pub use lifecycle::EventTicket;
pub use manager::{NoticeSender, RoomManager, SpawnPoint};
pub use model::{Room, RoomSnapshot};
pub use plan::{Plan, PlanContext, plan};
pub use registry::RoomRegistry;
pub use room::{CommandOutcome, PendingReply, RoomHandle};
