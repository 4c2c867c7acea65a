//! # Voxroom
//!
//! Ephemeral, user-owned voice rooms.
//!
//! A user who connects to the spawn room gets a fresh voice channel of
//! their own and is moved into it. They own it: they can rename it, cap
//! it, make it private, hand out host rights, ban people, or give it away.
//! When the last person leaves, the room is deleted.
//!
//! The platform itself sits behind [`ChannelBackend`](voxroom_backend::ChannelBackend);
//! [`MemoryBackend`](voxroom_backend::MemoryBackend) is an in-process
//! implementation for tests and demos.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use voxroom::prelude::*;
//!
//! # async fn demo() -> Result<(), VoxroomError> {
//! let backend = Arc::new(MemoryBackend::new());
//! let (events_tx, events_rx) = tokio::sync::mpsc::channel(64);
//!
//! let service = VoxroomServiceBuilder::new()
//!     .config(ServiceConfig::from_env()?)
//!     .build(backend)
//!     .await?;
//! # drop(events_tx);
//! service.run(events_rx).await
//! # }
//! ```

mod config;
mod error;
mod service;
pub mod telemetry;

pub use config::{ConfigError, ServiceConfig};
pub use error::VoxroomError;
pub use service::{VoxroomService, VoxroomServiceBuilder};
pub use telemetry::init_tracing;

pub use voxroom_backend as backend;
pub use voxroom_presence as presence;
pub use voxroom_protocol as protocol;
pub use voxroom_room as room;

/// The types most callers need, in one import.
pub mod prelude {
    pub use crate::telemetry::init_tracing;
    pub use crate::{ConfigError, ServiceConfig, VoxroomError, VoxroomService, VoxroomServiceBuilder};

    pub use voxroom_backend::{BackendError, ChannelBackend, MemoryBackend};
    pub use voxroom_protocol::{
        Action, ChannelId, Command, GroupId, Notice, SizePreset, TransitionEvent, UserId,
    };
    pub use voxroom_room::{
        CreateRequest, ErrorKind, NoticeSender, RoomConfig, RoomError, RoomManager, RoomSnapshot,
    };
}
