//! Unified error type for the Voxroom service.

use voxroom_backend::BackendError;
use voxroom_protocol::ProtocolError;
use voxroom_room::RoomError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum VoxroomError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The chat platform refused or failed a request.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A room-level error (not in a room, not authorized, bad argument).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A value could not be parsed (e.g. an unknown size preset).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
