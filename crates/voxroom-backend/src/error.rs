use voxroom_protocol::{ChannelId, UserId};

/// Errors that can occur in the backend layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The channel does not exist (anymore).
    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),

    /// The platform does not know this user.
    #[error("unknown user {0}")]
    UnknownUser(UserId),

    /// The platform refused the request (missing permission, channel full).
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The platform could not be reached or timed out.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
