//! Error types for the protocol layer.
//!
//! Each crate in Voxroom defines its own error enum. A `ProtocolError`
//! means a collaborator handed us vocabulary we don't recognise, not that
//! anything went wrong with a room.

/// Errors that can occur while interpreting protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A quick-create identifier did not name any size preset.
    ///
    /// Quick-create buttons carry ids like `size_4` or plain labels like
    /// `quad`; anything else ends up here.
    #[error("unknown size preset: {0}")]
    UnknownPreset(String),
}
