//! Error types for mallet-midi.

use thiserror::Error;

/// Result type alias for mallet-midi operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mallet-midi.
#[derive(Debug, Error)]
pub enum Error {
    /// Bytes could not be decoded as a channel-voice message.
    #[error("MIDI parse error: {0}")]
    Parse(String),

    /// Hardware port could not be opened or connected.
    #[error("MIDI connection error: {0}")]
    Connection(String),

    /// No hardware port with the requested name.
    #[error("MIDI device not found: {0}")]
    DeviceNotFound(String),
}
