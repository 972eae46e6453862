//! Error types for mallet-synth.

use thiserror::Error;

/// Result type alias for mallet-synth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mallet-synth.
///
/// Public tracker and registry operations never return these; they log
/// them and hand back `None` or `false`. Sound generators return them.
#[derive(Debug, Error)]
pub enum Error {
    /// Audio graph failure (closed context, invalid ramp, finished source).
    #[error("Audio graph error: {0}")]
    Core(#[from] mallet_core::Error),

    /// A generator could not build its voices.
    #[error("Generator error: {0}")]
    Generator(String),

    #[error("No audio context attached")]
    MissingContext,

    #[error("No sound source")]
    MissingSource,

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),
}
