//! Error types for mallet-core.

use thiserror::Error;

/// Error type for audio context operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Audio context is closed")]
    ContextClosed,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid ramp target: {0}. Exponential ramps need a positive target")]
    InvalidRampTarget(f32),

    #[error("Invalid value: {0}. Must be finite")]
    InvalidValue(f32),

    #[error("Invalid time: {0}. Must be finite and non-negative")]
    InvalidTime(f64),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Reject negative or non-finite times.
pub(crate) fn check_time(time: f64) -> Result<f64> {
    if time.is_finite() && time >= 0.0 {
        Ok(time)
    } else {
        Err(Error::InvalidTime(time))
    }
}
