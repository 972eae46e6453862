//! Centralized error type for the mallet umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] mallet_core::Error),

    #[error("MIDI: {0}")]
    Midi(#[from] mallet_midi::Error),

    #[error("Synth: {0}")]
    Synth(#[from] mallet_synth::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
