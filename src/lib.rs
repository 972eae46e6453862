//! # Mallet - Playable Instrument Engine
//!
//! Turns key presses, pad hits and note names into scheduled audio.
//!
//! ## Architecture
//!
//! Mallet is an umbrella crate that coordinates:
//! - **mallet-core** - Audio context, gain automation, timer clock and deferred queue
//! - **mallet-midi** - Pitch names and frequencies, MIDI decoding, input devices
//! - **mallet-synth** - Sustained note tracking, instrument registry, built-in instruments
//!
//! ## Quick Start
//!
//! ```ignore
//! use mallet::prelude::*;
//!
//! let engine = MalletEngine::builder()
//!     .sample_rate(48000.0)
//!     .build()?;
//!
//! // Sustained note on the default instrument
//! let id = engine.note_on("C#5", 0.8).unwrap();
//!
//! // One-shot hit
//! engine.play("tibetan-bowl", 60, 0.8, 2.0);
//!
//! let block = engine.render(512);
//! engine.note_off(id.as_str());
//! engine.pump();
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Everything but hardware input
//! - `midi-io` - Hardware MIDI input via midir

/// Re-export of the subsystem crates for direct access
pub use mallet_core as core;
pub use mallet_midi as midi;
pub use mallet_synth as synth;

pub use mallet_core::{AudioContext, Bus, Clock, GainNode, ManualClock, SourceNode, VoiceHandle, WallClock};

pub use mallet_midi::{
    pitch_to_frequency, pitch_to_name, Device, DeviceAction, DeviceState, KeyboardDevice,
    MidiEvent, PadControllerDevice, Pitch, PitchInput, PitchTranslator, RawDeviceMessage,
};

#[cfg(feature = "midi-io")]
pub use mallet_midi::{MidiInputConnector, MidiInputDevice};

pub use mallet_synth::{
    instruments, Catalog, InstrumentInfo, InstrumentMetadata, InstrumentRegistry, NoteHandle,
    NoteId, NoteTracker, PlayOptions, ReleasePolicy, SoundGenerator, TrackerTelemetry,
};

pub mod error;
pub use error::{Error, Result};

mod config;
pub use config::EngineConfig;

mod builder;
mod engine;

pub use builder::MalletEngineBuilder;
pub use engine::{EngineTelemetry, MalletEngine, PumpStats};

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{EngineConfig, MalletEngine, MalletEngineBuilder};

    // Pitches and devices
    pub use crate::midi::{Device, Pitch, PitchTranslator};

    // Instruments
    pub use crate::synth::{InstrumentMetadata, NoteId, PlayOptions, SoundGenerator};

    // Clocks
    pub use crate::core::{Clock, ManualClock};
}
