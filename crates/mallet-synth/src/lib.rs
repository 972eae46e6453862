//! Note lifecycle and instrument dispatch for mallet.
//!
//! - **[`SoundGenerator`]** - Anything that can play a pitch on an audio context
//! - **[`NoteTracker`]** - Sustained notes keyed by generated identity, released
//!   with a linear fade and a late source stop
//! - **[`InstrumentRegistry`]** - Instrument catalog and fixed-duration hits
//!   keyed by `(instrument, pitch)`, stopped with an exponential fade
//! - **[`ActiveVoiceIndex`]** - The key-to-handles index both of them use
//! - **[`instruments`]** - Built-in synthetic instruments
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use mallet_core::{AudioContext, WallClock};
//! use mallet_midi::{Pitch, PitchTranslator};
//! use mallet_synth::{instruments, InstrumentRegistry, NoteTracker};
//!
//! let ctx = Arc::new(AudioContext::new(48_000.0)?);
//! let mut registry = InstrumentRegistry::new(Arc::clone(&ctx), Arc::new(WallClock::new()));
//! instruments::register_builtin_instruments(&mut registry);
//! registry.play_note_default("tibetan-bowl", Pitch::MIDDLE_C);
//!
//! let keys = registry.get(instruments::DEFAULT_INSTRUMENT).unwrap();
//! let mut tracker = NoteTracker::new(Arc::new(PitchTranslator::new())).with_context(ctx);
//! let id = tracker.start("C#5", Some(keys.as_ref()), None, 0.8).unwrap();
//! tracker.stop(id.as_str());
//! ```

pub mod error;
pub use error::{Error, Result};

mod generator;
pub use generator::{NoteHandle, PlayOptions, SoundGenerator, DEFAULT_VELOCITY};

mod voice_index;
pub use voice_index::{ActiveNote, ActiveVoiceIndex, ReleasePolicy, RELEASE_FLOOR};

mod tracker;
pub use tracker::{NoteId, NoteTracker, SustainedNote, TrackerConfig, TrackerTelemetry};

mod registry;
pub use registry::{
    Catalog, InstrumentInfo, InstrumentMetadata, InstrumentRegistry, PlayedKey, PlayedNote,
    RegistryConfig,
};

pub mod instruments;

#[cfg(test)]
mod test_util;
