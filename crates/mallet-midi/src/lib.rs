//! MIDI side of the mallet instrument.
//!
//! Turns what the player does into pitches and velocities:
//!
//! - **Pitch translation**: names like `"C#5"` or `"Bb"` to pitch codes and back,
//!   with a deduplicated fallback for unparsable input ([`PitchTranslator`])
//! - **Frequency conversion**: equal temperament, A4 = 440 Hz
//! - **Event decoding**: raw channel-voice bytes to [`MidiEvent`]
//! - **Devices**: keyboards and pad controllers as tagged variants ([`Device`])
//! - **Hardware input**: port listing and connection (feature: `midi-io`)
//!
//! # Example
//!
//! ```ignore
//! use mallet_midi::PitchTranslator;
//!
//! let translator = PitchTranslator::new();
//! assert_eq!(translator.name_to_pitch("C#5"), 73);
//! assert_eq!(translator.name_to_pitch("Bb"), 70);
//! assert_eq!(translator.name_to_pitch("H9"), 60); // warns once
//! ```

pub mod error;
pub use error::{Error, Result};

mod note;
pub use note::{Pitch, SHARP_NAMES};

mod pitch;
pub use pitch::{PitchInput, PitchTranslator, DEFAULT_OCTAVE, FALLBACK_PITCH};

mod utils;
pub use utils::{
    frequency_to_pitch, gain_to_velocity, pitch_to_frequency, pitch_to_name, velocity_to_gain,
};

mod event;
pub use event::MidiEvent;

mod device;
pub use device::{
    Device, DeviceAction, DeviceState, KeyboardDevice, PadControllerDevice, RawDeviceMessage,
};

// Re-export upstream message types so callers don't need midi-msg directly
pub use midi_msg::{Channel, ChannelVoiceMsg, ControlChange};

#[cfg(feature = "midi-io")]
mod input;

#[cfg(feature = "midi-io")]
pub use input::{MidiInputConnector, MidiInputDevice};
