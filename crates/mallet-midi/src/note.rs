//! Pitch codes.
//!
//! A [`Pitch`] is a semitone step on a piano-like scale in the MIDI range
//! (0-127), named in scientific pitch notation:
//!
//! - Letter: C, D, E, F, G, A, B
//! - Accidental: `#` (sharps only when formatting)
//! - Octave: -1 to 9
//!
//! Middle C (60) is `C4`. Concert A (440 Hz, 69) is `A4`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{pitch_to_frequency, pitch_to_name};

/// Sharp-only pitch class names, indexed by `pitch % 12`.
pub const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Pitch code in `0..=127`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Pitch(u8);

impl Pitch {
    pub const MIN: Pitch = Pitch(0);
    pub const MAX: Pitch = Pitch(127);
    pub const MIDDLE_C: Pitch = Pitch(60);
    pub const CONCERT_A: Pitch = Pitch(69);

    /// Returns `None` if the value is > 127.
    pub const fn new(value: u8) -> Option<Pitch> {
        if value > 127 {
            None
        } else {
            Some(Pitch(value))
        }
    }

    /// Clamp any integer into the pitch range.
    pub fn clamped(value: i64) -> Pitch {
        Pitch(value.clamp(0, 127) as u8)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns -1 to 9.
    pub const fn octave(self) -> i8 {
        (self.0 / 12) as i8 - 1
    }

    /// 0-11, where 0 = C.
    pub const fn pitch_class(self) -> u8 {
        self.0 % 12
    }

    /// Frequency in Hz (A4 = 440 Hz, equal temperament).
    pub fn frequency(self) -> f64 {
        pitch_to_frequency(self.0 as f64)
    }

    /// Canonical sharp name, e.g. `D#4`.
    pub fn name(self) -> String {
        pitch_to_name(self.0)
    }

    /// Returns `None` if the result would leave the pitch range.
    pub fn transpose(self, semitones: i8) -> Option<Pitch> {
        let shifted = self.0 as i16 + semitones as i16;
        if (0..=127).contains(&shifted) {
            Some(Pitch(shifted as u8))
        } else {
            None
        }
    }
}

impl Default for Pitch {
    fn default() -> Self {
        Pitch::MIDDLE_C
    }
}

impl From<Pitch> for u8 {
    fn from(pitch: Pitch) -> u8 {
        pitch.0
    }
}

impl TryFrom<u8> for Pitch {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Pitch::new(value).ok_or_else(|| format!("pitch {value} is outside 0..=127"))
    }
}

impl PartialEq<u8> for Pitch {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octave_and_class() {
        assert_eq!(Pitch::MIDDLE_C.octave(), 4);
        assert_eq!(Pitch::MIN.octave(), -1);
        assert_eq!(Pitch::new(61).unwrap().pitch_class(), 1);
        assert_eq!(Pitch::new(71).unwrap().pitch_class(), 11);
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(Pitch::new(127).is_some());
        assert!(Pitch::new(128).is_none());
        assert_eq!(Pitch::clamped(-5), Pitch::MIN);
        assert_eq!(Pitch::clamped(500), Pitch::MAX);
    }

    #[test]
    fn test_frequency_known_values() {
        assert!((Pitch::CONCERT_A.frequency() - 440.0).abs() < 1e-9);
        assert!((Pitch::new(57).unwrap().frequency() - 220.0).abs() < 0.01);
        assert!((Pitch::MIDDLE_C.frequency() - 261.63).abs() < 0.01);
    }

    #[test]
    fn test_display_uses_sharps() {
        assert_eq!(Pitch::new(63).unwrap().to_string(), "D#4");
        assert_eq!(Pitch::MIN.to_string(), "C-1");
        assert_eq!(Pitch::MAX.to_string(), "G9");
    }

    #[test]
    fn test_transpose_bounds() {
        assert_eq!(Pitch::MIDDLE_C.transpose(12), Pitch::new(72));
        assert_eq!(Pitch::MAX.transpose(1), None);
        assert_eq!(Pitch::MIN.transpose(-1), None);
    }
}
