//! Pitch name translation with deduplicated fallback warnings.
//!
//! Accepted names are `<letter><accidental?><octave?>`, case-insensitive:
//! `C#5`, `bb`, `Eb-1`, `g`. A missing octave means octave 4. Flats are
//! rewritten to their sharp spelling before lookup, except `Cb`, which maps
//! to `B` of the *same* octave number (so `Cb4` is 71, not 59).
//!
//! Anything that doesn't parse, or lands outside `0..=127`, becomes
//! [`FALLBACK_PITCH`]. The first time a given raw input falls back, a
//! warning is logged; repeats are silent.

use dashmap::DashSet;
use tracing::warn;

use crate::note::{Pitch, SHARP_NAMES};
use crate::utils::{frequency_to_pitch, pitch_to_frequency, pitch_to_name};

/// Octave used when a name has none.
pub const DEFAULT_OCTAVE: i32 = 4;

/// Pitch substituted for unparsable or out-of-range input.
pub const FALLBACK_PITCH: Pitch = Pitch::MIDDLE_C;

/// Octave-less names resolved directly to octave 4, checked before the
/// general pattern.
const LEGACY_NAMES: [(&str, u8); 19] = [
    ("C", 60),
    ("C#", 61),
    ("DB", 61),
    ("D", 62),
    ("D#", 63),
    ("EB", 63),
    ("E", 64),
    ("FB", 64),
    ("F", 65),
    ("F#", 66),
    ("GB", 66),
    ("G", 67),
    ("G#", 68),
    ("AB", 68),
    ("A", 69),
    ("A#", 70),
    ("BB", 70),
    ("B", 71),
    ("CB", 71),
];

/// Flat spellings and their sharp equivalents.
const ENHARMONIC_FLATS: [(&str, &str); 7] = [
    ("DB", "C#"),
    ("EB", "D#"),
    ("FB", "E"),
    ("GB", "F#"),
    ("AB", "G#"),
    ("BB", "A#"),
    ("CB", "B"),
];

/// Anything that can be asked for as a pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchInput<'a> {
    Name(&'a str),
    Number(f64),
    /// No value at all (an absent field, a null from a UI layer).
    Missing,
}

impl PitchInput<'_> {
    /// Key used to deduplicate fallback warnings.
    fn warning_key(&self) -> String {
        match self {
            PitchInput::Name(name) => (*name).to_string(),
            PitchInput::Number(n) => n.to_string(),
            PitchInput::Missing => "<missing>".to_string(),
        }
    }
}

impl<'a> From<&'a str> for PitchInput<'a> {
    fn from(name: &'a str) -> Self {
        PitchInput::Name(name)
    }
}

impl<'a> From<&'a String> for PitchInput<'a> {
    fn from(name: &'a String) -> Self {
        PitchInput::Name(name.as_str())
    }
}

impl<'a> From<Option<&'a str>> for PitchInput<'a> {
    fn from(name: Option<&'a str>) -> Self {
        name.map_or(PitchInput::Missing, PitchInput::Name)
    }
}

impl From<f64> for PitchInput<'_> {
    fn from(n: f64) -> Self {
        PitchInput::Number(n)
    }
}

impl From<f32> for PitchInput<'_> {
    fn from(n: f32) -> Self {
        PitchInput::Number(n as f64)
    }
}

impl From<i32> for PitchInput<'_> {
    fn from(n: i32) -> Self {
        PitchInput::Number(n as f64)
    }
}

impl From<u8> for PitchInput<'_> {
    fn from(n: u8) -> Self {
        PitchInput::Number(n as f64)
    }
}

impl From<Pitch> for PitchInput<'_> {
    fn from(pitch: Pitch) -> Self {
        PitchInput::Number(pitch.get() as f64)
    }
}

/// Converts between pitch names, pitch codes and frequencies.
///
/// Owns the set of inputs already warned about, so one translator can be
/// shared (`Arc<PitchTranslator>`) between the note tracker and input
/// devices without warnings repeating.
#[derive(Debug, Default)]
pub struct PitchTranslator {
    warned: DashSet<String>,
}

impl PitchTranslator {
    pub fn new() -> Self {
        Self {
            warned: DashSet::new(),
        }
    }

    /// Resolve any input to a pitch, falling back to [`FALLBACK_PITCH`].
    ///
    /// Finite numbers are rounded and clamped without a warning.
    pub fn name_to_pitch<'a>(&self, input: impl Into<PitchInput<'a>>) -> Pitch {
        let input = input.into();
        match Self::try_resolve(input) {
            Some(pitch) => pitch,
            None => {
                let key = input.warning_key();
                if self.warned.insert(key) {
                    warn!(
                        input = ?input,
                        fallback = %FALLBACK_PITCH,
                        "Unrecognized pitch, using fallback"
                    );
                }
                FALLBACK_PITCH
            }
        }
    }

    /// Resolve without falling back or warning.
    pub fn try_resolve(input: PitchInput<'_>) -> Option<Pitch> {
        match input {
            PitchInput::Number(n) if n.is_finite() => Some(Pitch::clamped(n.round() as i64)),
            PitchInput::Number(_) | PitchInput::Missing => None,
            PitchInput::Name(raw) => {
                let name = raw.trim().to_uppercase();
                if let Some((_, pitch)) = LEGACY_NAMES.iter().find(|(legacy, _)| *legacy == name) {
                    return Pitch::new(*pitch);
                }
                parse_pitch_name(&name)
                    .filter(|p| (0..=127).contains(p))
                    .map(Pitch::clamped)
            }
        }
    }

    pub fn pitch_to_name(&self, pitch: Pitch) -> String {
        pitch_to_name(pitch.get())
    }

    pub fn frequency_to_pitch(&self, hz: f64) -> i32 {
        frequency_to_pitch(hz)
    }

    pub fn pitch_to_frequency(&self, pitch: Pitch) -> f64 {
        pitch_to_frequency(pitch.get() as f64)
    }

    /// Forget every warned input, so the next fallback warns again.
    pub fn reset_warnings(&self) {
        self.warned.clear();
    }

    /// Number of distinct inputs that have triggered a fallback warning.
    pub fn warning_count(&self) -> usize {
        self.warned.len()
    }

    pub fn has_warned(&self, raw_input: &str) -> bool {
        self.warned.contains(raw_input)
    }
}

/// Parse an uppercased `LETTER [#|B] [signed octave]` name into an unclamped
/// pitch number.
fn parse_pitch_name(name: &str) -> Option<i64> {
    let mut chars = name.chars();
    let letter = chars.next().filter(|c| matches!(c, 'A'..='G'))?;
    let rest = chars.as_str();

    let (accidental, octave_text) = match rest.chars().next() {
        Some(c @ ('#' | 'B')) => (Some(c), &rest[1..]),
        _ => (None, rest),
    };

    let octave = if octave_text.is_empty() {
        DEFAULT_OCTAVE as i64
    } else {
        parse_octave(octave_text)?
    };

    let mut spelled = letter.to_string();
    if let Some(accidental) = accidental {
        spelled.push(accidental);
    }
    let sharp = ENHARMONIC_FLATS
        .iter()
        .find(|(flat, _)| *flat == spelled)
        .map_or(spelled.as_str(), |(_, sharp)| *sharp);

    let class = SHARP_NAMES.iter().position(|n| *n == sharp)? as i64;
    Some(class + (octave + 1) * 12)
}

/// Optional sign followed by ASCII digits only.
fn parse_octave(text: &str) -> Option<i64> {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || digits.len() > 6 {
        return None;
    }
    text.parse().ok()
}
