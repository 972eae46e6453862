//! Pitch, frequency and velocity conversions.

use crate::note::SHARP_NAMES;

/// `440 * 2^((pitch - 69) / 12)`.
#[inline]
pub fn pitch_to_frequency(pitch: f64) -> f64 {
    440.0 * 2f64.powf((pitch - 69.0) / 12.0)
}

/// `round(69 + 12 * log2(hz / 440))`.
///
/// Not clamped: frequencies outside the MIDI range give pitches outside
/// `0..=127`, and callers validate. Non-positive input saturates.
#[inline]
pub fn frequency_to_pitch(hz: f64) -> i32 {
    (69.0 + 12.0 * (hz / 440.0).log2()).round() as i32
}

/// Sharp-only name with octave, `octave = pitch / 12 - 1`.
///
/// Callers pass values in `0..=127`; nothing is clamped.
pub fn pitch_to_name(pitch: u8) -> String {
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", SHARP_NAMES[(pitch % 12) as usize], octave)
}

#[inline]
pub fn velocity_to_gain(velocity: u8) -> f32 {
    velocity.min(127) as f32 / 127.0
}

#[inline]
pub fn gain_to_velocity(gain: f32) -> u8 {
    (gain.clamp(0.0, 1.0) * 127.0).round() as u8
}
