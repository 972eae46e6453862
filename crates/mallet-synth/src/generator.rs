//! The sound generator contract.

use mallet_core::{Bus, VoiceHandle};
use mallet_midi::Pitch;
use smallvec::SmallVec;

use crate::error::Result;

/// Velocity used when none (or a non-finite one) is given.
pub const DEFAULT_VELOCITY: f32 = 0.8;

/// Per-call playback options.
#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    /// Bus to play into; the context's master bus when `None`.
    pub destination: Option<Bus>,
    /// Audio-clock start time; the context's current time when `None`.
    pub start_time: Option<f64>,
    /// Whole-note detune.
    pub detune_cents: f32,
}

impl PlayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn destination(mut self, bus: Bus) -> Self {
        self.destination = Some(bus);
        self
    }

    pub fn start_time(mut self, time: f64) -> Self {
        self.start_time = Some(time);
        self
    }

    pub fn detune_cents(mut self, cents: f32) -> Self {
        self.detune_cents = cents;
        self
    }
}

/// Every voice backing one played note. Layered instruments return several.
#[derive(Debug, Clone, Default)]
pub struct NoteHandle {
    voices: SmallVec<[VoiceHandle; 4]>,
}

impl NoteHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, voice: VoiceHandle) {
        self.voices.push(voice);
    }

    pub fn voices(&self) -> &[VoiceHandle] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// True when every voice's source has finished.
    pub fn is_finished(&self) -> bool {
        self.voices.iter().all(VoiceHandle::is_finished)
    }
}

impl From<VoiceHandle> for NoteHandle {
    fn from(voice: VoiceHandle) -> Self {
        let mut handle = Self::new();
        handle.push(voice);
        handle
    }
}

impl FromIterator<VoiceHandle> for NoteHandle {
    fn from_iter<I: IntoIterator<Item = VoiceHandle>>(iter: I) -> Self {
        Self {
            voices: iter.into_iter().collect(),
        }
    }
}

/// Something that can play a note on an audio context.
///
/// `play` schedules the whole envelope up front, including a source stop
/// after `duration` plus the generator's release. Callers may override it
/// by rescheduling gains and stops on the returned handle.
pub trait SoundGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// `velocity` is in `0.0..=1.0`, `duration` in seconds.
    fn play(
        &self,
        pitch: Pitch,
        velocity: f32,
        duration: f64,
        options: &PlayOptions,
    ) -> Result<NoteHandle>;
}

/// Clamp to `0.0..=1.0`, substituting [`DEFAULT_VELOCITY`] for non-finite
/// input.
pub(crate) fn sanitize_velocity(velocity: f32) -> f32 {
    if velocity.is_finite() {
        velocity.clamp(0.0, 1.0)
    } else {
        DEFAULT_VELOCITY
    }
}

/// Non-finite or negative seconds become `default`.
pub(crate) fn sanitize_seconds(seconds: f64, default: f64) -> f64 {
    if seconds.is_finite() && seconds >= 0.0 {
        seconds
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_velocity() {
        assert_eq!(sanitize_velocity(1.5), 1.0);
        assert_eq!(sanitize_velocity(-0.2), 0.0);
        assert_eq!(sanitize_velocity(f32::NAN), DEFAULT_VELOCITY);
    }

    #[test]
    fn test_sanitize_seconds() {
        assert_eq!(sanitize_seconds(0.3, 0.12), 0.3);
        assert_eq!(sanitize_seconds(-1.0, 0.12), 0.12);
        assert_eq!(sanitize_seconds(f64::INFINITY, 2.0), 2.0);
    }

    #[test]
    fn test_empty_handle_is_finished() {
        assert!(NoteHandle::new().is_finished());
    }
}
