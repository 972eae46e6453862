//! Envelope-and-partials recipes for synthetic instruments.

use std::sync::Arc;

use mallet_core::dsp::{saw_hz, sine_hz, square_hz, triangle_hz, AudioUnit};
use mallet_core::{AudioContext, VoiceHandle};
use mallet_midi::Pitch;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::generator::{sanitize_seconds, sanitize_velocity, NoteHandle, PlayOptions, SoundGenerator};
use crate::voice_index::RELEASE_FLOOR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Saw,
    Triangle,
    Square,
}

impl Waveform {
    fn unit(self, hz: f32) -> Box<dyn AudioUnit> {
        match self {
            Waveform::Sine => Box::new(sine_hz(hz)),
            Waveform::Saw => Box::new(saw_hz(hz)),
            Waveform::Triangle => Box::new(triangle_hz(hz)),
            Waveform::Square => Box::new(square_hz(hz)),
        }
    }
}

/// One oscillator in a layered voice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Partial {
    /// Frequency multiple of the fundamental.
    pub ratio: f32,
    /// Level relative to the recipe level.
    pub level: f32,
    pub detune_cents: f32,
    /// Multiplies the recipe's decay time.
    pub decay_scale: f64,
}

impl Partial {
    pub const fn new(ratio: f32, level: f32) -> Self {
        Self {
            ratio,
            level,
            detune_cents: 0.0,
            decay_scale: 1.0,
        }
    }

    pub const fn detuned(mut self, cents: f32) -> Self {
        self.detune_cents = cents;
        self
    }

    pub const fn decay_scale(mut self, scale: f64) -> Self {
        self.decay_scale = scale;
        self
    }
}

/// How an instrument builds its voices.
///
/// Every partial gets its own gain and source. The gain rises linearly from
/// silence to `velocity * level * partial.level` over `attack`, decays
/// exponentially toward `sustain` times that peak, and after `duration`
/// fades exponentially to the release floor over `release`. The source stops
/// when the release ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceRecipe {
    pub waveform: Waveform,
    pub partials: Vec<Partial>,
    pub attack: f64,
    pub decay: f64,
    /// Fraction of the peak held after the decay.
    pub sustain: f32,
    pub release: f64,
    pub level: f32,
}

impl VoiceRecipe {
    /// Inharmonic sine partials with a long ring.
    pub fn tibetan_bowl() -> Self {
        Self {
            waveform: Waveform::Sine,
            partials: vec![
                Partial::new(1.0, 1.0),
                Partial::new(2.76, 0.5).decay_scale(0.8),
                Partial::new(5.40, 0.3).decay_scale(0.6),
                Partial::new(8.93, 0.18).decay_scale(0.4),
                Partial::new(13.34, 0.1).decay_scale(0.3),
            ],
            attack: 0.02,
            decay: 4.0,
            sustain: 0.3,
            release: 3.0,
            level: 0.6,
        }
    }

    /// Two saws a few cents apart, slow attack.
    pub fn soft_pad() -> Self {
        Self {
            waveform: Waveform::Saw,
            partials: vec![
                Partial::new(1.0, 0.5).detuned(-7.0),
                Partial::new(1.0, 0.5).detuned(7.0),
            ],
            attack: 0.4,
            decay: 1.0,
            sustain: 0.8,
            release: 1.5,
            level: 0.35,
        }
    }

    /// Short triangle pluck with a faint octave.
    pub fn glass_pluck() -> Self {
        Self {
            waveform: Waveform::Triangle,
            partials: vec![
                Partial::new(1.0, 1.0),
                Partial::new(2.0, 0.3).decay_scale(0.5),
            ],
            attack: 0.005,
            decay: 0.6,
            sustain: 0.05,
            release: 0.4,
            level: 0.5,
        }
    }

    /// Single sine. The default source for sustained notes.
    pub fn sine_keys() -> Self {
        Self {
            waveform: Waveform::Sine,
            partials: vec![Partial::new(1.0, 1.0)],
            attack: 0.01,
            decay: 0.3,
            sustain: 0.7,
            release: 0.12,
            level: 0.5,
        }
    }
}

/// A [`SoundGenerator`] that follows a [`VoiceRecipe`].
pub struct SyntheticInstrument {
    name: String,
    ctx: Arc<AudioContext>,
    recipe: VoiceRecipe,
}

impl SyntheticInstrument {
    pub fn new(name: impl Into<String>, ctx: Arc<AudioContext>, recipe: VoiceRecipe) -> Self {
        Self {
            name: name.into(),
            ctx,
            recipe,
        }
    }

    pub fn recipe(&self) -> &VoiceRecipe {
        &self.recipe
    }

    fn play_partial(
        &self,
        partial: &Partial,
        hz: f64,
        peak: f32,
        start: f64,
        duration: f64,
        options: &PlayOptions,
    ) -> Result<VoiceHandle> {
        let r = &self.recipe;
        let peak = (peak * partial.level).max(RELEASE_FLOOR);
        let held = (peak * r.sustain).max(RELEASE_FLOOR);
        let attack_end = start + r.attack;
        let decay_end = attack_end + r.decay * partial.decay_scale;
        let release_start = (start + duration).max(attack_end);
        let end = release_start + r.release;

        let gain = self.ctx.create_gain(0.0)?;
        gain.set_value_at_time(0.0, start)?;
        gain.linear_ramp_to_value_at_time(peak, attack_end)?;
        gain.exponential_ramp_to_value_at_time(held, decay_end.min(release_start).max(attack_end))?;
        gain.set_value_at_time(gain.value_at(release_start), release_start)?;
        gain.exponential_ramp_to_value_at_time(RELEASE_FLOOR, end)?;

        let hz = hz * cents_to_ratio(partial.detune_cents as f64);
        let bus = options
            .destination
            .clone()
            .unwrap_or_else(|| self.ctx.destination());
        let source = self
            .ctx
            .create_source(self.recipe.waveform.unit(hz as f32), &bus, Some(&gain), start)?;
        source.stop(end)?;
        Ok(VoiceHandle::new(gain, source))
    }
}

impl SoundGenerator for SyntheticInstrument {
    fn name(&self) -> &str {
        &self.name
    }

    fn play(
        &self,
        pitch: Pitch,
        velocity: f32,
        duration: f64,
        options: &PlayOptions,
    ) -> Result<NoteHandle> {
        if self.recipe.partials.is_empty() {
            return Err(Error::Generator(format!("{} has no partials", self.name)));
        }
        let now = self.ctx.current_time();
        let start = options.start_time.map_or(now, |t| t.max(now));
        let duration = sanitize_seconds(duration, 0.0);
        let peak = sanitize_velocity(velocity) * self.recipe.level;
        let base_hz = pitch.frequency() * cents_to_ratio(options.detune_cents as f64);

        let mut handle = NoteHandle::new();
        for partial in &self.recipe.partials {
            let hz = base_hz * partial.ratio as f64;
            match self.play_partial(partial, hz, peak, start, duration, options) {
                Ok(voice) => handle.push(voice),
                Err(e) => {
                    // Don't leave half a note ringing
                    for source in handle.voices().iter().filter_map(|v| v.source.as_ref()) {
                        let _ = source.stop(now);
                    }
                    return Err(e);
                }
            }
        }
        Ok(handle)
    }
}

impl std::fmt::Debug for SyntheticInstrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticInstrument")
            .field("name", &self.name)
            .field("recipe", &self.recipe)
            .finish()
    }
}

#[inline]
fn cents_to_ratio(cents: f64) -> f64 {
    2f64.powf(cents / 1200.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ctx() -> Arc<AudioContext> {
        Arc::new(AudioContext::new(1000.0).unwrap())
    }

    #[test]
    fn test_one_voice_per_partial() {
        let ctx = ctx();
        let bowl = SyntheticInstrument::new("tibetan-bowl", Arc::clone(&ctx), VoiceRecipe::tibetan_bowl());
        let handle = bowl
            .play(Pitch::MIDDLE_C, 0.8, 2.0, &PlayOptions::default())
            .unwrap();
        assert_eq!(handle.len(), 5);
        assert_eq!(ctx.active_sources(), 5);
    }

    #[test]
    fn test_envelope_shape() {
        let ctx = ctx();
        let keys = SyntheticInstrument::new("sine-keys", Arc::clone(&ctx), VoiceRecipe::sine_keys());
        let handle = keys
            .play(Pitch::CONCERT_A, 1.0, 1.0, &PlayOptions::default())
            .unwrap();
        let voice = &handle.voices()[0];
        let gain = voice.gain.as_ref().unwrap();

        assert_relative_eq!(gain.value_at(0.0), 0.0);
        assert_relative_eq!(gain.value_at(0.01), 0.5, epsilon = 1e-6);
        assert_relative_eq!(gain.value_at(0.31), 0.35, epsilon = 1e-5);
        assert_relative_eq!(gain.value_at(1.0), 0.35, epsilon = 1e-5);
        assert_relative_eq!(gain.value_at(1.12), RELEASE_FLOOR, epsilon = 1e-6);
        assert_relative_eq!(
            voice.source.as_ref().unwrap().stop_time().unwrap(),
            1.12,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_source_finishes_after_release() {
        let ctx = ctx();
        let pluck = SyntheticInstrument::new("glass-pluck", Arc::clone(&ctx), VoiceRecipe::glass_pluck());
        let handle = pluck
            .play(Pitch::MIDDLE_C, 0.8, 0.2, &PlayOptions::default())
            .unwrap();
        ctx.render(300);
        assert!(!handle.is_finished());
        ctx.render(400);
        assert!(handle.is_finished());
        assert_eq!(ctx.active_sources(), 0);
    }

    #[test]
    fn test_zero_velocity_still_schedules() {
        let ctx = ctx();
        let keys = SyntheticInstrument::new("sine-keys", Arc::clone(&ctx), VoiceRecipe::sine_keys());
        assert!(keys
            .play(Pitch::MIDDLE_C, 0.0, 1.0, &PlayOptions::default())
            .is_ok());
    }

    #[test]
    fn test_plays_into_destination_bus() {
        let ctx = ctx();
        let bus = ctx.create_bus().unwrap();
        bus.gain().set_value_at_time(0.0, 0.0).unwrap();
        let keys = SyntheticInstrument::new("sine-keys", Arc::clone(&ctx), VoiceRecipe::sine_keys());
        keys.play(Pitch::CONCERT_A, 1.0, 1.0, &PlayOptions::new().destination(bus))
            .unwrap();
        // Muted bus renders silence
        assert!(ctx.render(100).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_closed_context_fails() {
        let ctx = ctx();
        let keys = SyntheticInstrument::new("sine-keys", Arc::clone(&ctx), VoiceRecipe::sine_keys());
        ctx.close();
        assert!(matches!(
            keys.play(Pitch::MIDDLE_C, 0.5, 1.0, &PlayOptions::default()),
            Err(Error::Core(mallet_core::Error::ContextClosed))
        ));
    }

    #[test]
    fn test_cents_to_ratio() {
        assert_relative_eq!(cents_to_ratio(1200.0), 2.0);
        assert_relative_eq!(cents_to_ratio(0.0), 1.0);
    }
}
