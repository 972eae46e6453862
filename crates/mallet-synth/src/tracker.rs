//! Sustained note lifecycle.
//!
//! One entry per key press. A note is started with a very long nominal
//! duration and lives in the index until it is stopped; stopping removes it
//! at once and leaves the fade running on the audio clock.
//!
//! ```text
//! STARTING ──play ok──▶ SUSTAINING ──stop──▶ RELEASING (removed) ──fade──▶ gone
//!     └──play failed──▶ (never stored)
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use mallet_core::{AudioContext, Bus};
use mallet_midi::{Pitch, PitchInput, PitchTranslator};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::generator::{sanitize_seconds, sanitize_velocity, PlayOptions, SoundGenerator};
use crate::voice_index::{ActiveNote, ActiveVoiceIndex, ReleasePolicy, RELEASE_FLOOR};

const SUFFIX_LEN: usize = 6;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identity of a sustained note: `"{pitch name}-{audio ms}-{base36 suffix}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `id` has the shape of a generated identity.
    pub fn is_well_formed(id: &str) -> bool {
        let mut parts = id.rsplitn(3, '-');
        let (Some(suffix), Some(ms), Some(name)) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        !name.is_empty()
            && !ms.is_empty()
            && ms.bytes().all(|b| b.is_ascii_digit())
            && !suffix.is_empty()
            && suffix.bytes().all(|b| BASE36.contains(&b))
    }

    fn generate(name: &str, audio_time: f64, rng: &mut impl Rng) -> Self {
        let ms = (audio_time.max(0.0) * 1000.0).round() as u64;
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        NoteId(format!("{name}-{ms}-{suffix}"))
    }
}

impl Borrow<str> for NoteId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the tracker remembers about a sustained note.
#[derive(Debug, Clone, PartialEq)]
pub struct SustainedNote {
    pub pitch: Pitch,
    /// Name of the generator that is playing it.
    pub source: String,
}

/// Tracker timings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Default fade length for [`NoteTracker::stop`].
    pub release_seconds: f64,
    /// Nominal duration sustained notes are started with.
    pub sustain_seconds: f64,
    /// Delay between the end of the fade and the source stop.
    pub stop_grace_seconds: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            release_seconds: ReleasePolicy::LINEAR_RELEASE,
            sustain_seconds: 1000.0,
            stop_grace_seconds: ReleasePolicy::LINEAR_STOP_GRACE,
        }
    }
}

impl TrackerConfig {
    fn policy(&self) -> ReleasePolicy {
        ReleasePolicy::Linear {
            release: self.release_seconds,
            floor: RELEASE_FLOOR,
            stop_grace: self.stop_grace_seconds,
        }
    }
}

/// Diagnostics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerTelemetry {
    pub count: usize,
    pub ids: Vec<NoteId>,
}

/// Starts and releases sustained notes.
pub struct NoteTracker {
    ctx: Option<Arc<AudioContext>>,
    translator: Arc<PitchTranslator>,
    config: TrackerConfig,
    notes: ActiveVoiceIndex<NoteId, SustainedNote>,
}

impl NoteTracker {
    /// A tracker with no audio context yet. Starts fail until one is
    /// attached.
    pub fn new(translator: Arc<PitchTranslator>) -> Self {
        Self::with_config(translator, TrackerConfig::default())
    }

    pub fn with_config(translator: Arc<PitchTranslator>, config: TrackerConfig) -> Self {
        Self {
            ctx: None,
            translator,
            config,
            notes: ActiveVoiceIndex::new(config.policy()),
        }
    }

    pub fn with_context(mut self, ctx: Arc<AudioContext>) -> Self {
        self.ctx = Some(ctx);
        self
    }

    pub fn attach_context(&mut self, ctx: Arc<AudioContext>) {
        self.ctx = Some(ctx);
    }

    pub fn detach_context(&mut self) -> Option<Arc<AudioContext>> {
        self.ctx.take()
    }

    pub fn context(&self) -> Option<&Arc<AudioContext>> {
        self.ctx.as_ref()
    }

    pub fn translator(&self) -> &Arc<PitchTranslator> {
        &self.translator
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Start a sustained note. Returns `None`, after logging why, when there
    /// is no context or source or the generator fails.
    pub fn start<'a>(
        &mut self,
        pitch: impl Into<PitchInput<'a>>,
        source: Option<&dyn SoundGenerator>,
        destination: Option<&Bus>,
        velocity: f32,
    ) -> Option<NoteId> {
        match self.try_start(pitch, source, destination, velocity) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Note not started");
                None
            }
        }
    }

    /// [`start`](Self::start), with the reason for failure.
    pub fn try_start<'a>(
        &mut self,
        pitch: impl Into<PitchInput<'a>>,
        source: Option<&dyn SoundGenerator>,
        destination: Option<&Bus>,
        velocity: f32,
    ) -> Result<NoteId> {
        let ctx = self.ctx.as_ref().ok_or(Error::MissingContext)?;
        let source = source.ok_or(Error::MissingSource)?;
        let pitch = self.translator.name_to_pitch(pitch);

        let now = ctx.current_time();
        let options = PlayOptions {
            destination: destination.cloned(),
            start_time: Some(now),
            detune_cents: 0.0,
        };
        let handle = source.play(
            pitch,
            sanitize_velocity(velocity),
            self.config.sustain_seconds,
            &options,
        )?;

        let name = pitch.name();
        let mut rng = rand::thread_rng();
        let mut id = NoteId::generate(&name, now, &mut rng);
        while self.notes.contains(&id) {
            id = NoteId::generate(&name, now, &mut rng);
        }

        self.notes.insert(
            id.clone(),
            ActiveNote::new(
                handle,
                now,
                SustainedNote {
                    pitch,
                    source: source.name().to_string(),
                },
            ),
        );
        debug!(id = %id, source = source.name(), active = self.notes.len(), "Note started");
        Ok(id)
    }

    /// Release with the default fade. Returns false for an empty, malformed
    /// or unknown identity.
    pub fn stop(&mut self, id: &str) -> bool {
        self.stop_with_release(id, self.config.release_seconds)
    }

    /// Release with a linear fade of `release_seconds`. Negative or
    /// non-finite values use the default.
    pub fn stop_with_release(&mut self, id: &str, release_seconds: f64) -> bool {
        if id.is_empty() || !NoteId::is_well_formed(id) {
            debug!(id, "Ignoring stop for malformed note id");
            return false;
        }
        let release = sanitize_seconds(release_seconds, self.config.release_seconds);
        let policy = self.notes.policy().with_release(release);
        let released = self.notes.release_with(id, policy, self.now());
        if released {
            debug!(id, active = self.notes.len(), "Note stopped");
        } else {
            debug!(id, "Ignoring stop for inactive note");
        }
        released
    }

    /// Release every active note with the default fade.
    pub fn stop_all(&mut self) -> usize {
        let released = self.notes.release_all(self.now());
        debug!(released, "Stopped all notes");
        released
    }

    pub fn count(&self) -> usize {
        self.notes.len()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.notes.contains(id)
    }

    /// Active identities, sorted.
    pub fn active_ids(&self) -> Vec<NoteId> {
        let mut ids = self.notes.keys();
        ids.sort();
        ids
    }

    pub fn get(&self, id: &str) -> Option<&ActiveNote<SustainedNote>> {
        self.notes.get(id)
    }

    pub fn telemetry(&self) -> TrackerTelemetry {
        TrackerTelemetry {
            count: self.count(),
            ids: self.active_ids(),
        }
    }

    /// Audio-clock time. Without a context releases are scheduled at 0,
    /// which takes effect on the next render.
    fn now(&self) -> f64 {
        self.ctx.as_ref().map_or(0.0, |ctx| ctx.current_time())
    }
}

impl fmt::Debug for NoteTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteTracker")
            .field("context", &self.ctx)
            .field("config", &self.config)
            .field("active", &self.notes.len())
            .finish()
    }
}
