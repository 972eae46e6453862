//! Instrument dispatch registry.
//!
//! Maps instrument ids to generators and plays short, explicitly timed
//! hits on them. Each hit is tracked under `(instrument, pitch)` and expires
//! on the timer clock `duration + expiry buffer` seconds later. An expiry
//! only removes the hit it was scheduled for, so a newer hit on the same key
//! survives an older timer.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use mallet_core::{AudioContext, Clock, DeferredQueue};
use mallet_midi::Pitch;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::generator::{
    sanitize_seconds, sanitize_velocity, NoteHandle, PlayOptions, SoundGenerator,
    DEFAULT_VELOCITY,
};
use crate::voice_index::{ActiveNote, ActiveVoiceIndex, ReleasePolicy, RELEASE_FLOOR};

/// Display metadata for a registered instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentMetadata {
    pub name: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub icon: String,
    pub description: String,
}

impl InstrumentMetadata {
    /// Metadata of kind `"synthetic"` with no icon or description.
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            kind: "synthetic".to_string(),
            icon: String::new(),
            description: String::new(),
        }
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// One entry of [`InstrumentRegistry::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub id: String,
    #[serde(flatten)]
    pub metadata: InstrumentMetadata,
}

/// Read-only snapshot of everything registered, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub instruments: Vec<InstrumentInfo>,
    pub count: usize,
    /// Distinct categories, sorted.
    pub categories: Vec<String>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a InstrumentInfo> {
        self.instruments
            .iter()
            .filter(move |info| info.metadata.category == category)
    }
}

/// Registry timings and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub default_velocity: f32,
    pub default_duration: f64,
    /// Added to a hit's duration before it expires from the index.
    pub expiry_buffer_seconds: f64,
    /// Exponential fade used by [`InstrumentRegistry::stop_all_notes`].
    pub stop_release_seconds: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_velocity: DEFAULT_VELOCITY,
            default_duration: 2.0,
            expiry_buffer_seconds: 5.0,
            stop_release_seconds: ReleasePolicy::EXPONENTIAL_RELEASE,
        }
    }
}

/// Index key for a hit.
pub type PlayedKey = (String, Pitch);

/// What the registry remembers about a hit.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedNote {
    pub instrument: String,
    pub pitch: Pitch,
    generation: u64,
}

/// Timer entry for one hit. It carries the hit's generation because a key
/// can be retriggered before an older timer fires; a plain remove-if-present
/// would then evict the newer hit while it is still sounding.
#[derive(Debug)]
struct Expiry {
    key: PlayedKey,
    generation: u64,
}

struct Registration {
    id: String,
    metadata: InstrumentMetadata,
    generator: Arc<dyn SoundGenerator>,
}

/// Catalog of generators plus the index of hits currently sounding.
pub struct InstrumentRegistry {
    ctx: Arc<AudioContext>,
    timer: Arc<dyn Clock>,
    config: RegistryConfig,
    instruments: Vec<Registration>,
    positions: HashMap<String, usize>,
    notes: ActiveVoiceIndex<PlayedKey, PlayedNote>,
    expiries: DeferredQueue<Expiry>,
    generation: u64,
}

impl InstrumentRegistry {
    pub fn new(ctx: Arc<AudioContext>, timer: Arc<dyn Clock>) -> Self {
        Self::with_config(ctx, timer, RegistryConfig::default())
    }

    pub fn with_config(ctx: Arc<AudioContext>, timer: Arc<dyn Clock>, config: RegistryConfig) -> Self {
        let policy = ReleasePolicy::Exponential {
            release: config.stop_release_seconds,
            floor: RELEASE_FLOOR,
        };
        Self {
            ctx,
            timer,
            config,
            instruments: Vec::new(),
            positions: HashMap::new(),
            notes: ActiveVoiceIndex::new(policy),
            expiries: DeferredQueue::new(),
            generation: 0,
        }
    }

    pub fn context(&self) -> &Arc<AudioContext> {
        &self.ctx
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Build a generator on this registry's context and register it.
    /// Registering an existing id replaces it in place.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F, metadata: InstrumentMetadata)
    where
        F: FnOnce(&Arc<AudioContext>) -> Arc<dyn SoundGenerator>,
    {
        let id = id.into();
        let generator = factory(&self.ctx);
        match self.positions.get(&id) {
            Some(&index) => {
                let slot = &mut self.instruments[index];
                slot.generator = generator;
                slot.metadata = metadata;
                info!(id = %id, "Instrument replaced");
            }
            None => {
                self.positions.insert(id.clone(), self.instruments.len());
                info!(id = %id, name = %metadata.name, "Instrument registered");
                self.instruments.push(Registration {
                    id,
                    metadata,
                    generator,
                });
            }
        }
    }

    /// Every instrument, in registration order.
    pub fn list(&self) -> Vec<InstrumentInfo> {
        self.instruments
            .iter()
            .map(|r| InstrumentInfo {
                id: r.id.clone(),
                metadata: r.metadata.clone(),
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn SoundGenerator>> {
        self.positions
            .get(id)
            .map(|&index| Arc::clone(&self.instruments[index].generator))
    }

    pub fn metadata(&self, id: &str) -> Option<&InstrumentMetadata> {
        self.positions
            .get(id)
            .map(|&index| &self.instruments[index].metadata)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Play a hit. Returns `None`, after logging why, for an unknown
    /// instrument or a failing generator.
    pub fn play_note(
        &mut self,
        id: &str,
        pitch: Pitch,
        velocity: f32,
        duration: f64,
        options: &PlayOptions,
    ) -> Option<NoteHandle> {
        match self.try_play_note(id, pitch, velocity, duration, options) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(instrument = id, pitch = pitch.get(), error = %e, "Note not played");
                None
            }
        }
    }

    /// [`play_note`](Self::play_note) with the configured velocity and
    /// duration.
    pub fn play_note_default(&mut self, id: &str, pitch: Pitch) -> Option<NoteHandle> {
        let (velocity, duration) = (self.config.default_velocity, self.config.default_duration);
        self.play_note(id, pitch, velocity, duration, &PlayOptions::default())
    }

    /// [`play_note`](Self::play_note), with the reason for failure.
    pub fn try_play_note(
        &mut self,
        id: &str,
        pitch: Pitch,
        velocity: f32,
        duration: f64,
        options: &PlayOptions,
    ) -> Result<NoteHandle> {
        let generator = self
            .get(id)
            .ok_or_else(|| Error::UnknownInstrument(id.to_string()))?;
        let velocity = sanitize_velocity(velocity);
        let duration = sanitize_seconds(duration, self.config.default_duration);

        let handle = generator.play(pitch, velocity, duration, options)?;
        let started_at = self.ctx.current_time();

        self.generation += 1;
        let key = (id.to_string(), pitch);
        let note = PlayedNote {
            instrument: id.to_string(),
            pitch,
            generation: self.generation,
        };
        if self
            .notes
            .insert(key.clone(), ActiveNote::new(handle.clone(), started_at, note))
            .is_some()
        {
            debug!(instrument = id, pitch = pitch.get(), "Retriggered active key");
        }
        self.expiries.schedule(
            self.timer.now(),
            duration + self.config.expiry_buffer_seconds,
            Expiry {
                key,
                generation: self.generation,
            },
        );
        debug!(instrument = id, pitch = pitch.get(), duration, active = self.notes.len(), "Note played");
        Ok(handle)
    }

    /// Run expiries that are due on the timer clock. Returns how many
    /// entries were removed.
    pub fn poll_expired(&mut self) -> usize {
        let mut removed = 0;
        for expiry in self.expiries.drain_due(self.timer.now()) {
            let current = self
                .notes
                .get(&expiry.key)
                .is_some_and(|n| n.meta.generation == expiry.generation);
            if current {
                self.notes.remove(&expiry.key);
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, active = self.notes.len(), "Expired notes");
        }
        removed
    }

    /// Fade out every hit on `instrument`, or on all instruments when
    /// `None`, and drop them from the index. Returns how many were stopped.
    pub fn stop_all_notes(&mut self, instrument: Option<&str>) -> usize {
        let now = self.ctx.current_time();
        let policy = self.notes.policy();
        let stopped = self
            .notes
            .release_where(policy, now, |(id, _), _| match instrument {
                Some(wanted) => id.as_str() == wanted,
                None => true,
            });
        debug!(instrument, stopped, "Stopped notes");
        stopped
    }

    pub fn export_catalog(&self) -> Catalog {
        let categories: BTreeSet<String> = self
            .instruments
            .iter()
            .map(|r| r.metadata.category.clone())
            .collect();
        Catalog {
            instruments: self.list(),
            count: self.instruments.len(),
            categories: categories.into_iter().collect(),
        }
    }

    pub fn active_count(&self) -> usize {
        self.notes.len()
    }

    pub fn is_playing(&self, id: &str, pitch: Pitch) -> bool {
        self.notes.contains(&(id.to_string(), pitch))
    }

    /// Expiry timers still waiting, including ones that will find their
    /// entry already gone.
    pub fn pending_expiries(&self) -> usize {
        self.expiries.len()
    }
}

impl fmt::Debug for InstrumentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentRegistry")
            .field("instruments", &self.positions.len())
            .field("active", &self.notes.len())
            .field("pending_expiries", &self.expiries.len())
            .finish()
    }
}
