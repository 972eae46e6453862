//! MalletEngine that coordinates the audio context, note tracker,
//! instrument registry and input devices.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use mallet_core::{AudioContext, Clock};
use mallet_midi::{Device, DeviceAction, DeviceState, Pitch, PitchInput, PitchTranslator, RawDeviceMessage};
use mallet_synth::{
    instruments, Catalog, InstrumentInfo, InstrumentMetadata, InstrumentRegistry, NoteHandle,
    NoteId, NoteTracker, PlayOptions, SoundGenerator, TrackerTelemetry,
};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{EngineConfig, MalletEngineBuilder, Result};

/// Input devices plus the sustained note each held key started.
#[derive(Default)]
struct DeviceTable {
    devices: Vec<Device>,
    held: HashMap<(String, Pitch), NoteId>,
}

impl DeviceTable {
    fn position(&self, name: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.name() == name)
    }

    fn take_held(&mut self, device: &str) -> Vec<NoteId> {
        let keys: Vec<(String, Pitch)> = self
            .held
            .keys()
            .filter(|(name, _)| name == device)
            .cloned()
            .collect();
        keys.iter().filter_map(|key| self.held.remove(key)).collect()
    }
}

/// Result of one [`MalletEngine::pump`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Queued device messages handled.
    pub messages: usize,
    /// Registry entries removed by due expiries.
    pub expired: usize,
}

/// Diagnostics snapshot of the whole engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineTelemetry {
    pub audio_time: f64,
    pub timer_time: f64,
    pub sustained: TrackerTelemetry,
    pub hits: usize,
    pub pending_expiries: usize,
    pub sources: usize,
    pub devices: Vec<DeviceState>,
}

/// Playable instrument engine.
///
/// Sustained notes (`note_on`/`note_off`) go through the [`NoteTracker`] and
/// play on the default instrument. One-shot hits (`play`) go through the
/// [`InstrumentRegistry`]. Devices feed both: keyboards start and release
/// sustained notes, pad controllers trigger hits.
///
/// Audio is pulled with [`render`](Self::render). Registry expiries and
/// queued device messages run on [`pump`](Self::pump), which the host calls
/// regularly from its control loop.
///
/// # Example
///
/// ```ignore
/// use mallet::prelude::*;
///
/// let engine = MalletEngine::builder().build()?;
///
/// let id = engine.note_on("C#5", 0.8).unwrap();
/// engine.play("tibetan-bowl", 60, 0.8, 2.0);
/// let block = engine.render(512);
/// engine.note_off(id.as_str());
///
/// engine.add_device(Device::keyboard("Keys"));
/// engine.handle_midi("Keys", &[0x90, 64, 100]);
/// ```
pub struct MalletEngine {
    config: EngineConfig,
    ctx: Arc<AudioContext>,
    timer: Arc<dyn Clock>,
    translator: Arc<PitchTranslator>,
    tracker: Mutex<NoteTracker>,
    registry: Mutex<InstrumentRegistry>,
    devices: Mutex<DeviceTable>,
    midi_tx: Sender<RawDeviceMessage>,
    midi_rx: Receiver<RawDeviceMessage>,
}

impl MalletEngine {
    /// Create a new engine builder
    pub fn builder() -> MalletEngineBuilder {
        MalletEngineBuilder::default()
    }

    pub(crate) fn from_parts(config: EngineConfig, timer: Arc<dyn Clock>) -> Result<Self> {
        let ctx = Arc::new(AudioContext::new(config.sample_rate)?);
        let translator = Arc::new(PitchTranslator::new());
        let tracker = NoteTracker::with_config(Arc::clone(&translator), config.tracker_config())
            .with_context(Arc::clone(&ctx));

        let mut registry =
            InstrumentRegistry::with_config(Arc::clone(&ctx), Arc::clone(&timer), config.registry_config());
        if config.builtin_instruments {
            instruments::register_builtin_instruments(&mut registry);
        }
        if !registry.contains(&config.default_instrument) {
            warn!(
                instrument = %config.default_instrument,
                "Default instrument not registered yet, note_on will fail until it is"
            );
        }

        let (midi_tx, midi_rx) = crossbeam_channel::unbounded();
        info!(
            sample_rate = config.sample_rate,
            instruments = registry.len(),
            "Engine ready"
        );

        Ok(Self {
            config,
            ctx,
            timer,
            translator,
            tracker: Mutex::new(tracker),
            registry: Mutex::new(registry),
            devices: Mutex::new(DeviceTable::default()),
            midi_tx,
            midi_rx,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.ctx.sample_rate()
    }

    pub fn context(&self) -> &Arc<AudioContext> {
        &self.ctx
    }

    pub fn timer_clock(&self) -> &Arc<dyn Clock> {
        &self.timer
    }

    pub fn translator(&self) -> &Arc<PitchTranslator> {
        &self.translator
    }

    /// Lock the note tracker. Don't hold the guard across other engine calls.
    pub fn tracker(&self) -> MutexGuard<'_, NoteTracker> {
        self.tracker.lock()
    }

    /// Lock the instrument registry. Don't hold the guard across other engine
    /// calls.
    pub fn registry(&self) -> MutexGuard<'_, InstrumentRegistry> {
        self.registry.lock()
    }

    // --- Sustained notes ---

    /// Start a sustained note on the default instrument.
    pub fn note_on<'a>(&self, pitch: impl Into<PitchInput<'a>>, velocity: f32) -> Option<NoteId> {
        let instrument = self.config.default_instrument.clone();
        self.note_on_with(&instrument, pitch, velocity)
    }

    /// Start a sustained note on `instrument`.
    pub fn note_on_with<'a>(
        &self,
        instrument: &str,
        pitch: impl Into<PitchInput<'a>>,
        velocity: f32,
    ) -> Option<NoteId> {
        let generator = self.registry.lock().get(instrument);
        if generator.is_none() {
            warn!(instrument, "No such instrument for sustained note");
        }
        self.tracker
            .lock()
            .start(pitch, generator.as_deref(), None, velocity)
    }

    /// Release a sustained note. False for unknown or malformed identities.
    pub fn note_off(&self, id: &str) -> bool {
        self.tracker.lock().stop(id)
    }

    /// Release every sustained note and stop every hit. Returns how many were
    /// stopped in total.
    pub fn all_notes_off(&self) -> usize {
        self.devices.lock().held.clear();
        let sustained = self.tracker.lock().stop_all();
        let hits = self.registry.lock().stop_all_notes(None);
        debug!(sustained, hits, "All notes off");
        sustained + hits
    }

    // --- Hits ---

    /// One-shot hit on a registered instrument.
    pub fn play<'a>(
        &self,
        instrument: &str,
        pitch: impl Into<PitchInput<'a>>,
        velocity: f32,
        duration: f64,
    ) -> Option<NoteHandle> {
        self.play_with(instrument, pitch, velocity, duration, &PlayOptions::default())
    }

    pub fn play_with<'a>(
        &self,
        instrument: &str,
        pitch: impl Into<PitchInput<'a>>,
        velocity: f32,
        duration: f64,
        options: &PlayOptions,
    ) -> Option<NoteHandle> {
        let pitch = self.translator.name_to_pitch(pitch);
        self.registry
            .lock()
            .play_note(instrument, pitch, velocity, duration, options)
    }

    /// Stop hits on one instrument, or all of them.
    pub fn stop_hits(&self, instrument: Option<&str>) -> usize {
        self.registry.lock().stop_all_notes(instrument)
    }

    pub fn register_instrument<F>(&self, id: impl Into<String>, factory: F, metadata: InstrumentMetadata)
    where
        F: FnOnce(&Arc<AudioContext>) -> Arc<dyn SoundGenerator>,
    {
        self.registry.lock().register(id, factory, metadata);
    }

    pub fn instruments(&self) -> Vec<InstrumentInfo> {
        self.registry.lock().list()
    }

    pub fn catalog(&self) -> Catalog {
        self.registry.lock().export_catalog()
    }

    // --- Devices ---

    /// Add a device. A device with the same name is disconnected and
    /// replaced.
    pub fn add_device(&self, device: impl Into<Device>) {
        let device = device.into();
        let name = device.name().to_string();
        let existing = self.devices.lock().position(&name);
        if existing.is_some() {
            self.remove_device(&name);
        }
        info!(device = %name, "Device added");
        self.devices.lock().devices.push(device);
    }

    /// Disconnect and drop a device, releasing whatever it was holding.
    pub fn remove_device(&self, name: &str) -> bool {
        let removed = {
            let mut table = self.devices.lock();
            table.position(name).map(|i| table.devices.remove(i))
        };
        let Some(mut device) = removed else {
            debug!(device = name, "No such device to remove");
            return false;
        };
        let actions = device.disconnect();
        self.apply_actions(name, actions);
        for id in self.devices.lock().take_held(name) {
            self.note_off(id.as_str());
        }
        info!(device = name, "Device removed");
        true
    }

    pub fn devices(&self) -> Vec<DeviceState> {
        self.devices.lock().devices.iter().map(Device::state).collect()
    }

    /// Feed one raw message from `device`. Returns how many actions it
    /// produced.
    pub fn handle_midi(&self, device: &str, bytes: &[u8]) -> usize {
        let actions = {
            let mut table = self.devices.lock();
            match table.position(device) {
                Some(i) => table.devices[i].handle_message(bytes),
                None => {
                    debug!(device, "Message from unknown device ignored");
                    return 0;
                }
            }
        };
        let count = actions.len();
        self.apply_actions(device, actions);
        count
    }

    /// Sender for raw device messages. Messages are handled on the next
    /// [`pump`](Self::pump).
    pub fn midi_sender(&self) -> Sender<RawDeviceMessage> {
        self.midi_tx.clone()
    }

    /// Hardware input connector feeding [`midi_sender`](Self::midi_sender).
    #[cfg(feature = "midi-io")]
    pub fn midi_input(&self) -> mallet_midi::MidiInputConnector {
        mallet_midi::MidiInputConnector::new(self.midi_sender())
    }

    fn apply_actions(&self, device: &str, actions: Vec<DeviceAction>) {
        for action in actions {
            match action {
                DeviceAction::NoteStart { pitch, velocity } => {
                    // A repeated note-on without note-off retriggers
                    let previous = self.devices.lock().held.remove(&(device.to_string(), pitch));
                    if let Some(id) = previous {
                        self.note_off(id.as_str());
                    }
                    if let Some(id) = self.note_on(pitch, velocity) {
                        self.devices.lock().held.insert((device.to_string(), pitch), id);
                    }
                }
                DeviceAction::NoteStop { pitch } => {
                    let held = self.devices.lock().held.remove(&(device.to_string(), pitch));
                    match held {
                        Some(id) => {
                            self.note_off(id.as_str());
                        }
                        None => debug!(device, pitch = pitch.get(), "Note off without note on"),
                    }
                }
                DeviceAction::Trigger {
                    instrument,
                    pitch,
                    velocity,
                } => {
                    let duration = self.config.default_duration;
                    self.registry
                        .lock()
                        .play_note(&instrument, pitch, velocity, duration, &PlayOptions::default());
                }
                DeviceAction::AllNotesOff => {
                    let ids = self.devices.lock().take_held(device);
                    let mut tracker = self.tracker.lock();
                    for id in &ids {
                        tracker.stop(id.as_str());
                    }
                    debug!(device, released = ids.len(), "Device notes off");
                }
            }
        }
    }

    // --- Clock-driven work ---

    /// Handle queued device messages and run due registry expiries.
    pub fn pump(&self) -> PumpStats {
        let mut stats = PumpStats::default();
        for message in self.midi_rx.try_iter() {
            self.handle_midi(&message.device, &message.bytes);
            stats.messages += 1;
        }
        stats.expired = self.registry.lock().poll_expired();
        stats
    }

    /// Render `frames` mono samples and advance the audio clock.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        self.ctx.render(frames)
    }

    pub fn telemetry(&self) -> EngineTelemetry {
        let sustained = self.tracker.lock().telemetry();
        let (hits, pending_expiries) = {
            let registry = self.registry.lock();
            (registry.active_count(), registry.pending_expiries())
        };
        EngineTelemetry {
            audio_time: self.ctx.current_time(),
            timer_time: self.timer.now(),
            sustained,
            hits,
            pending_expiries,
            sources: self.ctx.active_sources(),
            devices: self.devices(),
        }
    }
}

impl std::fmt::Debug for MalletEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MalletEngine")
            .field("context", &self.ctx)
            .field("tracker", &*self.tracker.lock())
            .field("registry", &*self.registry.lock())
            .finish()
    }
}
