//! Input devices as tagged variants.
//!
//! Every device turns raw MIDI bytes into [`DeviceAction`]s and reports a
//! serializable [`DeviceState`]. A disconnected device ignores everything.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::event::MidiEvent;
use crate::note::Pitch;
use crate::utils::velocity_to_gain;

const CC_SUSTAIN: u8 = 64;
const CC_ALL_SOUND_OFF: u8 = 120;
const CC_ALL_NOTES_OFF: u8 = 123;

/// Bytes received from a named input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDeviceMessage {
    pub device: String,
    pub bytes: Vec<u8>,
}

impl RawDeviceMessage {
    pub fn new(device: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            device: device.into(),
            bytes: bytes.into(),
        }
    }
}

/// What a device asks the instrument to do.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceAction {
    /// Begin a sustained note. Velocity is normalized to `0.0..=1.0`.
    NoteStart { pitch: Pitch, velocity: f32 },
    /// Release the sustained note this device started on `pitch`.
    NoteStop { pitch: Pitch },
    /// One-shot hit on a named instrument.
    Trigger {
        instrument: String,
        pitch: Pitch,
        velocity: f32,
    },
    AllNotesOff,
}

/// Snapshot of a device for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    pub name: String,
    pub kind: &'static str,
    pub connected: bool,
    /// Pitches currently held down, ascending.
    pub held: Vec<u8>,
    pub sustain: bool,
    pub messages: u64,
    pub last_velocity: Option<u8>,
}

/// Decoded input, with control changes read straight off the status byte so
/// controller numbers arrive unmodified.
enum Decoded {
    Control { channel: u8, control: u8, value: u8 },
    Event(MidiEvent),
}

fn decode(bytes: &[u8]) -> Option<Decoded> {
    match bytes {
        [status, control, value, ..] if status & 0xF0 == 0xB0 => Some(Decoded::Control {
            channel: status & 0x0F,
            control: *control,
            value: *value,
        }),
        _ => match MidiEvent::from_bytes(bytes) {
            Ok(event) => Some(Decoded::Event(event)),
            Err(e) => {
                debug!(error = %e, "Ignoring undecodable device message");
                None
            }
        },
    }
}

/// A plain keyboard: note on/off become sustained notes.
#[derive(Debug, Clone)]
pub struct KeyboardDevice {
    name: String,
    /// Only messages on this channel are handled; `None` accepts all.
    channel: Option<u8>,
    connected: bool,
    held: BTreeSet<u8>,
    sustain: bool,
    messages: u64,
    last_velocity: Option<u8>,
}

impl KeyboardDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel: None,
            connected: true,
            held: BTreeSet::new(),
            sustain: false,
            messages: 0,
            last_velocity: None,
        }
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = Some(channel & 0x0F);
        self
    }

    fn accepts(&self, channel: u8) -> bool {
        self.channel.is_none() || self.channel == Some(channel)
    }

    fn handle_message(&mut self, bytes: &[u8]) -> Vec<DeviceAction> {
        self.messages += 1;
        match decode(bytes) {
            Some(Decoded::Control {
                channel,
                control,
                value,
            }) if self.accepts(channel) => match control {
                CC_ALL_NOTES_OFF | CC_ALL_SOUND_OFF => {
                    self.held.clear();
                    vec![DeviceAction::AllNotesOff]
                }
                CC_SUSTAIN => {
                    self.sustain = value >= 64;
                    Vec::new()
                }
                _ => Vec::new(),
            },
            Some(Decoded::Event(event)) if self.accepts(event.channel_num()) => {
                let (Some(note), Some(velocity)) = (event.note(), event.velocity()) else {
                    return Vec::new();
                };
                let pitch = Pitch::clamped(note as i64);
                if event.is_note_on() {
                    self.held.insert(pitch.get());
                    self.last_velocity = Some(velocity);
                    vec![DeviceAction::NoteStart {
                        pitch,
                        velocity: velocity_to_gain(velocity),
                    }]
                } else if event.is_note_off() {
                    self.held.remove(&pitch.get());
                    vec![DeviceAction::NoteStop { pitch }]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    /// Releases whatever is still held.
    fn disconnect(&mut self) -> Vec<DeviceAction> {
        self.connected = false;
        self.sustain = false;
        std::mem::take(&mut self.held)
            .into_iter()
            .map(|p| DeviceAction::NoteStop {
                pitch: Pitch::clamped(p as i64),
            })
            .collect()
    }

    fn state(&self) -> DeviceState {
        DeviceState {
            name: self.name.clone(),
            kind: "keyboard",
            connected: self.connected,
            held: self.held.iter().copied().collect(),
            sustain: self.sustain,
            messages: self.messages,
            last_velocity: self.last_velocity,
        }
    }
}

/// A grid of pads, each bound to an instrument. Pads fire one-shot hits;
/// releasing a pad does nothing.
#[derive(Debug, Clone)]
pub struct PadControllerDevice {
    name: String,
    pads: HashMap<u8, String>,
    connected: bool,
    messages: u64,
    last_velocity: Option<u8>,
}

impl PadControllerDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pads: HashMap::new(),
            connected: true,
            messages: 0,
            last_velocity: None,
        }
    }

    /// Bind the pad that sends `note` to `instrument`.
    pub fn with_pad(mut self, note: u8, instrument: impl Into<String>) -> Self {
        self.pads.insert(note, instrument.into());
        self
    }

    pub fn instrument_for(&self, note: u8) -> Option<&str> {
        self.pads.get(&note).map(String::as_str)
    }

    fn handle_message(&mut self, bytes: &[u8]) -> Vec<DeviceAction> {
        self.messages += 1;
        let Some(Decoded::Event(event)) = decode(bytes) else {
            return Vec::new();
        };
        if !event.is_note_on() {
            return Vec::new();
        }
        let (Some(note), Some(velocity)) = (event.note(), event.velocity()) else {
            return Vec::new();
        };
        self.last_velocity = Some(velocity);
        match self.pads.get(&note) {
            Some(instrument) => vec![DeviceAction::Trigger {
                instrument: instrument.clone(),
                pitch: Pitch::clamped(note as i64),
                velocity: velocity_to_gain(velocity),
            }],
            None => {
                debug!(device = %self.name, note, "Pad has no instrument bound");
                Vec::new()
            }
        }
    }

    fn disconnect(&mut self) -> Vec<DeviceAction> {
        self.connected = false;
        Vec::new()
    }

    fn state(&self) -> DeviceState {
        DeviceState {
            name: self.name.clone(),
            kind: "pad-controller",
            connected: self.connected,
            held: Vec::new(),
            sustain: false,
            messages: self.messages,
            last_velocity: self.last_velocity,
        }
    }
}

/// A named input device.
#[derive(Debug, Clone)]
pub enum Device {
    Keyboard(KeyboardDevice),
    PadController(PadControllerDevice),
}

impl Device {
    pub fn keyboard(name: impl Into<String>) -> Self {
        Device::Keyboard(KeyboardDevice::new(name))
    }

    pub fn pad_controller(name: impl Into<String>) -> Self {
        Device::PadController(PadControllerDevice::new(name))
    }

    pub fn name(&self) -> &str {
        match self {
            Device::Keyboard(d) => &d.name,
            Device::PadController(d) => &d.name,
        }
    }

    pub fn is_connected(&self) -> bool {
        match self {
            Device::Keyboard(d) => d.connected,
            Device::PadController(d) => d.connected,
        }
    }

    /// Decode one message into the actions it implies.
    pub fn handle_message(&mut self, bytes: &[u8]) -> Vec<DeviceAction> {
        if !self.is_connected() {
            debug!(device = %self.name(), "Message on disconnected device ignored");
            return Vec::new();
        }
        match self {
            Device::Keyboard(d) => d.handle_message(bytes),
            Device::PadController(d) => d.handle_message(bytes),
        }
    }

    pub fn state(&self) -> DeviceState {
        match self {
            Device::Keyboard(d) => d.state(),
            Device::PadController(d) => d.state(),
        }
    }

    /// Mark the device disconnected. Returns the releases for anything it
    /// was still holding.
    pub fn disconnect(&mut self) -> Vec<DeviceAction> {
        match self {
            Device::Keyboard(d) => d.disconnect(),
            Device::PadController(d) => d.disconnect(),
        }
    }
}

impl From<KeyboardDevice> for Device {
    fn from(device: KeyboardDevice) -> Self {
        Device::Keyboard(device)
    }
}

impl From<PadControllerDevice> for Device {
    fn from(device: PadControllerDevice) -> Self {
        Device::PadController(device)
    }
}
