//! Channel-voice MIDI events decoded with `midi-msg`.

use midi_msg::{Channel, ChannelVoiceMsg, ControlChange, MidiMsg};

use crate::error::{Error, Result};

/// One decoded channel-voice message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    pub channel: Channel,
    pub msg: ChannelVoiceMsg,
}

impl MidiEvent {
    #[inline]
    pub fn new(channel: Channel, msg: ChannelVoiceMsg) -> Self {
        Self { channel, msg }
    }

    #[inline]
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::NoteOn { note, velocity },
        }
    }

    #[inline]
    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::NoteOff { note, velocity },
        }
    }

    #[inline]
    pub fn control_change(channel: u8, control: u8, value: u8) -> Self {
        Self {
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::ControlChange {
                control: ControlChange::CC { control, value },
            },
        }
    }

    #[inline]
    pub fn channel_num(&self) -> u8 {
        self.channel as u8
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self.msg, ChannelVoiceMsg::NoteOn { velocity, .. } if velocity > 0)
    }

    /// True for NoteOff and for NoteOn with velocity 0.
    #[inline]
    pub fn is_note_off(&self) -> bool {
        matches!(
            self.msg,
            ChannelVoiceMsg::NoteOff { .. } | ChannelVoiceMsg::NoteOn { velocity: 0, .. }
        )
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self.msg {
            ChannelVoiceMsg::NoteOn { note, .. }
            | ChannelVoiceMsg::NoteOff { note, .. }
            | ChannelVoiceMsg::PolyPressure { note, .. } => Some(note),
            _ => None,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Option<u8> {
        match self.msg {
            ChannelVoiceMsg::NoteOn { velocity, .. }
            | ChannelVoiceMsg::NoteOff { velocity, .. } => Some(velocity),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        MidiMsg::ChannelVoice {
            channel: self.channel,
            msg: self.msg,
        }
        .to_midi()
    }

    /// Decode raw bytes. Anything other than a channel-voice message is an
    /// [`Error::Parse`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (msg, _len) =
            MidiMsg::from_midi(bytes).map_err(|e| Error::Parse(format!("{e:?}")))?;
        match msg {
            MidiMsg::ChannelVoice { channel, msg } => Ok(Self { channel, msg }),
            other => Err(Error::Parse(format!(
                "expected a channel-voice message, got {other:?}"
            ))),
        }
    }
}
