//! Hardware MIDI input.
//!
//! Each connected port forwards its raw bytes, tagged with the port name,
//! into a `crossbeam-channel`. Decoding happens on the receiving side.

use std::collections::HashMap;

use crossbeam_channel::Sender;
use midir::{MidiInput, MidiInputConnection};
use tracing::{debug, info};

use crate::device::RawDeviceMessage;
use crate::error::{Error, Result};

const CLIENT_NAME: &str = "mallet-input";

/// An available hardware input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiInputDevice {
    pub index: usize,
    pub name: String,
}

/// Opens hardware input ports and forwards their messages.
pub struct MidiInputConnector {
    sender: Sender<RawDeviceMessage>,
    connections: HashMap<String, MidiInputConnection<()>>,
}

impl MidiInputConnector {
    pub fn new(sender: Sender<RawDeviceMessage>) -> Self {
        Self {
            sender,
            connections: HashMap::new(),
        }
    }

    pub fn list_devices() -> Vec<MidiInputDevice> {
        let mut devices = Vec::new();
        if let Ok(midi_input) = MidiInput::new(CLIENT_NAME) {
            for (index, port) in midi_input.ports().iter().enumerate() {
                let name = midi_input
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {index}"));
                devices.push(MidiInputDevice { index, name });
            }
        }
        devices
    }

    /// Connect to the port called `name`. Reconnecting replaces the old
    /// connection.
    pub fn connect(&mut self, name: &str) -> Result<()> {
        let midi_input =
            MidiInput::new(CLIENT_NAME).map_err(|e| Error::Connection(e.to_string()))?;
        let port = midi_input
            .ports()
            .into_iter()
            .find(|p| midi_input.port_name(p).is_ok_and(|n| n == name))
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))?;

        let sender = self.sender.clone();
        let device = name.to_string();
        let connection = midi_input
            .connect(
                &port,
                CLIENT_NAME,
                move |_timestamp, message, _| {
                    if sender
                        .try_send(RawDeviceMessage::new(device.as_str(), message))
                        .is_err()
                    {
                        debug!(device = %device, "Input channel full or closed, dropping message");
                    }
                },
                (),
            )
            .map_err(|e| Error::Connection(e.to_string()))?;

        self.connections.insert(name.to_string(), connection);
        info!(device = %name, "MIDI input connected");
        Ok(())
    }

    /// Returns false if the port was not connected.
    pub fn disconnect(&mut self, name: &str) -> bool {
        match self.connections.remove(name) {
            Some(connection) => {
                connection.close();
                info!(device = %name, "MIDI input disconnected");
                true
            }
            None => false,
        }
    }

    pub fn connected(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }
}

impl Drop for MidiInputConnector {
    fn drop(&mut self) {
        for (_, connection) in self.connections.drain() {
            connection.close();
        }
    }
}
