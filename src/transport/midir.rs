//! `midir`-backed transport
//!
//! Port discovery is a case-insensitive substring match on the port name,
//! which survives the port-numbering suffixes some platforms append.

use super::{Transport, TransportError};
use crate::midi::{format_hex, MidiMessage};
use anyhow::{Context, Result};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use tracing::{debug, info, trace};

const CLIENT_NAME: &str = "gridlink";

/// Output connection to the surface hardware.
pub struct MidirTransport {
    port_name: String,
    conn: Mutex<MidiOutputConnection>,
}

impl MidirTransport {
    /// Open the first output port whose name contains `pattern`.
    pub fn connect(pattern: &str) -> Result<Self> {
        let midi_out = MidiOutput::new(CLIENT_NAME).context("failed to create MIDI output")?;

        let (port, port_name) = find_port(
            midi_out.ports(),
            |p| midi_out.port_name(p).ok(),
            pattern,
        )
        .ok_or_else(|| anyhow::anyhow!("output port matching '{}' not found", pattern))?;

        info!("connecting to output port: {}", port_name);
        let conn = midi_out
            .connect(&port, CLIENT_NAME)
            .map_err(|e| anyhow::anyhow!("failed to connect to '{}': {}", port_name, e))?;

        Ok(Self {
            port_name,
            conn: Mutex::new(conn),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// List the names of all available output ports.
    pub fn list_output_ports() -> Result<Vec<String>> {
        let midi_out = MidiOutput::new(CLIENT_NAME).context("failed to create MIDI output")?;
        Ok(midi_out
            .ports()
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect())
    }

    fn send_message(&self, message: &MidiMessage) -> Result<(), TransportError> {
        let data = message.encode();
        self.conn
            .lock()
            .send(&data)
            .map_err(|e| TransportError::Send(e.to_string()))?;
        trace!("sent: {} | {}", format_hex(&data), message);
        Ok(())
    }
}

impl Transport for MidirTransport {
    fn send_note(&self, channel: u8, note: u8, velocity: u8) -> Result<(), TransportError> {
        self.send_message(&MidiMessage::NoteOn {
            channel,
            note,
            velocity,
        })
    }

    fn send_control_change(&self, channel: u8, cc: u8, value: u8) -> Result<(), TransportError> {
        self.send_message(&MidiMessage::ControlChange { channel, cc, value })
    }

    fn send_sysex(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.send_message(&MidiMessage::SysEx {
            data: payload.to_vec(),
        })
    }
}

/// Open the first input port whose name contains `pattern` and deliver every
/// incoming message to `on_message`. The returned connection must be kept
/// alive for as long as input should flow.
pub fn open_input<F>(pattern: &str, mut on_message: F) -> Result<MidiInputConnection<()>>
where
    F: FnMut(&[u8]) + Send + 'static,
{
    let mut midi_in = MidiInput::new(CLIENT_NAME).context("failed to create MIDI input")?;
    midi_in.ignore(midir::Ignore::None);

    let (port, port_name) = find_port(midi_in.ports(), |p| midi_in.port_name(p).ok(), pattern)
        .ok_or_else(|| anyhow::anyhow!("input port matching '{}' not found", pattern))?;

    info!("connecting to input port: {}", port_name);
    midi_in
        .connect(
            &port,
            CLIENT_NAME,
            move |_timestamp, data, _| on_message(data),
            (),
        )
        .map_err(|e| anyhow::anyhow!("failed to connect to '{}': {}", port_name, e))
}

fn find_port<P>(
    ports: Vec<P>,
    name_of: impl Fn(&P) -> Option<String>,
    pattern: &str,
) -> Option<(P, String)> {
    let pattern = pattern.to_lowercase();
    for port in ports {
        if let Some(name) = name_of(&port) {
            if name.to_lowercase().contains(&pattern) {
                debug!("found port '{}' matching '{}'", name, pattern);
                return Some((port, name));
            }
        }
    }
    None
}
