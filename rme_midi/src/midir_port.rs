//! A [`crate::MidiPort`] backed by `midir`, resolving a port by name
//! (case-insensitive substring) or numeric index, and delivering inbound
//! SysEx frames over an `mpsc` channel.

use std::sync::mpsc::{self, Receiver};

use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

use rme_core::{ErrorKind, Result, RmeError};

use crate::port::MidiPort;

/// List the names of all available MIDI output ports, in port order.
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new("rme-bridge-probe")
        .map_err(|e| RmeError::new(ErrorKind::Resource, "list_output_ports", e.to_string()))?;
    midi_out
        .ports()
        .iter()
        .map(|port| {
            midi_out
                .port_name(port)
                .map_err(|e| RmeError::new(ErrorKind::Resource, "list_output_ports", e.to_string()))
        })
        .collect()
}

fn resolve_port<T>(
    client: &impl PortLister<T>,
    ports: &[T],
    name_or_index: &str,
) -> Result<usize> {
    if let Ok(index) = name_or_index.parse::<usize>() {
        if index < ports.len() {
            return Ok(index);
        }
        return Err(RmeError::new(
            ErrorKind::Config,
            "resolve_port",
            format!("port index {index} out of range (0..{})", ports.len()),
        ));
    }
    let needle = name_or_index.to_lowercase();
    ports
        .iter()
        .position(|port| {
            client
                .name_of(port)
                .map(|name| name.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
        .ok_or_else(|| {
            RmeError::new(
                ErrorKind::Config,
                "resolve_port",
                format!("no MIDI port matches '{name_or_index}'"),
            )
        })
}

trait PortLister<T> {
    fn name_of(&self, port: &T) -> Result<String>;
}

impl PortLister<midir::MidiOutputPort> for MidiOutput {
    fn name_of(&self, port: &midir::MidiOutputPort) -> Result<String> {
        self.port_name(port)
            .map_err(|e| RmeError::new(ErrorKind::Resource, "PortLister::name_of", e.to_string()))
    }
}

impl PortLister<midir::MidiInputPort> for MidiInput {
    fn name_of(&self, port: &midir::MidiInputPort) -> Result<String> {
        self.port_name(port)
            .map_err(|e| RmeError::new(ErrorKind::Resource, "PortLister::name_of", e.to_string()))
    }
}

/// A live MIDI connection: an output half for sending SysEx, and an input
/// half whose callback forwards every received message to `inbound`.
pub struct MidirMidiPort {
    name: String,
    output: MidiOutputConnection,
    /// Kept alive so its callback keeps firing; never read directly.
    _input: MidiInputConnection<()>,
}

impl MidirMidiPort {
    /// Open both the input and output side of the port matching
    /// `name_or_index` (a case-insensitive substring of the port name, or a
    /// numeric index), mirroring the `-p`/`MIDIPORT` resolution rule.
    pub fn open(name_or_index: &str) -> Result<(Self, Receiver<Vec<u8>>)> {
        let midi_out = MidiOutput::new("rme-bridge-out")
            .map_err(|e| RmeError::new(ErrorKind::Resource, "MidirMidiPort::open", e.to_string()))?;
        let out_ports = midi_out.ports();
        let out_index = resolve_port(&midi_out, &out_ports, name_or_index)?;
        let out_name = midi_out
            .port_name(&out_ports[out_index])
            .map_err(|e| RmeError::new(ErrorKind::Resource, "MidirMidiPort::open", e.to_string()))?;
        let output = midi_out
            .connect(&out_ports[out_index], "rme-bridge-out")
            .map_err(|e| RmeError::new(ErrorKind::Resource, "MidirMidiPort::open", e.to_string()))?;

        let midi_in = MidiInput::new("rme-bridge-in")
            .map_err(|e| RmeError::new(ErrorKind::Resource, "MidirMidiPort::open", e.to_string()))?;
        let in_ports = midi_in.ports();
        let in_index = resolve_port(&midi_in, &in_ports, name_or_index)?;

        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let input = midi_in
            .connect(
                &in_ports[in_index],
                "rme-bridge-in",
                move |_timestamp, message, _| {
                    let _ = tx.send(message.to_vec());
                },
                (),
            )
            .map_err(|e| RmeError::new(ErrorKind::Resource, "MidirMidiPort::open", e.to_string()))?;

        Ok((
            Self {
                name: out_name,
                output,
                _input: input,
            },
            rx,
        ))
    }
}

impl MidiPort for MidirMidiPort {
    fn send_sysex(&mut self, frame: &[u8]) -> Result<()> {
        self.output
            .send(frame)
            .map_err(|e| RmeError::new(ErrorKind::Io, "MidirMidiPort::send_sysex", e.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
