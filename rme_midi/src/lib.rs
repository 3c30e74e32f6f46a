//! # RME MIDI
//!
//! The [`MidiPort`] collaborator contract used to send and receive SysEx
//! frames, and a `midir`-backed implementation that resolves a port by name
//! or index.

pub mod midir_port;
pub mod port;

pub use midir_port::{list_output_ports, MidirMidiPort};
pub use port::MidiPort;
