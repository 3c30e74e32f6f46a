//! The [`MidiPort`] collaborator contract: serialized, single-writer SysEx
//! transmission with callback-delivered inbound frames.

use rme_core::Result;

/// A MIDI port capable of sending raw SysEx frames. All register writes
/// flow through a single writer (see the concurrency model), so this trait
/// need not be internally synchronized.
pub trait MidiPort: Send {
    /// Send one complete SysEx frame (including the `F0`/`F7` markers).
    fn send_sysex(&mut self, frame: &[u8]) -> Result<()>;

    /// The device-facing name of this port, for logging.
    fn name(&self) -> &str;
}
