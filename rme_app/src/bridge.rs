//! Wires a [`MidirMidiPort`], a [`UdpTransport`], and a [`ControlDispatcher`]
//! into a running bridge: one thread drains device SysEx and republishes it
//! as OSC, the calling thread drains client OSC and republishes it as SysEx.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use directories::BaseDirs;
use rme_core::{ErrorKind, Result, RmeError};
use rme_midi::{MidiPort, MidirMidiPort};
use rme_mirror::DeviceMirror;
use rme_osc::{AddressUri, OscCodec, Transport, UdpTransport};
use rme_params::ParameterTree;
use rme_sysex::{SysexCodec, SysexMessage};

use crate::cli::Cli;
use crate::device_map;

/// RME's device id for the simulated bridge target. A real deployment would
/// read this from the device's identity response; no such handshake exists
/// in this bridge, so it is fixed.
const DEVICE_ID: u8 = 0x10;
const DEVICE_NAME: &str = "Fireface";

pub fn run(cli: Cli) -> Result<()> {
    let midi_port_name = cli.resolve_midi_port()?;
    let (mut midi_out, midi_in) = MidirMidiPort::open(&midi_port_name)?;
    log::info!("opened MIDI port '{}'", midi_out.name());

    let recv_uri = AddressUri::from_str(&cli.recv_addr)?;
    let send_uri = AddressUri::from_str(cli.send_addr())?;
    let transport = Arc::new(Mutex::new(UdpTransport::bind(recv_uri.port, send_uri)?));

    let tree = device_map::parameter_tree();
    let mirror = Arc::new(Mutex::new(DeviceMirror::new(tree.clone())));
    let mut dispatcher = ControlDispatcherHandle::new(tree, cli.midi_port.clone());

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .map_err(|e| RmeError::new(ErrorKind::Resource, "bridge::run", e.to_string()))?;
    }

    let reader_handle = {
        let mirror = mirror.clone();
        let transport = transport.clone();
        let no_level_meters = cli.no_level_meters;
        let running = running.clone();
        thread::spawn(move || midi_reader_loop(midi_in, mirror, transport, no_level_meters, running))
    };

    dispatcher.send_refresh(&mut midi_out, &mirror)?;
    osc_reader_loop(&mut dispatcher, &mut midi_out, &mirror, &transport, &running);

    if reader_handle.join().is_err() {
        log::error!("MIDI reader thread panicked");
    }
    Ok(())
}

/// Owns the one dispatcher and the output half of the MIDI port; both are
/// touched exclusively by the OSC-reader thread, so neither needs a mutex.
struct ControlDispatcherHandle {
    inner: rme_control::ControlDispatcher,
}

impl ControlDispatcherHandle {
    fn new(tree: ParameterTree, device_label: Option<String>) -> Self {
        let device = device_map::device_info(device_label.as_deref().unwrap_or(DEVICE_NAME));
        let inner = rme_control::ControlDispatcher::new(tree, SysexCodec::new(DEVICE_ID), device_config_dir(), device);
        Self { inner }
    }

    /// Feeds a synthesized `/refresh` packet through the normal dispatch
    /// path at startup, so newly-connected clients and the operator see
    /// the same refresh burst a live request would trigger.
    fn send_refresh(&mut self, midi: &mut MidirMidiPort, mirror: &Arc<Mutex<DeviceMirror>>) -> Result<()> {
        let wire = OscCodec::new().encode_message("/refresh", vec![])?;
        let mirror = mirror.lock().unwrap();
        self.inner.dispatch(&wire, midi, &mirror);
        Ok(())
    }
}

fn midi_reader_loop(
    midi_in: std::sync::mpsc::Receiver<Vec<u8>>,
    mirror: Arc<Mutex<DeviceMirror>>,
    transport: Arc<Mutex<UdpTransport>>,
    no_level_meters: bool,
    running: Arc<AtomicBool>,
) {
    let sysex = SysexCodec::new(DEVICE_ID);
    let osc = OscCodec::new();
    while running.load(Ordering::SeqCst) {
        let frame = match midi_in.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(frame) => frame,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };
        let message = match sysex.decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("dropping malformed SysEx frame: {}", e.message);
                continue;
            }
        };
        match message {
            SysexMessage::RegisterUpdate(words) => {
                let mut mirror = mirror.lock().unwrap();
                let mut notifications = Vec::new();
                for word in &words {
                    notifications.extend(mirror.apply_register(word.register, word.value));
                }
                drop(mirror);
                publish(&osc, &transport, notifications);
            }
            SysexMessage::LevelMeter { class, payload } => {
                if !no_level_meters {
                    if let Ok(wire) = osc.encode_message("/level", vec![rosc::OscType::Int(class as i32), rosc::OscType::Blob(payload)]) {
                        let _ = transport.lock().unwrap().send(&wire);
                    }
                }
            }
            SysexMessage::Other { sub_id, payload } => {
                log::debug!("unhandled SysEx sub-id {sub_id} ({} bytes)", payload.len());
            }
        }
    }
}

fn publish(osc: &OscCodec, transport: &Arc<Mutex<UdpTransport>>, notifications: Vec<(String, Vec<rosc::OscType>)>) {
    if notifications.is_empty() {
        return;
    }
    for (addr, args) in notifications {
        match osc.encode_message(&addr, args) {
            Ok(wire) => {
                if let Err(e) = transport.lock().unwrap().send(&wire) {
                    log::warn!("failed to publish {addr}: {}", e.message);
                }
            }
            Err(e) => log::warn!("failed to encode {addr}: {}", e.message),
        }
    }
}

fn osc_reader_loop(
    dispatcher: &mut ControlDispatcherHandle,
    midi: &mut MidirMidiPort,
    mirror: &Arc<Mutex<DeviceMirror>>,
    transport: &Arc<Mutex<UdpTransport>>,
    running: &Arc<AtomicBool>,
) {
    let mut buf = vec![0u8; rme_osc::MAX_PACKET_SIZE];
    while running.load(Ordering::SeqCst) {
        let n = {
            let mut transport = transport.lock().unwrap();
            match transport.recv(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    log::warn!("OSC receive failed: {}", e.message);
                    continue;
                }
            }
        };
        if n == 0 {
            continue;
        }
        let replies = {
            let mirror = mirror.lock().unwrap();
            dispatcher.inner.dispatch(&buf[..n], midi, &mirror)
        };
        for reply in replies {
            let osc = OscCodec::new();
            if let Ok(wire) = osc.encode_message(&reply.addr, reply.args) {
                let _ = transport.lock().unwrap().send(&wire);
            }
        }
    }
}

fn device_config_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.data_dir().join("OSCMix").join("device_config"))
        .unwrap_or_else(|| PathBuf::from("./device_config"))
}
