//! [`ControlDispatcher`]: turns inbound OSC packets into register writes,
//! and handles the non-parameter commands (`/dump`, `/dump/save`,
//! `/refresh`).

use std::fs;
use std::path::PathBuf;

use rme_core::{ErrorKind, Result, RmeError};
use rme_midi::MidiPort;
use rme_mirror::{DeviceMirror, REFRESH_TRIGGER_REGISTER, REFRESH_TRIGGER_VALUE};
use rme_osc::{OscCodec, OscMessage, OscType};
use rme_params::{encode_mono_to_stereo, encode_stereo_to_stereo, pair_base_register, ParameterTree, MIX_RIGHT_LEG_OFFSET, MIX_SUMMARY_PAN_OFFSET, MIX_SUMMARY_VOL_OFFSET};
use rme_sysex::{RegisterWord, SysexCodec};

use crate::glob::glob_match;
use crate::snapshot::{self, DeviceInfo};

/// Parses inbound OSC traffic, resolves parameter paths, and drives the
/// SysEx/mirror/file side effects those commands imply.
pub struct ControlDispatcher {
    tree: ParameterTree,
    sysex: SysexCodec,
    osc: OscCodec,
    device_config_dir: PathBuf,
    device: DeviceInfo,
}

impl ControlDispatcher {
    pub fn new(tree: ParameterTree, sysex: SysexCodec, device_config_dir: impl Into<PathBuf>, device: DeviceInfo) -> Self {
        Self { tree, sysex, osc: OscCodec::new(), device_config_dir: device_config_dir.into(), device }
    }

    /// Decodes one wire packet (message or bundle, flattened in arrival
    /// order) and dispatches every message it contains. Returns the OSC
    /// replies the client should receive: `/error` for failures, and the
    /// resolved current values for a wildcard discovery query.
    pub fn dispatch(&mut self, bytes: &[u8], midi: &mut dyn MidiPort, mirror: &DeviceMirror) -> Vec<OscMessage> {
        let messages = match self.osc.decode(bytes) {
            Ok(m) => m,
            Err(e) => return vec![error_reply(&e, "<packet>")],
        };
        let mut replies = Vec::new();
        for message in messages {
            match self.dispatch_one(&message, midi, mirror) {
                Ok(mut r) => replies.append(&mut r),
                Err(e) => replies.push(error_reply(&e, &message.addr)),
            }
        }
        replies
    }

    fn dispatch_one(&mut self, message: &OscMessage, midi: &mut dyn MidiPort, mirror: &DeviceMirror) -> Result<Vec<OscMessage>> {
        match message.addr.as_str() {
            "/dump" => {
                log::info!("device state dump:\n{}", mirror.dump_text());
                Ok(Vec::new())
            }
            "/dump/save" => self.dump_save(mirror).map(|_| Vec::new()),
            "/refresh" => self.send_refresh(midi).map(|_| Vec::new()),
            addr if addr.contains('*') => Ok(self.discover(addr, mirror)),
            addr => match parse_mix_path(addr) {
                Some((output, input)) => self.dispatch_mix(output, input, &message.args, midi).map(|_| Vec::new()),
                None => self.dispatch_leaf(addr, &message.args, midi).map(|_| Vec::new()),
            },
        }
    }

    fn dispatch_leaf(&mut self, addr: &str, args: &[OscType], midi: &mut dyn MidiPort) -> Result<()> {
        let (register, raw) = self.tree.encode(addr, args)?;
        self.send_register_write(register, raw, midi)
    }

    /// A mix write resolves outside the parameter tree since it touches
    /// several registers from one OSC message: the two (stereo source,
    /// two legs) or six (stereo-to-stereo, four legs plus summary) words
    /// computed by `rme_params::mix`.
    fn dispatch_mix(&mut self, output: u16, input: u16, args: &[OscType], midi: &mut dyn MidiPort) -> Result<()> {
        let base = pair_base_register(output, input);
        let words = match args {
            [OscType::Float(vol), pan, OscType::Float(width)] => {
                let registers = encode_stereo_to_stereo(*vol as f64, numeric_pan(pan)?, *width as f64);
                vec![
                    RegisterWord::new(base, registers.left_to_left),
                    RegisterWord::new(base + 1, registers.left_to_right),
                    RegisterWord::new(base + MIX_RIGHT_LEG_OFFSET, registers.right_to_left),
                    RegisterWord::new(base + MIX_RIGHT_LEG_OFFSET + 1, registers.right_to_right),
                    RegisterWord::new(base + MIX_SUMMARY_VOL_OFFSET, registers.summary_vol_tenths_db),
                    RegisterWord::new(base + MIX_SUMMARY_PAN_OFFSET, registers.summary_pan_percent),
                ]
            }
            [OscType::Float(vol), pan] => {
                let (left, right) = encode_mono_to_stereo(*vol as f64, numeric_pan(pan)?);
                vec![RegisterWord::new(base, left), RegisterWord::new(base + 1, right)]
            }
            _ => return Err(RmeError::new(ErrorKind::Config, "ControlDispatcher::dispatch_mix", "expected (volume, pan[, width]) arguments")),
        };
        let wire = self.sysex.encode_register_write(&words)?;
        midi.send_sysex(&wire).map_err(|e| RmeError::new(e.kind, "ControlDispatcher::dispatch_mix", e.message))
    }

    /// A wildcard query returns the mirror's current value for every path
    /// that matches, without writing anything to the device.
    fn discover(&self, pattern: &str, mirror: &DeviceMirror) -> Vec<OscMessage> {
        let mut matches: Vec<_> =
            mirror.snapshot().iter().filter(|(path, _)| glob_match(pattern, path)).map(|(p, a)| (p.clone(), a.clone())).collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        matches.into_iter().map(|(addr, args)| OscMessage { addr, args }).collect()
    }

    fn send_register_write(&mut self, register: u16, raw: i16, midi: &mut dyn MidiPort) -> Result<()> {
        let wire = self.sysex.encode_register_write(&[RegisterWord::new(register, raw)])?;
        midi.send_sysex(&wire).map_err(|e| RmeError::new(e.kind, "ControlDispatcher::send_register_write", e.message))
    }

    fn send_refresh(&mut self, midi: &mut dyn MidiPort) -> Result<()> {
        self.send_register_write(REFRESH_TRIGGER_REGISTER, REFRESH_TRIGGER_VALUE, midi)
    }

    fn dump_save(&self, mirror: &DeviceMirror) -> Result<()> {
        fs::create_dir_all(&self.device_config_dir)
            .map_err(|e| RmeError::new(ErrorKind::Resource, "ControlDispatcher::dump_save", e.to_string()))?;
        let timestamp = snapshot::unix_seconds_now()?;
        let path = self.device_config_dir.join(snapshot::snapshot_filename(&self.device.name, timestamp));
        let document = snapshot::persisted_state(&self.device, mirror, timestamp);
        let text = serde_json::to_string_pretty(&document)
            .map_err(|e| RmeError::new(ErrorKind::Fatal, "ControlDispatcher::dump_save", e.to_string()))?;
        fs::write(&path, text).map_err(|e| RmeError::new(ErrorKind::Resource, "ControlDispatcher::dump_save", e.to_string()))?;
        log::info!("saved device state snapshot to {}", path.display());
        Ok(())
    }
}

/// Matches `/mix/<output>/input/<input>`, returning the two 1-based
/// indices. Any other shape (including a literal `input` with a non-numeric
/// index) is not a mix path.
fn parse_mix_path(addr: &str) -> Option<(u16, u16)> {
    let segments: Vec<&str> = addr.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["mix", output, "input", input] => Some((output.parse().ok()?, input.parse().ok()?)),
        _ => None,
    }
}

fn numeric_pan(arg: &OscType) -> Result<f64> {
    match arg {
        OscType::Int(i) => Ok(*i as f64),
        OscType::Float(f) => Ok(*f as f64),
        _ => Err(RmeError::new(ErrorKind::Config, "ControlDispatcher::dispatch_mix", "expected a numeric pan argument")),
    }
}

/// The `/error ,iss (code, context, message)` reply for a failed command.
fn error_reply(error: &RmeError, addr: &str) -> OscMessage {
    OscMessage {
        addr: "/error".to_string(),
        args: vec![OscType::Int(error.kind.code()), OscType::String(addr.to_string()), OscType::String(error.message.clone())],
    }
}
