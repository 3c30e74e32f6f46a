//! End-to-end scenarios spanning the whole control-plane round trip: an
//! inbound OSC command is dispatched into one or more SysEx register
//! writes, those writes are folded back into a [`DeviceMirror`] as if the
//! device had echoed them, and the resulting notifications are re-encoded
//! as OSC to confirm the client sees what the device actually holds.

use std::sync::{Arc, Mutex};

use rme_control::{ControlDispatcher, DeviceInfo};
use rme_core::Result;
use rme_midi::MidiPort;
use rme_mirror::DeviceMirror;
use rme_osc::{OscCodec, OscType};
use rme_params::{Leaf, ParameterTree, SemanticType};
use rme_sysex::{SysexCodec, SysexMessage};

/// Captures every SysEx frame a dispatcher sends, standing in for the
/// device's MIDI input.
#[derive(Clone, Default)]
struct RecordingMidiPort {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MidiPort for RecordingMidiPort {
    fn send_sysex(&mut self, frame: &[u8]) -> Result<()> {
        self.sent.lock().unwrap().push(frame.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn stereo_tree() -> ParameterTree {
    ParameterTree::new(vec![
        Leaf::indexed("/input/*/gain", 0x008, 4, SemanticType::Fixed { scale: 0.1, min: -650, max: 600 }),
        Leaf::new("/clock/source", 0x3064, SemanticType::Enum { variants: vec!["Internal".to_string(), "Word".to_string()] }),
    ])
}

fn sample_device() -> DeviceInfo {
    DeviceInfo { name: "Fireface".to_string(), id: "bridge-scenarios".to_string(), version: "1.0".to_string(), flags: vec![] }
}

/// Feeds every register word a dispatch produced back through a mirror, as
/// the device's own SysEx replies would, and collects the OSC messages
/// those echoes would notify the client with.
fn echo_into_mirror(sysex: SysexCodec, frames: &[Vec<u8>], mirror: &mut DeviceMirror) -> Vec<(String, Vec<OscType>)> {
    let mut notifications = Vec::new();
    for frame in frames {
        match sysex.decode(frame).unwrap() {
            SysexMessage::RegisterUpdate(words) => {
                for word in words {
                    notifications.extend(mirror.apply_register(word.register, word.value));
                }
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
    notifications
}

/// Scenario: a stereo-to-stereo mix write over OSC becomes four leg writes
/// plus a write-only summary pair, all packed into one frame; echoing the
/// six words back through the mirror reassembles them into a single
/// `/mix/<output>/input/<input>` notification once the fourth leg lands.
#[test]
fn mix_write_round_trips_through_sysex_and_back_into_the_mirror() {
    let dir = tempfile::tempdir().unwrap();
    let mut dispatcher = ControlDispatcher::new(stereo_tree(), SysexCodec::new(0x10), dir.path(), sample_device());
    let mut midi = RecordingMidiPort::default();
    let mirror_tree = stereo_tree();
    let mut mirror = DeviceMirror::new(mirror_tree);

    let inbound = OscCodec::new().encode_message("/mix/1/input/1", vec![OscType::Float(-6.0), OscType::Int(0), OscType::Float(1.0)]).unwrap();
    let replies = dispatcher.dispatch(&inbound, &mut midi, &mirror);
    assert!(replies.is_empty(), "a mix write has no synchronous reply");

    let frames = midi.sent.lock().unwrap().clone();
    assert_eq!(frames.len(), 1, "the four legs and the summary are packed into one frame");

    let notifications = echo_into_mirror(SysexCodec::new(0x10), &frames, &mut mirror);
    assert_eq!(notifications.len(), 1, "the pair notifies once, when its fourth leg completes; the two summary writes are write-only");
    assert_eq!(notifications[0].0, "/mix/1/input/1");
    match notifications[0].1.as_slice() {
        [OscType::Float(vol), OscType::Float(pan), OscType::Float(width)] => {
            assert!(*vol < 0.0, "a -6 dB write should decode back to a negative level");
            assert!(pan.abs() < 0.01, "a centered write should decode back to roughly zero pan, got {pan}");
            assert_eq!(*width, 1.0);
        }
        other => panic!("unexpected notification args: {other:?}"),
    }

    // The reassembled pair is what a wildcard query would hand the client.
    let query = OscCodec::new().encode_message("/mix/*", vec![]).unwrap();
    let discovered = dispatcher.dispatch(&query, &mut midi, &mirror);
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].addr, "/mix/1/input/1");
}

/// Scenario: `/refresh` triggers the sentinel write; once the device's
/// refresh burst and terminator are echoed back, every register re-sends
/// its notification even though nothing changed, and the mirror leaves
/// refresh mode once the terminator lands.
#[test]
fn refresh_requests_a_full_resync_and_the_mirror_tracks_the_burst() {
    let dir = tempfile::tempdir().unwrap();
    let mut dispatcher = ControlDispatcher::new(stereo_tree(), SysexCodec::new(0x10), dir.path(), sample_device());
    let mut midi = RecordingMidiPort::default();
    let mut mirror = DeviceMirror::new(stereo_tree());

    // Prime the mirror with a value, as if the device was already running.
    mirror.apply_register(0x3064, 0);

    let inbound = OscCodec::new().encode_message("/refresh", vec![]).unwrap();
    let replies = dispatcher.dispatch(&inbound, &mut midi, &mirror);
    assert!(replies.is_empty());

    let frames = midi.sent.lock().unwrap().clone();
    assert_eq!(frames.len(), 1);
    match SysexCodec::new(0x10).decode(&frames[0]).unwrap() {
        SysexMessage::RegisterUpdate(words) => {
            assert_eq!(words.len(), 1);
            assert_eq!(words[0].register, rme_mirror::REFRESH_TRIGGER_REGISTER);
            assert_eq!(words[0].value, rme_mirror::REFRESH_TRIGGER_VALUE);
        }
        other => panic!("unexpected message: {other:?}"),
    }

    // The device honors the trigger and starts echoing its whole register
    // space; unchanged values still notify while a refresh is in flight.
    mirror.apply_register(rme_mirror::REFRESH_TRIGGER_REGISTER, rme_mirror::REFRESH_TRIGGER_VALUE);
    assert!(mirror.is_refreshing());
    let during = mirror.apply_register(0x3064, 0);
    assert_eq!(during.len(), 1, "unchanged value still notifies mid-refresh");

    mirror.apply_register(rme_mirror::REFRESH_TERMINATOR_REGISTER, 0);
    assert!(!mirror.is_refreshing());

    // Client-visible effect: a wildcard discovery after the burst sees the
    // same value the refresh just re-asserted.
    let query = OscCodec::new().encode_message("/clock/*", vec![]).unwrap();
    let discovered = dispatcher.dispatch(&query, &mut midi, &mirror);
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].addr, "/clock/source");
}
