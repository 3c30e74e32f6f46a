//! [`SysexCodec`]: the device-bound SysEx encoding described in the wire
//! interface — register writes and level-meter classes over a base-128
//! packed payload.

use rme_core::{ErrorKind, Result, RmeError};

use crate::base128;
use crate::frame::SysexFrame;
use crate::register::RegisterWord;

/// RME's three-byte manufacturer id on the wire.
pub const MANUFACTURER_ID: [u8; 3] = [0x00, 0x20, 0x0D];

pub const SUBID_REGISTER_WRITE: u8 = 0;
pub const SUBID_LEVEL_METER_MIN: u8 = 1;
pub const SUBID_LEVEL_METER_MAX: u8 = 5;
pub const SUBID_LEVELS_POLL_REQUEST: u8 = 2;
pub const SUBID_LOOPBACK: u8 = 3;
pub const SUBID_EQ_RECORD: u8 = 4;

/// A decoded, classified SysEx frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysexMessage {
    /// Sub-id 0: one or more register words.
    RegisterUpdate(Vec<RegisterWord>),
    /// Sub-id 1..=5: a level-meter class and its raw (unpacked) payload.
    LevelMeter { class: u8, payload: Vec<u8> },
    /// Any other sub-id, carried unpacked but otherwise uninterpreted.
    Other { sub_id: u8, payload: Vec<u8> },
}

/// Encodes and decodes SysEx frames bound for (or received from) a single
/// device id.
#[derive(Debug, Clone, Copy)]
pub struct SysexCodec {
    device_id: u8,
}

impl SysexCodec {
    pub fn new(device_id: u8) -> Self {
        Self { device_id }
    }

    pub fn device_id(self) -> u8 {
        self.device_id
    }

    /// Encode a register-write frame carrying one or more register words.
    pub fn encode_register_write(self, words: &[RegisterWord]) -> Result<Vec<u8>> {
        let mut raw = Vec::with_capacity(words.len() * 4);
        for word in words {
            raw.extend_from_slice(&word.encode().to_le_bytes());
        }
        let packed = base128::pack(&raw)?;
        let frame = SysexFrame::new(MANUFACTURER_ID, self.device_id, SUBID_REGISTER_WRITE, packed);
        Ok(frame.to_wire())
    }

    /// Decode a wire frame, rejecting frames from a different manufacturer
    /// or device id.
    pub fn decode(self, wire: &[u8]) -> Result<SysexMessage> {
        let frame = SysexFrame::from_wire(wire)?;
        if frame.manufacturer != MANUFACTURER_ID {
            return Err(RmeError::new(
                ErrorKind::Protocol,
                "SysexCodec::decode",
                "unrecognized manufacturer id",
            ));
        }
        if frame.device != self.device_id {
            return Err(RmeError::new(
                ErrorKind::Protocol,
                "SysexCodec::decode",
                "frame addressed to a different device id",
            ));
        }
        let raw = base128::unpack(&frame.payload)?;
        match frame.sub_id {
            SUBID_REGISTER_WRITE => {
                if raw.len() % 4 != 0 {
                    return Err(RmeError::new(
                        ErrorKind::Protocol,
                        "SysexCodec::decode",
                        "register update payload is not a multiple of 4 bytes",
                    ));
                }
                let words = raw
                    .chunks_exact(4)
                    .map(|chunk| {
                        let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                        RegisterWord::decode(word)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(SysexMessage::RegisterUpdate(words))
            }
            sub_id @ SUBID_LEVEL_METER_MIN..=SUBID_LEVEL_METER_MAX => {
                Ok(SysexMessage::LevelMeter { class: sub_id, payload: raw })
            }
            sub_id => Ok(SysexMessage::Other { sub_id, payload: raw }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_write_roundtrips_through_the_wire() {
        let codec = SysexCodec::new(0x10);
        let words = vec![
            RegisterWord::new(12, -650),
            RegisterWord::new(300, 42),
        ];
        let wire = codec.encode_register_write(&words).unwrap();
        match codec.decode(&wire).unwrap() {
            SysexMessage::RegisterUpdate(decoded) => assert_eq!(decoded, words),
            other => panic!("expected RegisterUpdate, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_wrong_manufacturer() {
        let codec = SysexCodec::new(0x10);
        let mut wire = codec.encode_register_write(&[RegisterWord::new(1, 1)]).unwrap();
        wire[1] = 0xAB;
        assert!(codec.decode(&wire).is_err());
    }

    #[test]
    fn decode_rejects_wrong_device_id() {
        let codec = SysexCodec::new(0x10);
        let wire = codec.encode_register_write(&[RegisterWord::new(1, 1)]).unwrap();
        let other = SysexCodec::new(0x11);
        assert!(other.decode(&wire).is_err());
    }

    #[test]
    fn level_meter_subids_are_classified() {
        let codec = SysexCodec::new(0x10);
        let packed = base128::pack(&[1, 2, 3, 4]).unwrap();
        let frame = SysexFrame::new(MANUFACTURER_ID, 0x10, 3, packed);
        match codec.decode(&frame.to_wire()).unwrap() {
            SysexMessage::LevelMeter { class, payload } => {
                assert_eq!(class, 3);
                assert_eq!(payload, vec![1, 2, 3, 4]);
            }
            other => panic!("expected LevelMeter, got {other:?}"),
        }
    }
}
