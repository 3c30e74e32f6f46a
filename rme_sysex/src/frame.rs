//! Raw SysEx frame structure: `F0 <mfr:3> <dev:1> <subid:1> <payload...> F7`.

use rme_core::{ErrorKind, Result, RmeError};

const START: u8 = 0xF0;
const END: u8 = 0xF7;

/// An undecoded SysEx frame: manufacturer id, device id, sub-id, and
/// base-128-packed payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysexFrame {
    pub manufacturer: [u8; 3],
    pub device: u8,
    pub sub_id: u8,
    pub payload: Vec<u8>,
}

impl SysexFrame {
    pub fn new(manufacturer: [u8; 3], device: u8, sub_id: u8, payload: Vec<u8>) -> Self {
        Self {
            manufacturer,
            device,
            sub_id,
            payload,
        }
    }

    /// Serialize to the on-the-wire byte sequence, including the `F0`/`F7`
    /// frame markers.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(6 + self.payload.len());
        out.push(START);
        out.extend_from_slice(&self.manufacturer);
        out.push(self.device);
        out.push(self.sub_id);
        out.extend_from_slice(&self.payload);
        out.push(END);
        out
    }

    /// Parse a wire byte sequence into a frame, checking only structural
    /// validity (markers present, minimum length); manufacturer/device id
    /// matching is the codec's responsibility.
    pub fn from_wire(wire: &[u8]) -> Result<Self> {
        if wire.len() < 6 {
            return Err(RmeError::new(
                ErrorKind::Protocol,
                "SysexFrame::from_wire",
                "frame shorter than the fixed header and markers",
            ));
        }
        if wire[0] != START {
            return Err(RmeError::new(
                ErrorKind::Protocol,
                "SysexFrame::from_wire",
                "missing F0 start marker",
            ));
        }
        if wire[wire.len() - 1] != END {
            return Err(RmeError::new(
                ErrorKind::Protocol,
                "SysexFrame::from_wire",
                "missing F7 end marker",
            ));
        }
        let manufacturer = [wire[1], wire[2], wire[3]];
        let device = wire[4];
        let sub_id = wire[5];
        let payload = wire[6..wire.len() - 1].to_vec();
        Ok(Self {
            manufacturer,
            device,
            sub_id,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_wire_bytes() {
        let frame = SysexFrame::new([0x00, 0x20, 0x0D], 0x10, 0, vec![1, 2, 3]);
        let wire = frame.to_wire();
        assert_eq!(wire[0], START);
        assert_eq!(wire[wire.len() - 1], END);
        assert_eq!(SysexFrame::from_wire(&wire).unwrap(), frame);
    }

    #[test]
    fn missing_start_marker_is_rejected() {
        let mut wire = SysexFrame::new([0, 0x20, 0x0D], 0x10, 0, vec![1]).to_wire();
        wire[0] = 0x00;
        assert!(SysexFrame::from_wire(&wire).is_err());
    }

    #[test]
    fn missing_end_marker_is_rejected() {
        let mut wire = SysexFrame::new([0, 0x20, 0x0D], 0x10, 0, vec![1]).to_wire();
        let last = wire.len() - 1;
        wire[last] = 0x00;
        assert!(SysexFrame::from_wire(&wire).is_err());
    }

    #[test]
    fn truncated_frame_is_rejected() {
        assert!(SysexFrame::from_wire(&[START, 0, 0x20]).is_err());
    }
}
