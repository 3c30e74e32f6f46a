//! Base-128 packing: four raw bytes become five MIDI-safe 7-bit bytes.
//!
//! Every output byte has bit 7 clear so the encoded stream can travel as
//! ordinary SysEx data bytes.

use rme_core::{ErrorKind, Result, RmeError};

/// Pack a multiple-of-4 byte slice into 7-bit groups, 5 output bytes per 4
/// input bytes.
pub fn pack(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() % 4 != 0 {
        return Err(RmeError::new(
            ErrorKind::Protocol,
            "base128::pack",
            "input length must be a multiple of 4",
        ));
    }
    let mut out = Vec::with_capacity(bytes.len() / 4 * 5);
    for chunk in bytes.chunks_exact(4) {
        let (b0, b1, b2, b3) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        out.push(b0 & 0x7F);
        out.push((b0 >> 7) | ((b1 & 0x3F) << 1));
        out.push((b1 >> 6) | ((b2 & 0x1F) << 2));
        out.push((b2 >> 5) | ((b3 & 0x0F) << 3));
        out.push(b3 >> 4);
    }
    Ok(out)
}

/// Inverse of [`pack`]: five 7-bit input bytes become four raw output bytes.
pub fn unpack(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() % 5 != 0 {
        return Err(RmeError::new(
            ErrorKind::Protocol,
            "base128::unpack",
            "input length must be a multiple of 5",
        ));
    }
    let mut out = Vec::with_capacity(bytes.len() / 5 * 4);
    for chunk in bytes.chunks_exact(5) {
        let (o0, o1, o2, o3, o4) = (chunk[0], chunk[1], chunk[2], chunk[3], chunk[4]);
        let b0 = (o0 & 0x7F) | ((o1 & 0x01) << 7);
        let b1 = (o1 >> 1) | ((o2 & 0x03) << 6);
        let b2 = (o2 >> 2) | ((o3 & 0x07) << 5);
        let b3 = (o3 >> 3) | (o4 << 4);
        out.push(b0);
        out.push(b1);
        out.push(b2);
        out.push(b3);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_output_bytes_have_bit7_clear() {
        let packed = pack(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert!(packed.iter().all(|&b| b & 0x80 == 0));
    }

    #[test]
    fn pack_rejects_non_multiple_of_4() {
        assert!(pack(&[1, 2, 3]).is_err());
    }

    #[test]
    fn unpack_rejects_non_multiple_of_5() {
        assert!(unpack(&[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn roundtrip_is_identity_for_arbitrary_bytes() {
        let cases: &[&[u8]] = &[
            &[0, 0, 0, 0],
            &[0xFF, 0xFF, 0xFF, 0xFF],
            &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0],
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        ];
        for case in cases {
            let packed = pack(case).unwrap();
            assert_eq!(packed.len(), case.len() / 4 * 5);
            let unpacked = unpack(&packed).unwrap();
            assert_eq!(&unpacked, case);
        }
    }

    #[test]
    fn roundtrip_over_structured_sample_of_byte_space() {
        for a in (0..=255u8).step_by(17) {
            for b in (0..=255u8).step_by(31) {
                let bytes = [a, b, a ^ b, a.wrapping_add(b)];
                let packed = pack(&bytes).unwrap();
                assert_eq!(unpack(&packed).unwrap(), bytes);
            }
        }
    }
}
