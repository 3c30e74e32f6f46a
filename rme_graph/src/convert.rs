//! Sample format conversion used by `AsioSource`/`AsioSink` to bridge a
//! driver's native format and a node's internal format.

use rme_buffer::SampleFormat;

/// Decode one sample at `bytes[..bytes_per_sample]` into a canonical `f64`
/// in `[-1.0, 1.0]` (float formats are passed through, integer formats are
/// normalized by their full range).
pub fn decode_sample(bytes: &[u8], format: SampleFormat) -> f64 {
    match format {
        SampleFormat::S16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64 / i16::MAX as f64,
        SampleFormat::S24in32 | SampleFormat::S32 => {
            i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64 / i32::MAX as f64
        }
        SampleFormat::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        SampleFormat::F64 => f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
    }
}

/// Encode a canonical `f64` sample into `format`'s on-the-wire byte width.
pub fn encode_sample(value: f64, format: SampleFormat) -> Vec<u8> {
    match format {
        SampleFormat::S16 => {
            let clamped = value.clamp(-1.0, 1.0);
            ((clamped * i16::MAX as f64) as i16).to_le_bytes().to_vec()
        }
        SampleFormat::S24in32 | SampleFormat::S32 => {
            let clamped = value.clamp(-1.0, 1.0);
            ((clamped * i32::MAX as f64) as i32).to_le_bytes().to_vec()
        }
        SampleFormat::F32 => (value as f32).to_le_bytes().to_vec(),
        SampleFormat::F64 => value.to_le_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_roundtrips_exactly() {
        let encoded = encode_sample(0.25, SampleFormat::F32);
        assert_eq!(decode_sample(&encoded, SampleFormat::F32), 0.25);
    }

    #[test]
    fn s16_full_scale_roundtrips_within_one_tick() {
        for &v in &[-1.0, -0.5, 0.0, 0.5, 1.0] {
            let encoded = encode_sample(v, SampleFormat::S16);
            let decoded = decode_sample(&encoded, SampleFormat::S16);
            assert!((decoded - v).abs() < 1.0 / i16::MAX as f64 * 2.0);
        }
    }

    #[test]
    fn out_of_range_values_are_clamped_not_wrapped() {
        let encoded = encode_sample(5.0, SampleFormat::S16);
        assert_eq!(i16::from_le_bytes([encoded[0], encoded[1]]), i16::MAX);
    }
}
