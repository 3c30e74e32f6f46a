//! Mix write semantics: computing per-output-channel device registers from
//! `(volume_dB, pan, width)`, and inverting them back for notifications.

use crate::semantics::LEVEL_NEGATIVE_INFINITY;

/// `L = 10^(vol/20)`, `theta = (pan+100)/400 * pi`; returns `(L*cos theta, L*sin theta)`,
/// the two output legs of a mono-to-stereo write.
fn vol_pan_to_legs(vol_db: f64, pan: f64) -> (f64, f64) {
    let l = 10f64.powf(vol_db / 20.0);
    let theta = (pan + 100.0) / 400.0 * std::f64::consts::PI;
    (l * theta.cos(), l * theta.sin())
}

/// Inverse of [`vol_pan_to_legs`]: recovers `(vol_db, pan)` from the two
/// output leg gains.
fn legs_to_vol_pan(left: f64, right: f64) -> (f64, f64) {
    let l = (left * left + right * right).sqrt();
    let theta = right.atan2(left);
    let pan = theta * 400.0 / std::f64::consts::PI - 100.0;
    let vol_db = if l > 0.0 { 20.0 * l.log10() } else { f64::NEG_INFINITY };
    (vol_db, pan)
}

/// Linear gain -> device word, using the same tenths-of-a-dB, -65dB-floor
/// encoding as [`crate::semantics::SemanticType::Level`].
fn gain_to_register(gain: f64) -> i16 {
    if gain <= 1e-9 {
        return LEVEL_NEGATIVE_INFINITY;
    }
    let db = 20.0 * gain.log10();
    if db <= -65.0 {
        LEVEL_NEGATIVE_INFINITY
    } else {
        (db * 10.0).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
    }
}

fn register_to_gain(raw: i16) -> f64 {
    if raw == LEVEL_NEGATIVE_INFINITY {
        0.0
    } else {
        10f64.powf(raw as f64 / 10.0 / 20.0)
    }
}

/// The four cross-term registers a stereo-to-stereo mix write produces,
/// plus the summary dB/pan registers for the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixRegisters {
    pub left_to_left: i16,
    pub left_to_right: i16,
    pub right_to_left: i16,
    pub right_to_right: i16,
    pub summary_vol_tenths_db: i16,
    pub summary_pan_percent: i16,
}

/// Mono input to stereo output: the two output legs from `vol_db`/`pan`.
pub fn encode_mono_to_stereo(vol_db: f64, pan: f64) -> (i16, i16) {
    let (left, right) = vol_pan_to_legs(vol_db, pan);
    (gain_to_register(left), gain_to_register(right))
}

/// Inverse of [`encode_mono_to_stereo`].
pub fn decode_mono_to_stereo(left: i16, right: i16) -> (f64, f64) {
    legs_to_vol_pan(register_to_gain(left), register_to_gain(right))
}

/// Stereo-linked input to stereo-linked output with width `width`.
pub fn encode_stereo_to_stereo(vol_db: f64, pan: f64, width: f64) -> MixRegisters {
    let (l0, l1) = vol_pan_to_legs(vol_db, pan);
    MixRegisters {
        left_to_left: gain_to_register(l0 * (1.0 + width)),
        left_to_right: gain_to_register(l0 * (1.0 - width)),
        right_to_left: gain_to_register(l1 * (1.0 - width)),
        right_to_right: gain_to_register(l1 * (1.0 + width)),
        summary_vol_tenths_db: (vol_db * 10.0).round() as i16,
        summary_pan_percent: pan.round() as i16,
    }
}

/// Register layout for one output/input mix pair: `MIX_BASE` plus one
/// `MIX_OUTPUT_STRIDE`-sized block per output and one `MIX_INPUT_STRIDE`-sized
/// sub-block per input. Left legs sit at the block's `+0`/`+1`, right legs at
/// `+MIX_RIGHT_LEG_OFFSET`/`+1`, and the write-only summary dB/pan pair at
/// `+MIX_SUMMARY_VOL_OFFSET`/`+1`.
pub const MIX_BASE: u16 = 0x2000;
pub const MIX_OUTPUT_STRIDE: u16 = 0x1000;
pub const MIX_INPUT_STRIDE: u16 = 0x80;
pub const MIX_RIGHT_LEG_OFFSET: u16 = 0x40;
pub const MIX_SUMMARY_VOL_OFFSET: u16 = 0x02;
pub const MIX_SUMMARY_PAN_OFFSET: u16 = 0x03;

/// The base register of the leg/summary block for one `(output, input)`
/// pair; both indices are 1-based, matching the OSC address convention.
pub fn pair_base_register(output: u16, input: u16) -> u16 {
    MIX_BASE + output.saturating_sub(1) * MIX_OUTPUT_STRIDE + input.saturating_sub(1) * MIX_INPUT_STRIDE
}

/// Inverse of [`encode_stereo_to_stereo`], recovered from the four cross
/// terms alone (the summary fields are not needed to invert).
pub fn decode_stereo_to_stereo(registers: &MixRegisters) -> (f64, f64, f64) {
    let ll = register_to_gain(registers.left_to_left);
    let lr = register_to_gain(registers.left_to_right);
    let rl = register_to_gain(registers.right_to_left);
    let rr = register_to_gain(registers.right_to_right);

    let l0 = (ll + lr) / 2.0;
    let l1 = (rl + rr) / 2.0;
    let width_from_left = if l0.abs() > 1e-9 { (ll - lr) / (2.0 * l0) } else { 0.0 };
    let width_from_right = if l1.abs() > 1e-9 { (rr - rl) / (2.0 * l1) } else { 0.0 };
    let width = (width_from_left + width_from_right) / 2.0;

    let (vol_db, pan) = legs_to_vol_pan(l0, l1);
    (vol_db, pan, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_to_stereo_roundtrips_within_tolerance() {
        for &(vol, pan) in &[(-6.0, 0.0), (-3.0, -50.0), (0.0, 100.0), (-20.0, -100.0)] {
            let (left, right) = encode_mono_to_stereo(vol, pan);
            let (decoded_vol, decoded_pan) = decode_mono_to_stereo(left, right);
            assert!((decoded_vol - vol).abs() < 0.1, "vol {vol} -> {decoded_vol}");
            assert!((decoded_pan - pan).abs() < 1.0, "pan {pan} -> {decoded_pan}");
        }
    }

    #[test]
    fn stereo_to_stereo_roundtrips_within_tolerance() {
        for &(vol, pan, width) in &[(-6.0, 0.0, 0.5), (-3.0, 25.0, 0.0), (-10.0, -75.0, 1.0)] {
            let registers = encode_stereo_to_stereo(vol, pan, width);
            let (decoded_vol, decoded_pan, decoded_width) = decode_stereo_to_stereo(&registers);
            assert!((decoded_vol - vol).abs() < 0.1, "vol {vol} -> {decoded_vol}");
            assert!((decoded_pan - pan).abs() < 1.0, "pan {pan} -> {decoded_pan}");
            assert!((decoded_width - width).abs() < 0.05, "width {width} -> {decoded_width}");
        }
    }

    #[test]
    fn silent_mix_floors_to_negative_infinity_registers() {
        let (left, right) = encode_mono_to_stereo(-90.0, 0.0);
        assert_eq!(left, LEVEL_NEGATIVE_INFINITY);
        assert_eq!(right, LEVEL_NEGATIVE_INFINITY);
    }

    #[test]
    fn pair_base_register_matches_the_documented_scenario() {
        assert_eq!(pair_base_register(1, 1), 0x2000);
        assert_eq!(pair_base_register(1, 1) + MIX_RIGHT_LEG_OFFSET + 1, 0x2041);
    }

    #[test]
    fn pair_base_register_advances_per_output_and_input() {
        assert_eq!(pair_base_register(2, 1), 0x2000 + MIX_OUTPUT_STRIDE);
        assert_eq!(pair_base_register(1, 2), 0x2000 + MIX_INPUT_STRIDE);
    }
}
