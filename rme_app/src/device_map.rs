//! A representative 8-in/8-out device parameter tree and device identity,
//! standing in for the model-specific tables the device itself would
//! otherwise report at connect time.

use rme_params::{Leaf, ParameterTree, SemanticType};
use rme_control::DeviceInfo;

const INPUT_GAIN_BASE: u16 = 0x008;
const INPUT_GAIN_STRIDE: u16 = 4;
const INPUT_MUTE_BASE: u16 = 0x040;
const INPUT_PHANTOM_BASE: u16 = 0x060;
const OUTPUT_VOLUME_BASE: u16 = 0x300;
const OUTPUT_VOLUME_STRIDE: u16 = 4;
const OUTPUT_MUTE_BASE: u16 = 0x320;
const CLOCK_SOURCE_REGISTER: u16 = 0x3064;
const SAMPLE_RATE_REGISTER: u16 = 0x3080;
const BUFFER_SIZE_REGISTER: u16 = 0x3081;

/// Device-reported sample rates, in the order their register codes encode
/// them (0 = 32000 Hz, ..., 8 = 192000 Hz). Mirrors the DURec slot table's
/// own rate-code convention, since a raw Hz value would overflow the
/// signed-16-bit register width.
pub const SAMPLE_RATE_NAMES: [&str; 9] =
    ["32000", "44100", "48000", "64000", "88200", "96000", "128000", "176400", "192000"];

pub fn parameter_tree() -> ParameterTree {
    ParameterTree::new(vec![
        Leaf::indexed("/input/*/gain", INPUT_GAIN_BASE, INPUT_GAIN_STRIDE, SemanticType::Fixed { scale: 0.1, min: -650, max: 600 }),
        Leaf::indexed("/input/*/mute", INPUT_MUTE_BASE, 1, SemanticType::Bool),
        Leaf::indexed("/input/*/phantom", INPUT_PHANTOM_BASE, 1, SemanticType::Bool),
        Leaf::indexed("/output/*/volume", OUTPUT_VOLUME_BASE, OUTPUT_VOLUME_STRIDE, SemanticType::Level),
        Leaf::indexed("/output/*/mute", OUTPUT_MUTE_BASE, 1, SemanticType::Bool),
        Leaf::new(
            "/clock/source",
            CLOCK_SOURCE_REGISTER,
            SemanticType::Enum { variants: vec!["Internal".to_string(), "Word".to_string(), "ADAT".to_string(), "SPDIF".to_string()] },
        ),
        Leaf::new("/samplerate", SAMPLE_RATE_REGISTER, SemanticType::Enum { variants: SAMPLE_RATE_NAMES.iter().map(|s| s.to_string()).collect() }),
        Leaf::new("/buffersize", BUFFER_SIZE_REGISTER, SemanticType::Int { min: 32, max: 8192 }),
    ])
}

pub fn device_info(name: &str) -> DeviceInfo {
    DeviceInfo { name: name.to_string(), id: format!("{name}-0"), version: env!("CARGO_PKG_VERSION").to_string(), flags: vec![] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_gain_resolves_with_the_declared_stride() {
        let tree = parameter_tree();
        let (_, register) = tree.resolve("/input/2/gain").unwrap();
        assert_eq!(register, INPUT_GAIN_BASE + 2 * INPUT_GAIN_STRIDE);
    }

    #[test]
    fn samplerate_is_an_enum_not_a_raw_hertz_value() {
        let tree = parameter_tree();
        let (register, raw) = tree.encode("/samplerate", &[rosc::OscType::String("48000".to_string())]).unwrap();
        assert_eq!(register, SAMPLE_RATE_REGISTER);
        assert_eq!(raw, 2);
    }

    #[test]
    fn registers_do_not_collide_with_protocol_or_durec_registers() {
        let tree = parameter_tree();
        let reserved = [
            rme_mirror::FILE_COUNT_REGISTER,
            rme_mirror::REFRESH_TRIGGER_REGISTER,
            rme_mirror::REFRESH_TERMINATOR_REGISTER,
        ];
        for leaf in tree.leaves() {
            assert!(!reserved.contains(&leaf.register_base));
            assert!(leaf.register_base < rme_mirror::FILE_SLOT_BASE || leaf.register_base >= rme_mirror::FILE_SLOT_BASE + rme_mirror::FILE_SLOT_STRIDE * 16);
        }
    }
}
