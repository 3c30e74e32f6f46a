//! Declarative device parameter tree: OSC path resolution, semantic value
//! codecs, and the Mix write/read math for multi-leg device registers.

mod leaf;
mod mix;
mod semantics;
mod tree;

pub use leaf::{Leaf, Segment};
pub use mix::{
    decode_mono_to_stereo, decode_stereo_to_stereo, encode_mono_to_stereo, encode_stereo_to_stereo, pair_base_register,
    MixRegisters, MIX_BASE, MIX_INPUT_STRIDE, MIX_OUTPUT_STRIDE, MIX_RIGHT_LEG_OFFSET, MIX_SUMMARY_PAN_OFFSET, MIX_SUMMARY_VOL_OFFSET,
};
pub use semantics::{SemanticType, LEVEL_NEGATIVE_INFINITY};
pub use tree::ParameterTree;
