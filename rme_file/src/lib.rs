//! # RME File
//!
//! The `MediaCodec` collaborator contract (decode/encode halves) and a WAV
//! implementation backing `FileSource`/`FileSink` graph nodes: `wavers` for
//! reading, `hound` for writing with atomic write-then-rename on finalize.

pub mod codec;
pub mod wav_decoder;
pub mod wav_encoder;

pub use codec::{MediaDecoder, MediaEncoder};
pub use wav_decoder::WavDecoder;
pub use wav_encoder::WavEncoder;
