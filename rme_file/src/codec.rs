//! The `MediaCodec` collaborator contract: decode a file into buffers for a
//! `FileSource`, or encode buffers into a file for a `FileSink`.

use rme_buffer::AudioBuffer;
use rme_core::Result;

/// The decoding half of a media codec, owned by a `FileSource` node.
pub trait MediaDecoder: Send {
    fn sample_rate(&self) -> u32;
    fn channel_count(&self) -> usize;

    /// Decode up to `frames` frames. Returns `Ok(None)` on end of file.
    fn decode_block(&mut self, frames: usize) -> Result<Option<AudioBuffer>>;

    /// Seek back to the first frame, for `loop = true` sources.
    fn seek_to_start(&mut self) -> Result<()>;
}

/// The encoding half of a media codec, owned by a `FileSink` node.
pub trait MediaEncoder: Send {
    /// Encode one block, appending it to the output stream.
    fn encode_block(&mut self, buffer: &AudioBuffer) -> Result<()>;

    /// Flush the encoder and atomically publish the output file (write to a
    /// temporary path, then rename over the final path).
    fn finalize(self: Box<Self>) -> Result<()>;
}
