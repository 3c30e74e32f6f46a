//! A [`MediaEncoder`] backed by `hound`, writing 32-bit float WAV to a
//! temporary path and renaming over the final path on `finalize`.

use std::fs;
use std::io::BufWriter;
use std::path::PathBuf;

use hound::{SampleFormat as HoundFormat, WavSpec, WavWriter};
use rme_buffer::{AudioBuffer, SampleFormat, StorageLayout};
use rme_core::{ErrorKind, Result, RmeError};

use crate::codec::MediaEncoder;

const BIT_DEPTH: u16 = 32;

pub struct WavEncoder {
    writer: WavWriter<BufWriter<fs::File>>,
    final_path: PathBuf,
    temp_path: PathBuf,
    channels: usize,
}

impl WavEncoder {
    pub fn create(path: &str, sample_rate: u32, channels: usize) -> Result<Self> {
        let final_path = PathBuf::from(path);
        let temp_path = final_path.with_extension(match final_path.extension() {
            Some(ext) => format!("{}.tmp", ext.to_string_lossy()),
            None => "tmp".to_string(),
        });
        let spec = WavSpec {
            channels: channels as u16,
            sample_rate,
            bits_per_sample: BIT_DEPTH,
            sample_format: HoundFormat::Float,
        };
        let writer = WavWriter::create(&temp_path, spec)
            .map_err(|e| RmeError::new(ErrorKind::Resource, "WavEncoder::create", e.to_string()))?;
        Ok(Self {
            writer,
            final_path,
            temp_path,
            channels,
        })
    }

    fn sample_at(buffer: &AudioBuffer, channel: usize, frame: usize) -> f32 {
        let bps = SampleFormat::F32.bytes_per_sample();
        match buffer.storage_layout() {
            StorageLayout::Planar => {
                let bytes = buffer.plane_ptr(channel);
                let o = frame * bps;
                f32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]])
            }
            StorageLayout::Interleaved => {
                let bytes = buffer.plane_ptr(0);
                let n = buffer.channels().channel_count();
                let o = (frame * n + channel) * bps;
                f32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]])
            }
        }
    }
}

impl MediaEncoder for WavEncoder {
    fn encode_block(&mut self, buffer: &AudioBuffer) -> Result<()> {
        if buffer.format() != SampleFormat::F32 {
            return Err(RmeError::new(
                ErrorKind::Config,
                "WavEncoder::encode_block",
                "only F32 buffers are supported",
            ));
        }
        for frame in 0..buffer.frames() {
            for channel in 0..self.channels {
                let sample = Self::sample_at(buffer, channel, frame);
                self.writer
                    .write_sample(sample)
                    .map_err(|e| RmeError::new(ErrorKind::Io, "WavEncoder::encode_block", e.to_string()))?;
            }
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<()> {
        self.writer
            .finalize()
            .map_err(|e| RmeError::new(ErrorKind::Io, "WavEncoder::finalize", e.to_string()))?;
        fs::rename(&self.temp_path, &self.final_path)
            .map_err(|e| RmeError::new(ErrorKind::Io, "WavEncoder::finalize", e.to_string()))?;
        Ok(())
    }
}
