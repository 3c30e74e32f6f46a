//! A [`MediaDecoder`] backed by `wavers`, eagerly loaded into planar `f32`.

use std::path::Path;

use rme_buffer::{AudioBuffer, ChannelLayout, SampleFormat, StorageLayout};
use rme_core::{ErrorKind, Result, RmeError};
use wavers::Wav;

use crate::codec::MediaDecoder;

pub struct WavDecoder {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
    cursor: usize,
    total_frames: usize,
}

impl WavDecoder {
    pub fn open(path: &str) -> Result<Self> {
        let mut wav: Wav<f32> = Wav::from_path(Path::new(path))
            .map_err(|e| RmeError::new(ErrorKind::Resource, "WavDecoder::open", e.to_string()))?;

        let sample_rate = wav.sample_rate() as u32;
        let num_channels = wav.n_channels() as usize;

        let mut channels: Vec<Vec<f32>> = (0..num_channels).map(|_| Vec::new()).collect();
        for (i, channel) in wav.channels().enumerate() {
            channels[i].extend(channel.iter().copied());
        }
        let total_frames = channels.first().map(|c| c.len()).unwrap_or(0);

        Ok(Self {
            channels,
            sample_rate,
            cursor: 0,
            total_frames,
        })
    }
}

impl MediaDecoder for WavDecoder {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn decode_block(&mut self, frames: usize) -> Result<Option<AudioBuffer>> {
        if self.cursor >= self.total_frames {
            return Ok(None);
        }
        let actual = frames.min(self.total_frames - self.cursor);
        let planes: Vec<Vec<u8>> = self
            .channels
            .iter()
            .map(|channel| {
                channel[self.cursor..self.cursor + actual]
                    .iter()
                    .flat_map(|s| s.to_le_bytes())
                    .collect()
            })
            .collect();
        self.cursor += actual;
        let buffer = AudioBuffer::from_planes(
            actual,
            self.sample_rate,
            SampleFormat::F32,
            StorageLayout::Planar,
            ChannelLayout::with_channel_count(self.channels.len()),
            planes,
        )?;
        Ok(Some(buffer))
    }

    fn seek_to_start(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat as HoundFormat, WavSpec, WavWriter};
    use std::io::BufWriter;
    use tempfile::NamedTempFile;

    fn write_test_wav(rate: u32, channels: u16, samples: &[Vec<f32>]) -> NamedTempFile {
        let temp = NamedTempFile::new().unwrap();
        let spec = WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 32,
            sample_format: HoundFormat::Float,
        };
        let mut writer = WavWriter::new(BufWriter::new(temp.reopen().unwrap()), spec).unwrap();
        let n = samples[0].len();
        for i in 0..n {
            for channel in samples {
                writer.write_sample(channel[i]).unwrap();
            }
        }
        writer.finalize().unwrap();
        temp
    }

    #[test]
    fn decodes_blocks_smaller_than_the_file() {
        let samples = vec![vec![0.0, 0.25, 0.5, 0.75, 1.0, -1.0]];
        let temp = write_test_wav(48_000, 1, &samples);
        let mut decoder = WavDecoder::open(temp.path().to_str().unwrap()).unwrap();
        assert_eq!(decoder.sample_rate(), 48_000);
        assert_eq!(decoder.channel_count(), 1);

        let first = decoder.decode_block(4).unwrap().unwrap();
        assert_eq!(first.frames(), 4);
        let second = decoder.decode_block(4).unwrap().unwrap();
        assert_eq!(second.frames(), 2);
        assert!(decoder.decode_block(4).unwrap().is_none());
    }

    #[test]
    fn seek_to_start_rewinds_the_cursor() {
        let samples = vec![vec![0.1, 0.2, 0.3]];
        let temp = write_test_wav(44_100, 1, &samples);
        let mut decoder = WavDecoder::open(temp.path().to_str().unwrap()).unwrap();
        decoder.decode_block(3).unwrap();
        assert!(decoder.decode_block(3).unwrap().is_none());
        decoder.seek_to_start().unwrap();
        assert!(decoder.decode_block(3).unwrap().is_some());
    }

    #[test]
    fn open_rejects_nonexistent_path() {
        assert!(WavDecoder::open("/nonexistent/path/audio.wav").is_err());
    }
}
