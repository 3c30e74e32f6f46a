//! A node that converts an [`AudioBuffer`] on its input pad into ASIO
//! hardware output buffers.

use rme_buffer::{AudioBuffer, ChannelLayout, SampleFormat};
use rme_core::{ErrorKind, Result, RmeError};

use crate::asio::AsioDriver;
use crate::convert::{decode_sample, encode_sample};
use crate::node::{AudioNode, NodeCommon, NodeKind, NodeParams, NodeState};

/// Writes input pad `0` out to hardware output channels on an [`AsioDriver`].
/// Silence is written when no buffer has arrived for the current tick.
pub struct AsioSink {
    common: NodeCommon,
    driver: Box<dyn AsioDriver>,
    hardware_channels: Vec<usize>,
    block: usize,
}

impl AsioSink {
    pub fn new(name: impl Into<String>, driver: Box<dyn AsioDriver>) -> Self {
        Self {
            common: NodeCommon::new(name, 1, 0),
            driver,
            hardware_channels: Vec::new(),
            block: 0,
        }
    }

    /// Write the buffer most recently delivered to input pad `0` into the
    /// driver's hardware output buffers, converting to the driver's native
    /// format. Writes silence if no buffer has been delivered this tick.
    ///
    /// # Safety
    /// Callers must guarantee every pointer in `buffer_ptrs` is valid and
    /// writable for `block` native-format samples.
    pub unsafe fn provide(&mut self, buffer_ptrs: &[*mut u8]) -> Result<()> {
        if self.common.state != NodeState::Running {
            return Err(RmeError::new(
                ErrorKind::State,
                self.common.name.clone(),
                "provide() called while not running",
            ));
        }
        let native = self.driver.native_format();
        let native_bps = native.bytes_per_sample();
        let input = self.common.inputs[0].take();
        for (pad_index, &hw_index) in self.hardware_channels.iter().enumerate() {
            let dst = unsafe { std::slice::from_raw_parts_mut(buffer_ptrs[hw_index], self.block * native_bps) };
            match &input {
                Some(buffer) if pad_index < buffer.channels().channel_count() => {
                    let source_bps = buffer.format().bytes_per_sample();
                    let channel = buffer.channel_ptr(pad_index);
                    for frame in 0..self.block.min(buffer.frames()) {
                        let sample = decode_sample(&channel[frame * source_bps..], buffer.format());
                        let encoded = encode_sample(sample, native);
                        dst[frame * native_bps..(frame + 1) * native_bps].copy_from_slice(&encoded);
                    }
                }
                _ => dst.fill(0),
            }
        }
        Ok(())
    }
}

impl AudioNode for AsioSink {
    fn node_type(&self) -> NodeKind {
        NodeKind::AsioSink
    }

    fn name(&self) -> &str {
        &self.common.name
    }

    fn input_pads(&self) -> usize {
        1
    }

    fn output_pads(&self) -> usize {
        0
    }

    fn configure(
        &mut self,
        params: &NodeParams,
        _rate: u32,
        block: usize,
        _format: SampleFormat,
        _layout: &ChannelLayout,
    ) -> Result<()> {
        let spec = params.get("channels").ok_or_else(|| {
            RmeError::new(ErrorKind::Config, self.common.name.clone(), "missing 'channels' parameter")
        })?;
        let mut resolved = Vec::new();
        for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let index = if let Ok(n) = token.parse::<usize>() {
                n
            } else {
                self.driver.channel_index_by_name(token).ok_or_else(|| {
                    RmeError::new(
                        ErrorKind::Config,
                        self.common.name.clone(),
                        format!("unknown hardware channel '{token}'"),
                    )
                })?
            };
            if index >= self.driver.channel_count() {
                return Err(RmeError::new(
                    ErrorKind::Config,
                    self.common.name.clone(),
                    format!("channel index {index} out of range"),
                ));
            }
            resolved.push(index);
        }
        if resolved.is_empty() {
            return Err(RmeError::new(
                ErrorKind::Config,
                self.common.name.clone(),
                "'channels' must name at least one hardware channel",
            ));
        }
        self.hardware_channels = resolved;
        self.block = block;
        self.common.set_state(NodeState::Configured)
    }

    fn start(&mut self) -> Result<()> {
        self.common.set_state(NodeState::Running)
    }

    fn stop(&mut self) -> Result<()> {
        self.common.set_state(NodeState::Stopped)
    }

    fn process(&mut self) -> Result<()> {
        Ok(())
    }

    fn output(&self, _pad: usize) -> Option<AudioBuffer> {
        None
    }

    fn set_input(&mut self, pad: usize, buffer: AudioBuffer) -> Result<()> {
        *self.common.inputs.get_mut(pad).ok_or_else(|| {
            RmeError::new(ErrorKind::Range, self.common.name.clone(), "no such input pad")
        })? = Some(buffer);
        Ok(())
    }

    fn state(&self) -> NodeState {
        self.common.state
    }

    fn last_error(&self) -> Option<&str> {
        self.common.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asio::fake::FakeAsioDriver;
    use rme_buffer::StorageLayout;
    use std::collections::HashMap;

    fn driver() -> FakeAsioDriver {
        let mut names = HashMap::new();
        names.insert("out-1".to_string(), 0);
        FakeAsioDriver { format: SampleFormat::S16, names }
    }

    #[test]
    fn provide_writes_silence_when_no_input_arrived() {
        let mut node = AsioSink::new("hw-out", Box::new(driver()));
        let mut params = NodeParams::new();
        params.insert("channels".to_string(), "out-1".to_string());
        node.configure(&params, 48_000, 4, SampleFormat::F32, &ChannelLayout::mono()).unwrap();
        node.start().unwrap();
        let mut hw_buffer = vec![0xFFu8; 4 * 2];
        let ptrs = [hw_buffer.as_mut_ptr()];
        unsafe { node.provide(&ptrs).unwrap() };
        assert!(hw_buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn provide_converts_delivered_input_to_native_format() {
        let mut node = AsioSink::new("hw-out", Box::new(driver()));
        let mut params = NodeParams::new();
        params.insert("channels".to_string(), "0".to_string());
        node.configure(&params, 48_000, 2, SampleFormat::F32, &ChannelLayout::mono()).unwrap();
        node.start().unwrap();
        let input = AudioBuffer::new(2, 48_000, SampleFormat::F32, StorageLayout::Planar, ChannelLayout::mono()).unwrap();
        node.set_input(0, input).unwrap();
        let mut hw_buffer = vec![0xFFu8; 2 * 2];
        let ptrs = [hw_buffer.as_mut_ptr()];
        unsafe { node.provide(&ptrs).unwrap() };
        assert_eq!(hw_buffer, vec![0, 0, 0, 0]);
    }
}
