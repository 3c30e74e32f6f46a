//! A node that converts ASIO hardware input buffers into [`AudioBuffer`]s.

use rme_buffer::{AudioBuffer, ChannelLayout, SampleFormat, StorageLayout};
use rme_core::{ErrorKind, Result, RmeError};

use crate::asio::AsioDriver;
use crate::convert::decode_sample;
use crate::node::{AudioNode, NodeCommon, NodeKind, NodeParams, NodeState};

/// Reads hardware input channels off an [`AsioDriver`] and publishes them as
/// a single planar [`AudioBuffer`] on output pad `0`.
pub struct AsioSource {
    common: NodeCommon,
    driver: Box<dyn AsioDriver>,
    hardware_channels: Vec<usize>,
    rate: u32,
    block: usize,
    format: SampleFormat,
}

impl AsioSource {
    pub fn new(name: impl Into<String>, driver: Box<dyn AsioDriver>) -> Self {
        Self {
            common: NodeCommon::new(name, 0, 1),
            driver,
            hardware_channels: Vec::new(),
            rate: 0,
            block: 0,
            format: SampleFormat::F32,
        }
    }

    /// Convert the driver's raw per-channel buffers (native format, `block`
    /// frames each, indexed by hardware channel number) into one planar
    /// [`AudioBuffer`] and publish it. Called by production wiring from the
    /// driver's buffer-swap callback; `buffer_ptrs[c]` must point at
    /// `block * native_format().bytes_per_sample()` readable bytes.
    ///
    /// # Safety
    /// Callers must guarantee every pointer in `buffer_ptrs` is valid for
    /// `block` native-format samples for the duration of this call.
    pub unsafe fn receive(&mut self, buffer_ptrs: &[*const u8]) -> Result<()> {
        if self.common.state != NodeState::Running {
            return Err(RmeError::new(
                ErrorKind::State,
                self.common.name.clone(),
                "receive() called while not running",
            ));
        }
        let native = self.driver.native_format();
        let native_bps = native.bytes_per_sample();
        let out_bps = self.format.bytes_per_sample();
        let mut planes = Vec::with_capacity(self.hardware_channels.len());
        for &hw_index in &self.hardware_channels {
            let src = unsafe { std::slice::from_raw_parts(buffer_ptrs[hw_index], self.block * native_bps) };
            let mut plane = vec![0u8; self.block * out_bps];
            for frame in 0..self.block {
                let sample = decode_sample(&src[frame * native_bps..], native);
                let encoded = crate::convert::encode_sample(sample, self.format);
                plane[frame * out_bps..(frame + 1) * out_bps].copy_from_slice(&encoded);
            }
            planes.push(plane);
        }
        let buffer = AudioBuffer::from_planes(
            self.block,
            self.rate,
            self.format,
            StorageLayout::Planar,
            ChannelLayout::with_channel_count(self.hardware_channels.len()),
            planes,
        )?;
        self.common.outputs[0] = Some(buffer);
        Ok(())
    }
}

impl AudioNode for AsioSource {
    fn node_type(&self) -> NodeKind {
        NodeKind::AsioSource
    }

    fn name(&self) -> &str {
        &self.common.name
    }

    fn input_pads(&self) -> usize {
        0
    }

    fn output_pads(&self) -> usize {
        1
    }

    fn configure(
        &mut self,
        params: &NodeParams,
        rate: u32,
        block: usize,
        format: SampleFormat,
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
        self.rate = rate;
        self.block = block;
        self.format = format;
        self.common.set_state(NodeState::Configured)
    }

    fn start(&mut self) -> Result<()> {
        self.common.set_state(NodeState::Running)
    }

    fn stop(&mut self) -> Result<()> {
        self.common.set_state(NodeState::Stopped)
    }

    fn process(&mut self) -> Result<()> {
        // Output is populated by `receive()` from the driver callback; a
        // plain tick has nothing further to do.
        Ok(())
    }

    fn output(&self, pad: usize) -> Option<AudioBuffer> {
        self.common.outputs.get(pad).and_then(Clone::clone)
    }

    fn set_input(&mut self, _pad: usize, _buffer: AudioBuffer) -> Result<()> {
        Err(RmeError::new(ErrorKind::Config, self.common.name.clone(), "AsioSource has no input pads"))
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
    use std::collections::HashMap;

    fn driver() -> FakeAsioDriver {
        let mut names = HashMap::new();
        names.insert("in-1".to_string(), 0);
        names.insert("in-2".to_string(), 1);
        FakeAsioDriver { format: SampleFormat::S16, names }
    }

    fn configured_source() -> AsioSource {
        let mut node = AsioSource::new("hw-in", Box::new(driver()));
        let mut params = NodeParams::new();
        params.insert("channels".to_string(), "in-1,in-2".to_string());
        node.configure(&params, 48_000, 4, SampleFormat::F32, &ChannelLayout::stereo()).unwrap();
        node
    }

    #[test]
    fn configure_resolves_named_channels_via_the_driver() {
        let node = configured_source();
        assert_eq!(node.hardware_channels, vec![0, 1]);
        assert_eq!(node.state(), NodeState::Configured);
    }

    #[test]
    fn configure_rejects_unknown_channel_names() {
        let mut node = AsioSource::new("hw-in", Box::new(driver()));
        let mut params = NodeParams::new();
        params.insert("channels".to_string(), "nope".to_string());
        assert!(node.configure(&params, 48_000, 4, SampleFormat::F32, &ChannelLayout::stereo()).is_err());
    }

    #[test]
    fn receive_converts_native_format_into_configured_format() {
        let mut node = configured_source();
        node.start().unwrap();
        let silence = vec![0u8; 4 * 2]; // 4 frames, S16
        let ptrs = [silence.as_ptr(), silence.as_ptr()];
        unsafe { node.receive(&ptrs).unwrap() };
        let out = node.output(0).unwrap();
        assert_eq!(out.frames(), 4);
        assert_eq!(out.format(), SampleFormat::F32);
    }
}
