//! A stateless per-block transform: gain, sample-format conversion, and
//! channel remix, driven by a semicolon-separated string recipe such as
//! `"gain=-6;remix=2;reformat=s16"`.

use rme_buffer::{AudioBuffer, ChannelLayout, SampleFormat, StorageLayout};
use rme_core::{ErrorKind, Result, RmeError};

use crate::convert::{decode_sample, encode_sample};
use crate::node::{AudioNode, NodeCommon, NodeKind, NodeParams, NodeState};

#[derive(Debug, Clone, Copy)]
struct Recipe {
    gain_linear: f64,
    target_format: Option<SampleFormat>,
    target_channels: Option<usize>,
}

impl Recipe {
    fn parse(spec: &str, node_name: &str) -> Result<Self> {
        let mut recipe = Recipe { gain_linear: 1.0, target_format: None, target_channels: None };
        for directive in spec.split(';').map(str::trim).filter(|d| !d.is_empty()) {
            let (key, value) = directive.split_once('=').ok_or_else(|| {
                RmeError::new(ErrorKind::Config, node_name, format!("malformed recipe directive '{directive}'"))
            })?;
            match key.trim() {
                "gain" => {
                    let db: f64 = value.trim().parse().map_err(|_| {
                        RmeError::new(ErrorKind::Config, node_name, format!("invalid gain value '{value}'"))
                    })?;
                    recipe.gain_linear = 10f64.powf(db / 20.0);
                }
                "reformat" => {
                    recipe.target_format = Some(parse_format(value.trim(), node_name)?);
                }
                "remix" => {
                    let n: usize = value.trim().parse().map_err(|_| {
                        RmeError::new(ErrorKind::Config, node_name, format!("invalid remix channel count '{value}'"))
                    })?;
                    if n == 0 {
                        return Err(RmeError::new(ErrorKind::Config, node_name, "remix channel count must be nonzero"));
                    }
                    recipe.target_channels = Some(n);
                }
                other => {
                    return Err(RmeError::new(ErrorKind::Config, node_name, format!("unknown recipe directive '{other}'")));
                }
            }
        }
        Ok(recipe)
    }
}

fn parse_format(name: &str, node_name: &str) -> Result<SampleFormat> {
    match name.to_ascii_lowercase().as_str() {
        "s16" => Ok(SampleFormat::S16),
        "s24in32" => Ok(SampleFormat::S24in32),
        "s32" => Ok(SampleFormat::S32),
        "f32" => Ok(SampleFormat::F32),
        "f64" => Ok(SampleFormat::F64),
        other => Err(RmeError::new(ErrorKind::Config, node_name, format!("unknown sample format '{other}'"))),
    }
}

pub struct Processor {
    common: NodeCommon,
    recipe: Recipe,
    format: SampleFormat,
}

impl Processor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            common: NodeCommon::new(name, 1, 1),
            recipe: Recipe { gain_linear: 1.0, target_format: None, target_channels: None },
            format: SampleFormat::F32,
        }
    }
}

impl AudioNode for Processor {
    fn node_type(&self) -> NodeKind {
        NodeKind::Processor
    }

    fn name(&self) -> &str {
        &self.common.name
    }

    fn input_pads(&self) -> usize {
        1
    }

    fn output_pads(&self) -> usize {
        1
    }

    fn configure(
        &mut self,
        params: &NodeParams,
        _rate: u32,
        _block: usize,
        format: SampleFormat,
        _layout: &ChannelLayout,
    ) -> Result<()> {
        let spec = params.get("recipe").map(String::as_str).unwrap_or("");
        self.recipe = Recipe::parse(spec, &self.common.name)?;
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
        let Some(input) = self.common.inputs[0].take() else {
            self.common.outputs[0] = None;
            return Ok(());
        };
        let source_channels = input.channels().channel_count();
        let target_channels = self.recipe.target_channels.unwrap_or(source_channels);
        let target_format = self.recipe.target_format.unwrap_or(self.format);
        let frames = input.frames();
        let source_bps = input.format().bytes_per_sample();
        let out_bps = target_format.bytes_per_sample();

        let mut planes: Vec<Vec<u8>> = Vec::with_capacity(target_channels);
        for out_channel in 0..target_channels {
            let mut plane = vec![0u8; frames * out_bps];
            for frame in 0..frames {
                let sample = remix_sample(&input, frame, out_channel, source_channels, target_channels, source_bps);
                let gained = sample * self.recipe.gain_linear;
                let encoded = encode_sample(gained, target_format);
                plane[frame * out_bps..(frame + 1) * out_bps].copy_from_slice(&encoded);
            }
            planes.push(plane);
        }
        let output = AudioBuffer::from_planes(
            frames,
            input.rate(),
            target_format,
            StorageLayout::Planar,
            ChannelLayout::with_channel_count(target_channels),
            planes,
        )?;
        self.common.outputs[0] = Some(output);
        Ok(())
    }

    fn output(&self, pad: usize) -> Option<AudioBuffer> {
        self.common.outputs.get(pad).and_then(Clone::clone)
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

/// Maps an output channel to one or more source channels: identity when
/// channel counts match, averages the source's trailing channels into the
/// last output channel on downmix, duplicates the source's last channel on
/// upmix.
fn remix_sample(
    input: &AudioBuffer,
    frame: usize,
    out_channel: usize,
    source_channels: usize,
    target_channels: usize,
    source_bps: usize,
) -> f64 {
    if target_channels == source_channels {
        let bytes = input.channel_ptr(out_channel);
        return decode_sample(&bytes[frame * source_bps..], input.format());
    }
    if target_channels < source_channels && out_channel == target_channels - 1 {
        let extra: f64 = (out_channel..source_channels)
            .map(|c| decode_sample(&input.channel_ptr(c)[frame * source_bps..], input.format()))
            .sum();
        return extra / (source_channels - out_channel) as f64;
    }
    let source_channel = out_channel.min(source_channels - 1);
    decode_sample(&input.channel_ptr(source_channel)[frame * source_bps..], input.format())
}
