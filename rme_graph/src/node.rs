//! The [`AudioNode`] contract common to every vertex in an [`crate::AudioGraph`].

use std::collections::HashMap;

use rme_buffer::{AudioBuffer, ChannelLayout, SampleFormat};
use rme_core::Result;

/// Identifies a node within a single [`crate::AudioGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A node's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    AsioSource,
    AsioSink,
    FileSource,
    FileSink,
    Processor,
}

/// A node's position in its configure/start/stop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Unconfigured,
    Configured,
    Running,
    Stopped,
}

impl NodeState {
    /// Whether `next` is a legal transition from `self`.
    pub fn can_transition_to(self, next: NodeState) -> bool {
        use NodeState::*;
        matches!(
            (self, next),
            (Unconfigured, Configured)
                | (Configured, Running)
                | (Running, Stopped)
                | (Stopped, Configured)
        )
    }
}

/// Free-form construction parameters for a node, as parsed from the
/// declarative graph description (e.g. `path`, `loop`, channel lists).
pub type NodeParams = HashMap<String, String>;

/// Common contract every graph vertex implements: lifecycle transitions,
/// per-tick processing, and pad-indexed buffer exchange.
pub trait AudioNode: Send {
    fn node_type(&self) -> NodeKind;
    fn name(&self) -> &str;

    fn input_pads(&self) -> usize;
    fn output_pads(&self) -> usize;

    /// Unconfigured -> Configured, or Stopped -> Configured (reconfigure).
    fn configure(
        &mut self,
        params: &NodeParams,
        rate: u32,
        block: usize,
        format: SampleFormat,
        layout: &ChannelLayout,
    ) -> Result<()>;

    /// Configured -> Running.
    fn start(&mut self) -> Result<()>;

    /// Running -> Stopped. Idempotent.
    fn stop(&mut self) -> Result<()>;

    /// Run one processing tick. Reads whatever inputs were delivered via
    /// `set_input` since the last tick and publishes fresh outputs.
    fn process(&mut self) -> Result<()>;

    /// The most recently published buffer on output pad `pad`, if any.
    fn output(&self, pad: usize) -> Option<AudioBuffer>;

    /// Deliver a buffer to input pad `pad` ahead of the next `process()`.
    fn set_input(&mut self, pad: usize, buffer: AudioBuffer) -> Result<()>;

    fn state(&self) -> NodeState;

    /// The last error message recorded by this node, if any.
    fn last_error(&self) -> Option<&str>;

    /// Whether this node has reached a terminal condition a `SoftClocked`
    /// scheduler should treat as "done" (e.g. a non-looping `FileSource` at
    /// EOF). Nodes that never finish on their own use the default.
    fn is_finished(&self) -> bool {
        false
    }
}

/// Shared bookkeeping (name, lifecycle state, last-error string, input/output
/// pad storage) reused by every concrete node so each one only implements
/// its own `configure`/`process` behavior.
pub(crate) struct NodeCommon {
    pub name: String,
    pub state: NodeState,
    pub last_error: Option<String>,
    pub inputs: Vec<Option<AudioBuffer>>,
    pub outputs: Vec<Option<AudioBuffer>>,
}

impl NodeCommon {
    pub fn new(name: impl Into<String>, input_pads: usize, output_pads: usize) -> Self {
        Self {
            name: name.into(),
            state: NodeState::Unconfigured,
            last_error: None,
            inputs: vec![None; input_pads],
            outputs: vec![None; output_pads],
        }
    }

    pub fn set_state(&mut self, next: NodeState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(rme_core::RmeError::new(
                rme_core::ErrorKind::State,
                self.name.clone(),
                format!("illegal transition {:?} -> {:?}", self.state, next),
            ));
        }
        self.state = next;
        Ok(())
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }
}
