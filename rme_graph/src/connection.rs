//! A directed edge between two [`crate::AudioNode`] pads.

use crate::node::NodeId;

/// Connects `from`'s output pad to `to`'s input pad. An input pad may have
/// at most one incoming connection (fan-in of one); an output pad may feed
/// any number of connections (fan-out is unrestricted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub from: NodeId,
    pub from_pad: usize,
    pub to: NodeId,
    pub to_pad: usize,
}

impl Connection {
    pub fn new(from: NodeId, from_pad: usize, to: NodeId, to_pad: usize) -> Self {
        Self { from, from_pad, to, to_pad }
    }
}
