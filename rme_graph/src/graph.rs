//! [`AudioGraph`]: owns the node set and connections, computes a stable
//! processing order, and runs the per-tick routine.

use rme_core::{ErrorKind, Result, RmeError};

use crate::connection::Connection;
use crate::node::{AudioNode, NodeId, NodeKind};

/// Whether the graph is idle or actively ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
}

/// A node's scheduling category, used only to break topological-sort ties
/// the way the spec orders siblings: sources, then processors, then sinks.
fn category_rank(kind: NodeKind) -> u8 {
    match kind {
        NodeKind::AsioSource | NodeKind::FileSource => 0,
        NodeKind::Processor => 1,
        NodeKind::AsioSink | NodeKind::FileSink => 2,
    }
}

struct Slot {
    node: Box<dyn AudioNode>,
    insertion_index: usize,
}

/// Owns every node and connection in one audio processing graph, and the
/// processing order computed from them.
pub struct AudioGraph {
    nodes: Vec<Slot>,
    connections: Vec<Connection>,
    order: Vec<NodeId>,
    state: EngineState,
}

impl AudioGraph {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), connections: Vec::new(), order: Vec::new(), state: EngineState::Idle }
    }

    pub fn add_node(&mut self, node: Box<dyn AudioNode>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Slot { node, insertion_index: id.0 });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn AudioNode> {
        self.nodes.get(id.0).map(|s| s.node.as_ref())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut (dyn AudioNode + '_)> {
        match self.nodes.get_mut(id.0) {
            Some(s) => Some(s.node.as_mut()),
            None => None,
        }
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Records a connection. Rejects a second connection into an input pad
    /// that already has one (fan-in of at most one); fan-out is unrestricted.
    pub fn connect(&mut self, from: NodeId, from_pad: usize, to: NodeId, to_pad: usize) -> Result<()> {
        if self.nodes.get(from.0).is_none() || self.nodes.get(to.0).is_none() {
            return Err(RmeError::new(ErrorKind::Range, "AudioGraph::connect", "unknown node id"));
        }
        if self.connections.iter().any(|c| c.to == to && c.to_pad == to_pad) {
            return Err(RmeError::new(
                ErrorKind::Config,
                "AudioGraph::connect",
                format!("input pad {to_pad} on node {} already has a source", to.0),
            ));
        }
        self.connections.push(Connection::new(from, from_pad, to, to_pad));
        Ok(())
    }

    /// Computes the processing order via Kahn's algorithm: among nodes
    /// whose predecessors have all been ordered, picks by ascending
    /// `(category_rank, insertion_index)` so sources precede processors
    /// precede sinks, and siblings within a category keep insertion order.
    pub fn compute_order(&mut self) -> Result<()> {
        let n = self.nodes.len();
        let mut indegree = vec![0usize; n];
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for c in &self.connections {
            adjacency[c.from.0].push(c.to.0);
            indegree[c.to.0] += 1;
        }

        let mut ready: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        let mut remaining_indegree = indegree.clone();

        while !ready.is_empty() {
            ready.sort_by_key(|&i| {
                (category_rank(self.nodes[i].node.node_type()), self.nodes[i].insertion_index)
            });
            let next = ready.remove(0);
            order.push(NodeId(next));
            for &dst in &adjacency[next] {
                remaining_indegree[dst] -= 1;
                if remaining_indegree[dst] == 0 {
                    ready.push(dst);
                }
            }
        }

        if order.len() != n {
            return Err(RmeError::new(
                ErrorKind::Config,
                "AudioGraph::compute_order",
                "graph contains a cycle; not every node could be ordered",
            ));
        }
        self.order = order;
        Ok(())
    }

    /// Runs one processing tick: `process()` on every node in order, then
    /// transfers each connection's buffer from source output to
    /// destination input, in declaration order. Individual node failures
    /// are logged and do not abort the tick.
    pub fn tick(&mut self) -> Result<()> {
        if self.order.len() != self.nodes.len() {
            return Err(RmeError::new(
                ErrorKind::State,
                "AudioGraph::tick",
                "processing order not computed; call compute_order() before start",
            ));
        }
        for &id in &self.order {
            if let Some(slot) = self.nodes.get_mut(id.0) {
                if let Err(e) = slot.node.process() {
                    log::error!("{}: process() failed: {e}", slot.node.name());
                }
            }
        }
        for connection in &self.connections {
            let buffer = self.nodes.get(connection.from.0).and_then(|s| s.node.output(connection.from_pad));
            if let Some(buffer) = buffer {
                if let Some(slot) = self.nodes.get_mut(connection.to.0) {
                    if let Err(e) = slot.node.set_input(connection.to_pad, buffer) {
                        log::error!("{}: set_input() failed: {e}", slot.node.name());
                    }
                }
            }
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.compute_order()?;
        for &id in &self.order {
            self.nodes[id.0].node.start()?;
        }
        self.state = EngineState::Running;
        Ok(())
    }

    /// Idempotent. Stops nodes in reverse processing order so sinks flush
    /// before their upstream sources stop feeding them.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == EngineState::Idle {
            return Ok(());
        }
        for &id in self.order.iter().rev() {
            if let Err(e) = self.nodes[id.0].node.stop() {
                log::error!("{}: stop() failed: {e}", self.nodes[id.0].node.name());
            }
        }
        self.state = EngineState::Idle;
        Ok(())
    }

    /// Whether every `FileSource` node in the graph has reported exhaustion,
    /// the condition under which a `SoftClocked` scheduler self-terminates.
    /// A graph with no `FileSource` nodes never self-terminates this way.
    pub fn all_file_sources_exhausted(&self) -> bool {
        let mut saw_one = false;
        for slot in &self.nodes {
            if slot.node.node_type() == NodeKind::FileSource {
                saw_one = true;
                if !slot.node.is_finished() {
                    return false;
                }
            }
        }
        saw_one
    }
}

impl Default for AudioGraph {
    fn default() -> Self {
        Self::new()
    }
}
