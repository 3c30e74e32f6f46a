//! # RME Graph
//!
//! The [`AudioNode`] contract, the concrete node kinds (`AsioSource`,
//! `AsioSink`, `FileSource`, `FileSink`, `Processor`), and [`AudioGraph`]:
//! connection bookkeeping, topological scheduling, and the two tick
//! schedulers (`HardwareDriven`, `SoftClocked`).

pub mod asio;
pub mod connection;
pub mod convert;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod scheduler;

pub use asio::AsioDriver;
pub use connection::Connection;
pub use graph::{AudioGraph, EngineState};
pub use node::{AudioNode, NodeId, NodeKind, NodeParams, NodeState};
pub use nodes::{AsioSink, AsioSource, FileSink, FileSource, Processor};
pub use scheduler::{HardwareDriven, SoftClocked};
