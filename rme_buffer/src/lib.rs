//! # RME Buffer
//!
//! The shared [`AudioBuffer`] type carried along every connection in the
//! processing graph: planar or interleaved PCM storage, shared ownership so a
//! fan-out connection can hand the same block to several sinks without
//! copying, and zero-copy sub-range views.

pub mod buffer;
pub mod format;
pub mod layout;

pub use buffer::{AudioBuffer, StorageLayout};
pub use format::SampleFormat;
pub use layout::{ChannelLayout, ChannelRole};
