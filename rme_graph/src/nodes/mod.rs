//! Concrete [`crate::AudioNode`] implementations, one per [`crate::NodeKind`].

pub mod asio_sink;
pub mod asio_source;
pub mod file_sink;
pub mod file_source;
pub mod processor;

pub use asio_sink::AsioSink;
pub use asio_source::AsioSource;
pub use file_sink::FileSink;
pub use file_source::FileSource;
pub use processor::Processor;
