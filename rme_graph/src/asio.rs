//! The [`AsioDriver`] collaborator contract: the hardware boundary that
//! `AsioSource`/`AsioSink` nodes convert to and from. No concrete ASIO
//! binding lives in this crate; production wiring supplies one.

use rme_buffer::SampleFormat;
use rme_core::Result;

/// The subset of driver behavior an `AsioSource`/`AsioSink` node needs:
/// resolving named channels and reporting the driver's native format.
pub trait AsioDriver: Send {
    /// The driver's native sample format on the wire, before conversion to
    /// a node's internal format.
    fn native_format(&self) -> SampleFormat;

    /// Total hardware channel count the driver exposes.
    fn channel_count(&self) -> usize;

    /// Resolve a channel name to its hardware index, via the driver's name
    /// table, for `AsioSource`/`AsioSink` parameters that name channels
    /// instead of indexing them numerically.
    fn channel_index_by_name(&self, name: &str) -> Option<usize>;

    /// Register a buffer-ready callback the driver invokes once per
    /// double-buffer swap with the active buffer index.
    fn set_callback(&mut self, callback: Box<dyn FnMut(usize) + Send>) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::HashMap;

    pub struct FakeAsioDriver {
        pub format: SampleFormat,
        pub names: HashMap<String, usize>,
    }

    impl AsioDriver for FakeAsioDriver {
        fn native_format(&self) -> SampleFormat {
            self.format
        }

        fn channel_count(&self) -> usize {
            self.names.len()
        }

        fn channel_index_by_name(&self, name: &str) -> Option<usize> {
            self.names.get(name).copied()
        }

        fn set_callback(&mut self, _callback: Box<dyn FnMut(usize) + Send>) -> Result<()> {
            Ok(())
        }
    }
}
