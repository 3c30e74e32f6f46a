//! The control plane's command router: turns inbound OSC into register
//! writes against the device, and implements the non-parameter commands
//! (`/dump`, `/dump/save`, `/refresh`) plus wildcard discovery queries.

mod dispatcher;
mod glob;
mod snapshot;

pub use dispatcher::ControlDispatcher;
pub use glob::glob_match;
pub use snapshot::DeviceInfo;
