//! # RME Core
//!
//! Foundational, dependency-free utilities shared by every crate in the
//! workspace: the error taxonomy shared by the control plane and the audio
//! plane, and a lock-free single-producer/single-consumer block queue for
//! realtime-thread-safe message passing.

pub mod error;
pub mod spsc;

pub use error::{ErrorKind, Result, RmeError};
pub use spsc::{BlockQueue, Consumer, Producer};
