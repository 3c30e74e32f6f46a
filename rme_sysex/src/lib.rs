//! # RME SysEx
//!
//! The device-bound SysEx wire codec: base-128 packing, the 32-bit
//! parity-guarded register word, frame framing/validation, and the
//! [`SysexCodec`] that ties them together for register writes and
//! level-meter classes.

pub mod base128;
pub mod codec;
pub mod frame;
pub mod register;

pub use codec::{SysexCodec, SysexMessage, MANUFACTURER_ID};
pub use frame::SysexFrame;
pub use register::RegisterWord;
