//! # RME OSC
//!
//! The client-facing half of the control plane: the OSC 1.1 wire codec
//! (message framing, bundle flattening), address-grammar validation, the
//! `udp!<host>!<port>` address URI, and the [`Transport`] collaborator
//! contract through which the rest of the system sends and receives OSC
//! packets without depending on a concrete socket type.

pub mod address;
pub mod codec;
pub mod transport;

pub use address::AddressUri;
pub use codec::{OscCodec, MAX_PACKET_SIZE};
pub use transport::{Transport, UdpTransport};

pub use rosc::{OscMessage, OscType};
