//! Shared error taxonomy for the RME bridge workspace.
//!
//! Every crate reports failures through [`ErrorKind`] so that the control
//! dispatcher can map a failure straight onto a numeric `/error` OSC reply
//! without re-classifying string messages at the boundary.

use core::fmt;

/// Broad error classes shared by the control plane and the audio plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid parameter string, unknown node type, ambiguous graph.
    Config,
    /// Allocation failure, file open failure, driver load failure.
    Resource,
    /// Malformed OSC, malformed SysEx, parity mismatch.
    Protocol,
    /// Value outside `[min, max]` or an unknown enum name.
    Range,
    /// Operation attempted in the wrong lifecycle state.
    State,
    /// Transient read/write failure on a transport or MIDI port.
    Io,
    /// The driver reported the device has disconnected.
    Fatal,
}

impl ErrorKind {
    /// The numeric code sent in `/error` OSC replies.
    pub const fn code(self) -> i32 {
        match self {
            ErrorKind::Config => 1,
            ErrorKind::Resource => 2,
            ErrorKind::Protocol => 3,
            ErrorKind::Range => 4,
            ErrorKind::State => 5,
            ErrorKind::Io => 6,
            ErrorKind::Fatal => 7,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Config => "config",
            ErrorKind::Resource => "resource",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Range => "range",
            ErrorKind::State => "state",
            ErrorKind::Io => "io",
            ErrorKind::Fatal => "fatal",
        };
        write!(f, "{s}")
    }
}

/// A classified error carrying a human-readable message and an optional
/// originating context (e.g. the OSC address or register that triggered it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RmeError {
    pub kind: ErrorKind,
    pub context: String,
    pub message: String,
}

impl RmeError {
    pub fn new(kind: ErrorKind, context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn config(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, context, message)
    }

    pub fn resource(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resource, context, message)
    }

    pub fn protocol(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, context, message)
    }

    pub fn range(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Range, context, message)
    }

    pub fn state(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::State, context, message)
    }

    pub fn io(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, context, message)
    }

    pub fn fatal(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, context, message)
    }
}

impl fmt::Display for RmeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.kind, self.context, self.message)
    }
}

impl std::error::Error for RmeError {}

/// Result type alias used across the workspace.
pub type Result<T> = core::result::Result<T, RmeError>;
