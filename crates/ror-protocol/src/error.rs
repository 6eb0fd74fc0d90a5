//! Error types for the roof controller protocol.

use thiserror::Error;

use crate::codec::Frame;

/// Errors that can occur when working with the roof controller protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The incoming byte stream violated the framing rules.
    ///
    /// `response` is the canned `(NAK:NONE:OFF)` frame handed to callers in
    /// place of an indeterminate result.
    #[error("received communication protocol not valid ({reason}): {raw}")]
    InvalidFrame {
        /// Which framing rule was broken.
        reason: FrameViolation,
        /// The bytes accepted before rejection, lossily decoded.
        raw: String,
        /// Synthesized response for the caller.
        response: Frame,
    },

    /// An outgoing line would exceed the maximum line length.
    #[error("command message too long: max {max} bytes, got {actual}")]
    LineTooLong { max: usize, actual: usize },

    /// A frame was well formed but could not be split into fields.
    #[error("failed to parse frame: {0}")]
    Malformed(String),

    /// The controller answered with a verb this side does not understand.
    #[error("unrecognized response from roof controller: {0}")]
    UnrecognizedResponse(String),

    /// The controller refused the request with a `NAK`.
    #[error("negative response from roof controller: {category}: {message}")]
    Rejected {
        /// Error category reported in the target field.
        category: String,
        /// Diagnostic text reported in the value field.
        message: String,
    },
}

impl ProtocolError {
    /// Whether this error means the channel itself misbehaved.
    ///
    /// A `Rejected` response proves the channel works, so it does not
    /// count toward the communication error ceiling.
    pub fn is_communication_failure(&self) -> bool {
        !matches!(self, ProtocolError::Rejected { .. })
    }
}

/// The framing rule a rejected byte stream broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameViolation {
    /// More bytes than the value field allows since the start marker.
    TooLong,
    /// Bytes arrived without a start marker.
    MissingStart,
    /// The command field boundary passed with no delimiter.
    CommandTooLong,
    /// The target field boundary passed with fewer than two delimiters.
    TargetTooLong,
    /// An end marker arrived without exactly two delimiters.
    BadDelimiters,
}

impl std::fmt::Display for FrameViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameViolation::TooLong => write!(f, "frame too long"),
            FrameViolation::MissingStart => write!(f, "missing start marker"),
            FrameViolation::CommandTooLong => write!(f, "command field too long"),
            FrameViolation::TargetTooLong => write!(f, "target field too long"),
            FrameViolation::BadDelimiters => write!(f, "wrong number of delimiters"),
        }
    }
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
