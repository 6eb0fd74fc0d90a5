//! Error types for the roof controller.

use std::time::Duration;

use ror_protocol::ProtocolError;
use thiserror::Error;

/// Failures of the byte-level serial link.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No byte arrived within the read timeout.
    #[error("timed out after {0:?} waiting for the roof controller")]
    Timeout(Duration),

    /// The underlying port or socket failed.
    #[error("roof control connection error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed by the other side.
    #[error("roof control connection closed")]
    Closed,
}

/// Errors from a protocol exchange with the roof controller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A request was attempted before the handshake succeeded.
    #[error("no contact with the roof controller has been established")]
    NoContact,

    /// The handshake failed twice.
    #[error("unable to contact the roof controller: {0}")]
    ContactFailed(String),

    /// The lock switch is on and the request does not override it.
    #[error("roof external lock state prevents roof movement")]
    Locked,

    /// The switch source cannot perform this request.
    #[error("{0} is not supported by this switch source")]
    Unsupported(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl SessionError {
    /// Whether this failure counts toward the communication error ceiling.
    ///
    /// Transport failures and protocol violations count. A well-formed
    /// `NAK` and purely local refusals do not.
    pub fn is_communication_failure(&self) -> bool {
        match self {
            SessionError::Transport(_) => true,
            SessionError::Protocol(e) => e.is_communication_failure(),
            SessionError::NoContact
            | SessionError::ContactFailed(_)
            | SessionError::Locked
            | SessionError::Unsupported(_) => false,
        }
    }
}

/// Errors from roof motion and control requests.
#[derive(Debug, Error)]
pub enum RoofError {
    /// The roof lock switch is on.
    #[error("roof is externally locked, no movement possible")]
    Locked,

    /// The dome's mount parking policy forbids closing.
    #[error("cannot close the roof while the mount is locking, see the telescope parking policy")]
    MountLocked,

    /// An open was requested with the opened limit switch on.
    #[error("open requested but the roof is already fully opened")]
    AlreadyOpen,

    /// A close was requested with the closed limit switch on.
    #[error("close requested but the roof is already fully closed")]
    AlreadyClosed,

    /// No session with the roof controller.
    #[error("not connected to the roof controller")]
    NotConnected,

    /// The requested auxiliary action was not advertised at handshake.
    #[error("action {0} is not supported by the roof controller")]
    UnknownAction(u8),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The exchange with the controller failed.
    #[error("failed to operate the roof controller: {0}")]
    Controller(#[from] SessionError),
}

impl RoofError {
    /// Whether the request was refused locally without any I/O.
    pub fn is_safety_veto(&self) -> bool {
        matches!(
            self,
            RoofError::Locked
                | RoofError::MountLocked
                | RoofError::AlreadyOpen
                | RoofError::AlreadyClosed
        )
    }
}
