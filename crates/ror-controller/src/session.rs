//! Request/response session with the roof controller.
//!
//! The session owns the contact status, the action count negotiated at
//! handshake and the consecutive communication error counter. Exactly one
//! exchange is in flight at a time: a request line is written and the
//! response frame is read back before the call returns.

use std::thread;

use ror_protocol::{Button, Frame, FrameReader, Handshake, ProtocolError, Request, Response, Switch};
use tracing::{debug, error, trace, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::transport::Transport;

/// A session with one roof controller over a [`Transport`].
pub struct ControllerSession<T> {
    transport: T,
    config: SessionConfig,
    reader: FrameReader,

    // Negotiated state
    contact: bool,
    actions: u8,
    version: Option<String>,

    // Accounting
    consecutive_errors: u32,
}

impl<T: Transport> ControllerSession<T> {
    /// Create a session. No I/O happens until [`handshake`](Self::handshake).
    pub fn new(transport: T, config: SessionConfig) -> Self {
        ControllerSession {
            transport,
            config,
            reader: FrameReader::new(),
            contact: false,
            actions: 0,
            version: None,
            consecutive_errors: 0,
        }
    }

    /// Whether the handshake has succeeded.
    pub fn is_contact_established(&self) -> bool {
        self.contact
    }

    /// Number of auxiliary actions advertised by the controller.
    pub fn supported_actions(&self) -> u8 {
        self.actions
    }

    /// Firmware version reported at handshake.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Consecutive failed exchanges.
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Frames rejected by the reader since the session was created or torn down.
    pub fn rejected_frames(&self) -> u32 {
        self.reader.rejected()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Establish contact with the controller.
    ///
    /// A failed first attempt is retried once after a short delay, which
    /// covers a controller still resetting after a firmware upload.
    pub fn handshake(&mut self) -> Result<Handshake, SessionError> {
        match self.initial_contact() {
            Ok(handshake) => Ok(handshake),
            Err(first) => {
                warn!("Initial controller contact failed, retrying: {}", first);
                thread::sleep(self.config.handshake_retry_delay());
                self.initial_contact().map_err(|e| {
                    error!("Unable to contact the roof controller: {}", e);
                    SessionError::ContactFailed(e.to_string())
                })
            }
        }
    }

    fn initial_contact(&mut self) -> Result<Handshake, SessionError> {
        self.contact = false;
        self.actions = 0;
        self.version = None;

        let result = self.exchange(Request::Connect).and_then(|frame| {
            match Response::interpret(&frame)? {
                Response::Handshake(handshake) => Ok(handshake),
                Response::Switch(_) => Err(ProtocolError::Malformed(format!(
                    "expected a handshake acknowledgement, got {}",
                    frame
                ))
                .into()),
            }
        });
        let handshake = self.account(result)?;

        debug!(
            "Remote version: {}, actions: {}",
            handshake.version, handshake.actions
        );
        self.contact = true;
        self.actions = handshake.actions;
        self.version = Some(handshake.version.clone());
        Ok(handshake)
    }

    /// Read the current value of a switch.
    pub fn query_switch(&mut self, switch: Switch) -> Result<bool, SessionError> {
        if !self.contact {
            warn!("No contact with the roof controller has been established");
            return Err(SessionError::NoContact);
        }

        let result = self
            .exchange(Request::Get(switch))
            .and_then(|frame| Ok(Response::interpret(&frame)?.is_on()));
        self.account(result)
    }

    /// Push a button on the controller.
    ///
    /// The lock switch is re-read first since it may have changed since the
    /// last poll. Returns whether the write and the acknowledgement read
    /// succeeded, not whether the roof physically responded.
    pub fn push_button(
        &mut self,
        button: Button,
        on: bool,
        ignore_lock: bool,
    ) -> Result<(), SessionError> {
        if !self.contact {
            warn!("No contact with the roof controller has been established");
            return Err(SessionError::NoContact);
        }

        let locked = self.query_switch(Switch::Locked);
        if !ignore_lock {
            match locked {
                Ok(false) => {}
                Ok(true) => {
                    warn!("Roof external lock state prevents roof movement");
                    return Err(SessionError::Locked);
                }
                Err(e) => {
                    warn!("Unable to confirm the roof lock state, {} not pushed: {}", button.as_str(), e);
                    return Err(e);
                }
            }
        }

        let request = Request::Set(button, on);
        debug!("Button pushed: {}", request.to_frame());
        let settle = self.config.settle_delay();
        let result = self.send(request).and_then(|_| {
            thread::sleep(settle);
            self.receive()
        });
        let frame = self.account(result)?;

        match Response::interpret(&frame) {
            Ok(response) => debug!("{} acknowledged: {:?}", button.as_str(), response),
            Err(e) => warn!("{} response: {}", button.as_str(), e),
        }
        Ok(())
    }

    /// Drop contact and reset all negotiated state and counters.
    pub fn teardown(&mut self) {
        self.contact = false;
        self.actions = 0;
        self.version = None;
        self.consecutive_errors = 0;
        self.reader.clear();
        self.reader.reset_rejected();
        if let Err(e) = self.transport.reset() {
            warn!("Failed to reset the roof controller link: {}", e);
        }
    }

    fn exchange(&mut self, request: Request) -> Result<Frame, SessionError> {
        self.send(request)?;
        self.receive()
    }

    fn send(&mut self, request: Request) -> Result<(), SessionError> {
        let line = request.encode().map_err(|e| {
            error!("Roof controller command message too long: {}", e);
            e
        })?;
        trace!("Sent to roof controller: {}", String::from_utf8_lossy(&line));
        self.transport.discard_input()?;
        self.transport.write_line(&line)?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Frame, SessionError> {
        let timeout = self.config.read_timeout();
        let transport = &mut self.transport;
        let frame = self
            .reader
            .read_frame(|| transport.read_byte(timeout).map_err(SessionError::from))?;
        trace!("Received from roof controller: {}", frame);
        Ok(frame)
    }

    /// Update the consecutive error counter from the outcome of an exchange.
    fn account<R>(&mut self, result: Result<R, SessionError>) -> Result<R, SessionError> {
        match &result {
            Ok(_) => self.consecutive_errors = 0,
            Err(e) if e.is_communication_failure() => {
                self.consecutive_errors += 1;
                warn!(
                    "Roof controller communication error {}: {}",
                    self.consecutive_errors, e
                );
            }
            Err(e) => debug!("Roof controller refused request: {}", e),
        }
        result
    }
}
