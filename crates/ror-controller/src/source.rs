//! Where switch readings come from.
//!
//! The motion controller never talks to a transport directly. It reads
//! switches and pushes buttons through a [`SwitchSource`], chosen once when
//! the controller is built: a [`ControllerSession`] for real hardware or a
//! [`SimulatedRoof`] for running without one. Motion and status logic are
//! identical in both cases.

use std::time::{Duration, Instant};

use ror_protocol::{Button, Switch};
use tracing::{debug, info};

use crate::error::SessionError;
use crate::motion::Direction;
use crate::session::ControllerSession;
use crate::transport::Transport;

/// A source of switch readings and sink for button pushes.
pub trait SwitchSource {
    /// Establish contact.
    fn connect(&mut self) -> Result<(), SessionError>;

    /// Drop contact and reset negotiated state and error counters.
    fn disconnect(&mut self);

    /// Whether contact is established.
    fn is_connected(&self) -> bool;

    /// Number of auxiliary actions available.
    fn supported_actions(&self) -> u8;

    /// Consecutive failed exchanges.
    fn communication_errors(&self) -> u32;

    /// Read a switch.
    fn read_switch(&mut self, switch: Switch) -> Result<bool, SessionError>;

    /// Push a button, refusing while locked unless `ignore_lock` is set.
    fn push_button(&mut self, button: Button, on: bool, ignore_lock: bool)
        -> Result<(), SessionError>;

    /// Called with the current time at the start of every status refresh.
    fn advance(&mut self, _now: Instant) {}
}

impl<T: Transport> SwitchSource for ControllerSession<T> {
    fn connect(&mut self) -> Result<(), SessionError> {
        let handshake = self.handshake()?;
        info!(
            "Roof controller {} connected, {} actions",
            handshake.version, handshake.actions
        );
        Ok(())
    }

    fn disconnect(&mut self) {
        self.teardown();
    }

    fn is_connected(&self) -> bool {
        self.is_contact_established()
    }

    fn supported_actions(&self) -> u8 {
        ControllerSession::supported_actions(self)
    }

    fn communication_errors(&self) -> u32 {
        self.consecutive_errors()
    }

    fn read_switch(&mut self, switch: Switch) -> Result<bool, SessionError> {
        self.query_switch(switch)
    }

    fn push_button(
        &mut self,
        button: Button,
        on: bool,
        ignore_lock: bool,
    ) -> Result<(), SessionError> {
        ControllerSession::push_button(self, button, on, ignore_lock)
    }
}

impl<S: SwitchSource + ?Sized> SwitchSource for Box<S> {
    fn connect(&mut self) -> Result<(), SessionError> {
        (**self).connect()
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn supported_actions(&self) -> u8 {
        (**self).supported_actions()
    }

    fn communication_errors(&self) -> u32 {
        (**self).communication_errors()
    }

    fn read_switch(&mut self, switch: Switch) -> Result<bool, SessionError> {
        (**self).read_switch(switch)
    }

    fn push_button(
        &mut self,
        button: Button,
        on: bool,
        ignore_lock: bool,
    ) -> Result<(), SessionError> {
        (**self).push_button(button, on, ignore_lock)
    }

    fn advance(&mut self, now: Instant) {
        (**self).advance(now)
    }
}

/// A roof with no hardware behind it.
///
/// Open and close take a fixed travel time, after which the matching limit
/// switch turns on. There is no lock, auxiliary output or action support.
#[derive(Debug, Clone)]
pub struct SimulatedRoof {
    connected: bool,
    opened: bool,
    closed: bool,
    travel: Duration,
    motion: Option<(Direction, Instant)>,
    now: Option<Instant>,
}

impl SimulatedRoof {
    /// A closed roof taking `travel` to move between limits.
    pub fn new(travel: Duration) -> Self {
        SimulatedRoof {
            connected: false,
            opened: false,
            closed: true,
            travel,
            motion: None,
            now: None,
        }
    }

    /// Whether the simulated roof is travelling.
    pub fn is_moving(&self) -> bool {
        self.motion.is_some()
    }

    fn start(&mut self, direction: Direction) {
        let now = self.now.unwrap_or_else(Instant::now);
        // The limit switch being left releases as soon as the roof moves.
        match direction {
            Direction::Open => self.closed = false,
            Direction::Close => self.opened = false,
        }
        self.motion = Some((direction, now));
        debug!("Simulated roof {}", direction.progressive());
    }
}

impl SwitchSource for SimulatedRoof {
    fn connect(&mut self) -> Result<(), SessionError> {
        self.connected = true;
        info!("Simulated roof connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.motion = None;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn supported_actions(&self) -> u8 {
        0
    }

    fn communication_errors(&self) -> u32 {
        0
    }

    fn read_switch(&mut self, switch: Switch) -> Result<bool, SessionError> {
        if !self.connected {
            return Err(SessionError::NoContact);
        }
        Ok(match switch {
            Switch::Opened => self.opened,
            Switch::Closed => self.closed,
            Switch::Locked | Switch::Auxiliary | Switch::ActionState(_) => false,
        })
    }

    fn push_button(
        &mut self,
        button: Button,
        on: bool,
        _ignore_lock: bool,
    ) -> Result<(), SessionError> {
        if !self.connected {
            return Err(SessionError::NoContact);
        }
        match button {
            Button::Open if on => self.start(Direction::Open),
            Button::Close if on => self.start(Direction::Close),
            Button::Abort => self.motion = None,
            Button::Open | Button::Close => {}
            Button::Lock | Button::Auxiliary | Button::ActionCommand(_) => {
                return Err(SessionError::Unsupported(format!(
                    "{} in simulation",
                    button.as_str()
                )));
            }
        }
        Ok(())
    }

    fn advance(&mut self, now: Instant) {
        self.now = Some(now);
        if let Some((direction, started)) = self.motion {
            if now.saturating_duration_since(started) >= self.travel {
                self.opened = direction == Direction::Open;
                self.closed = direction == Direction::Close;
                self.motion = None;
                debug!("Simulated roof reached its {} limit", direction);
            }
        }
    }
}
