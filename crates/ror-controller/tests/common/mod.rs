//! Scripted roof controller for integration tests.
//!
//! `FakeController` implements `Transport` and answers the wire protocol
//! from shared switch state, recording every line written. Faults queued
//! with `inject` replace the answer to the next request.

#![allow(dead_code)]

use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ror_controller::{Clock, SessionConfig, Transport, TransportError};
use ror_protocol::{Button, Frame, Switch, Verb};

/// Replacement for the next answer.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Answer nothing; the read times out.
    Silent,
    /// Answer with these raw bytes.
    Raw(Vec<u8>),
    /// Answer with a NAK.
    Nak,
}

/// Switch state and traffic of the fake controller.
#[derive(Debug)]
pub struct ControllerState {
    pub opened: bool,
    pub closed: bool,
    pub locked: bool,
    pub auxiliary: bool,
    pub actions: [bool; 8],
    pub version: String,
    pub written: Vec<String>,
    pub faults: VecDeque<Fault>,
    pub pending: VecDeque<u8>,
    pub discards: u32,
    pub resets: u32,
}

impl Default for ControllerState {
    fn default() -> Self {
        ControllerState {
            opened: false,
            closed: true,
            locked: false,
            auxiliary: false,
            actions: [false; 8],
            version: "V1.3-0[ACT3]".to_string(),
            written: Vec::new(),
            faults: VecDeque::new(),
            pending: VecDeque::new(),
            discards: 0,
            resets: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeController(Rc<RefCell<ControllerState>>);

impl FakeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RefMut<'_, ControllerState> {
        self.0.borrow_mut()
    }

    /// Queue faults for the next `count` requests.
    pub fn inject(&self, fault: Fault, count: usize) {
        let mut state = self.state();
        for _ in 0..count {
            state.faults.push_back(fault.clone());
        }
    }

    pub fn written(&self) -> Vec<String> {
        self.0.borrow().written.clone()
    }

    /// Lines written with the `SET` verb.
    pub fn sets(&self) -> Vec<String> {
        self.written()
            .into_iter()
            .filter(|line| line.starts_with("(SET:"))
            .collect()
    }

    pub fn clear_written(&self) {
        self.state().written.clear();
    }

    fn answer(state: &mut ControllerState, request: &Frame) -> String {
        match request.verb {
            Verb::Connect => format!("(ACK:0:{})", state.version),
            Verb::Get => match Switch::from_wire(&request.target) {
                Some(switch) => {
                    let on = match switch {
                        Switch::Opened => state.opened,
                        Switch::Closed => state.closed,
                        Switch::Locked => state.locked,
                        Switch::Auxiliary => state.auxiliary,
                        Switch::ActionState(action) => {
                            state.actions[usize::from(action.number() - 1)]
                        }
                    };
                    format!("(ACK:{}:{})", request.target, if on { "ON" } else { "OFF" })
                }
                None => "(NAK:ERROR:UNKNOWN)".to_string(),
            },
            Verb::Set => {
                let on = request.value == "ON";
                match Button::from_wire(&request.target) {
                    Some(Button::Open) if on => state.closed = false,
                    Some(Button::Close) if on => state.opened = false,
                    Some(Button::Lock) => state.locked = on,
                    Some(Button::Auxiliary) => state.auxiliary = on,
                    Some(Button::ActionCommand(action)) => {
                        state.actions[usize::from(action.number() - 1)] = on
                    }
                    Some(_) => {}
                    None => return "(NAK:ERROR:UNKNOWN)".to_string(),
                }
                format!("(ACK:{}:{})", request.target, request.value)
            }
            Verb::Ack | Verb::Nak => "(NAK:ERROR:UNEXPECTED)".to_string(),
        }
    }
}

impl Transport for FakeController {
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, TransportError> {
        self.state()
            .pending
            .pop_front()
            .ok_or(TransportError::Timeout(timeout))
    }

    fn write_line(&mut self, line: &[u8]) -> Result<(), TransportError> {
        let text = String::from_utf8_lossy(line).to_string();
        let mut state = self.state();
        state.written.push(text.clone());

        let reply = match state.faults.pop_front() {
            Some(Fault::Silent) => return Ok(()),
            Some(Fault::Raw(bytes)) => bytes,
            Some(Fault::Nak) => b"(NAK:ERROR:BUSY)".to_vec(),
            None => match Frame::parse(&text) {
                Ok(request) => Self::answer(&mut state, &request).into_bytes(),
                Err(_) => b"(NAK:ERROR:FORMAT)".to_vec(),
            },
        };
        state.pending.extend(reply);
        Ok(())
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        let mut state = self.state();
        state.pending.clear();
        state.discards += 1;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        let mut state = self.state();
        state.pending.clear();
        state.resets += 1;
        Ok(())
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock(Rc<RefCell<Instant>>);

impl ManualClock {
    pub fn new() -> Self {
        ManualClock(Rc::new(RefCell::new(Instant::now())))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.borrow_mut() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.0.borrow()
    }
}

/// Session timing with no waits.
pub fn fast_config() -> SessionConfig {
    SessionConfig::immediate()
}
