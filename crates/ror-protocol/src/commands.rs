//! Requests that can be sent to the roof controller.
//!
//! Every request is one frame `(VERB:TARGET:VALUE)`:
//! - `(CON:0:0)` establishes contact
//! - `(GET:<switch>:0)` reads a switch
//! - `(SET:<button>:ON|OFF)` drives a relay

use crate::codec::Frame;
use crate::error::ProtocolResult;

/// Maximum number of auxiliary actions a controller can advertise.
pub const MAX_ACTIONS: u8 = 8;

/// Target used by the handshake in both directions.
pub const HANDSHAKE_TARGET: &str = "0";

/// Value sent with a `GET` request.
pub const GET_VALUE: &str = "0";

/// Wire value for a switch or relay that is on.
pub const VALUE_ON: &str = "ON";

/// Wire value for a switch or relay that is off.
pub const VALUE_OFF: &str = "OFF";

/// The command field of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Query a switch (`GET`).
    Get,
    /// Command a relay (`SET`).
    Set,
    /// Handshake (`CON`).
    Connect,
    /// Positive acknowledgement (`ACK`).
    Ack,
    /// Negative acknowledgement (`NAK`).
    Nak,
}

impl Verb {
    /// Get the verb string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Set => "SET",
            Verb::Connect => "CON",
            Verb::Ack => "ACK",
            Verb::Nak => "NAK",
        }
    }

    /// Parse a verb from its wire representation.
    pub fn from_wire(s: &str) -> Option<Verb> {
        match s {
            "GET" => Some(Verb::Get),
            "SET" => Some(Verb::Set),
            "CON" => Some(Verb::Connect),
            "ACK" => Some(Verb::Ack),
            "NAK" => Some(Verb::Nak),
            _ => None,
        }
    }
}

/// One of the controller's auxiliary actions, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action(u8);

impl Action {
    /// Create an action from its 1-based number, if it is in range.
    pub fn new(number: u8) -> Option<Action> {
        (1..=MAX_ACTIONS).contains(&number).then_some(Action(number))
    }

    /// All actions up to `count`, clamped to `MAX_ACTIONS`.
    pub fn up_to(count: u8) -> impl Iterator<Item = Action> {
        (1..=count.min(MAX_ACTIONS)).map(Action)
    }

    /// The 1-based action number.
    pub fn number(&self) -> u8 {
        self.0
    }

    fn slot(&self) -> usize {
        usize::from(self.0 - 1)
    }
}

const ACTION_STATE_IDS: [&str; MAX_ACTIONS as usize] = [
    "ACT1STATE", "ACT2STATE", "ACT3STATE", "ACT4STATE",
    "ACT5STATE", "ACT6STATE", "ACT7STATE", "ACT8STATE",
];

const ACTION_COMMAND_IDS: [&str; MAX_ACTIONS as usize] = [
    "ACT1CMD", "ACT2CMD", "ACT3CMD", "ACT4CMD",
    "ACT5CMD", "ACT6CMD", "ACT7CMD", "ACT8CMD",
];

/// Switches that can be read with `GET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Switch {
    /// Fully opened limit switch (`OPENED`).
    Opened,
    /// Fully closed limit switch (`CLOSED`).
    Closed,
    /// External roof lock (`LOCKED`).
    Locked,
    /// Auxiliary output state (`AUXSTATE`).
    Auxiliary,
    /// State reported for an auxiliary action (`ACTnSTATE`).
    ActionState(Action),
}

impl Switch {
    /// Get the target string used in requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Switch::Opened => "OPENED",
            Switch::Closed => "CLOSED",
            Switch::Locked => "LOCKED",
            Switch::Auxiliary => "AUXSTATE",
            Switch::ActionState(action) => ACTION_STATE_IDS[action.slot()],
        }
    }

    /// Parse a switch from its target string.
    pub fn from_wire(s: &str) -> Option<Switch> {
        match s {
            "OPENED" => Some(Switch::Opened),
            "CLOSED" => Some(Switch::Closed),
            "LOCKED" => Some(Switch::Locked),
            "AUXSTATE" => Some(Switch::Auxiliary),
            _ => ACTION_STATE_IDS
                .iter()
                .position(|id| *id == s)
                .and_then(|i| Action::new(i as u8 + 1))
                .map(Switch::ActionState),
        }
    }
}

/// Relays that can be driven with `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Start opening the roof (`OPEN`).
    Open,
    /// Start closing the roof (`CLOSE`).
    Close,
    /// Stop the roof (`ABORT`).
    Abort,
    /// Engage or release the roof lock (`LOCK`).
    Lock,
    /// Switch the auxiliary output (`AUXSET`).
    Auxiliary,
    /// Trigger an auxiliary action (`ACTnCMD`).
    ActionCommand(Action),
}

impl Button {
    /// Get the target string used in requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Button::Open => "OPEN",
            Button::Close => "CLOSE",
            Button::Abort => "ABORT",
            Button::Lock => "LOCK",
            Button::Auxiliary => "AUXSET",
            Button::ActionCommand(action) => ACTION_COMMAND_IDS[action.slot()],
        }
    }

    /// Parse a button from its target string.
    pub fn from_wire(s: &str) -> Option<Button> {
        match s {
            "OPEN" => Some(Button::Open),
            "CLOSE" => Some(Button::Close),
            "ABORT" => Some(Button::Abort),
            "LOCK" => Some(Button::Lock),
            "AUXSET" => Some(Button::Auxiliary),
            _ => ACTION_COMMAND_IDS
                .iter()
                .position(|id| *id == s)
                .and_then(|i| Action::new(i as u8 + 1))
                .map(Button::ActionCommand),
        }
    }
}

/// Requests that can be sent to the roof controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Establish contact: `(CON:0:0)`.
    Connect,
    /// Read a switch: `(GET:<switch>:0)`.
    Get(Switch),
    /// Drive a relay on or off: `(SET:<button>:ON|OFF)`.
    Set(Button, bool),
}

impl Request {
    /// Build the frame for this request.
    pub fn to_frame(&self) -> Frame {
        match self {
            Request::Connect => Frame::new(Verb::Connect, HANDSHAKE_TARGET, GET_VALUE),
            Request::Get(switch) => Frame::new(Verb::Get, switch.as_str(), GET_VALUE),
            Request::Set(button, on) => Frame::new(
                Verb::Set,
                button.as_str(),
                if *on { VALUE_ON } else { VALUE_OFF },
            ),
        }
    }

    /// Encode the request as the bytes to send.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        self.to_frame().encode()
    }
}
