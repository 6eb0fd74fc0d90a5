//! Roll-off roof controller
//!
//! Drives a roll-off observatory roof through a microcontroller that
//! exposes limit, lock and auxiliary switches plus open, close and abort
//! buttons over a serial link.
//!
//! The pieces fit together bottom-up:
//!
//! - [`Transport`] moves bytes to and from the controller
//! - [`ControllerSession`] runs the handshake and one request/response
//!   exchange at a time, counting consecutive communication errors
//! - [`SwitchSource`] abstracts where readings come from, either a session
//!   or a [`SimulatedRoof`]
//! - [`RoofController`] is the motion state machine; it talks to the host's
//!   [`Dome`] about the park state
//! - [`derive_status`] turns one round of readings into a [`RoofStatus`]

mod config;
mod dome;
mod error;
mod motion;
mod session;
mod source;
mod status;
mod transport;

pub use config::*;
pub use dome::*;
pub use error::*;
pub use motion::*;
pub use session::*;
pub use source::*;
pub use status::*;
pub use transport::*;
