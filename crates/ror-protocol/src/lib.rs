//! Roll-off roof controller protocol
//!
//! This crate provides types and utilities for talking to a roll-off roof
//! microcontroller over a serial link. The protocol is a framed,
//! human-readable request/response exchange.
//!
//! # Protocol Overview
//!
//! - **Requests** (host → controller): `(GET:<switch>:0)`, `(SET:<button>:ON|OFF)`
//!   and the handshake `(CON:0:0)`
//! - **Responses** (controller → host): `(ACK:<target>:ON|OFF)`,
//!   `(ACK:0:<version>[ACT<n>])` and `(NAK:<category>:<message>)`
//!
//! The channel is assumed unreliable. [`FrameReader`] validates responses
//! byte by byte and rejects anything that cannot be a frame, handing back a
//! canned `(NAK:NONE:OFF)` so callers never wait on garbage.
//!
//! # Example
//!
//! ```rust,ignore
//! use ror_protocol::{FrameReader, Request, Response, Switch};
//!
//! let line = Request::Get(Switch::Opened).encode()?;
//! port.write_all(&line)?;
//!
//! let mut reader = FrameReader::new();
//! let frame = reader.read_frame(|| read_one_byte(&mut port))?;
//! let opened = Response::interpret(&frame)?.is_on();
//! ```

mod codec;
mod commands;
mod error;
mod responses;

pub use codec::*;
pub use commands::*;
pub use error::*;
pub use responses::*;
