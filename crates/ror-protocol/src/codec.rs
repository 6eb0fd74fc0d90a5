//! Frame codec for the roof controller protocol.
//!
//! Every message is one frame of printable ASCII:
//!
//! ```text
//! ( VERB : TARGET : VALUE )
//! ```
//!
//! Responses are assembled one byte at a time by [`FrameReader`], which
//! polices the frame shape as bytes arrive so that line noise (for example
//! while the microcontroller resets) is rejected quickly instead of being
//! buffered without bound.

use bytes::BytesMut;

use crate::commands::Verb;
use crate::error::{FrameViolation, ProtocolError, ProtocolResult};

/// Marks the start of a frame.
pub const START_MARKER: u8 = b'(';

/// Marks the end of a frame.
pub const END_MARKER: u8 = b')';

/// Separates the three fields of a frame.
pub const DELIMITER: u8 = b':';

/// Maximum command field length.
pub const MAX_COMMAND_LENGTH: usize = 15;

/// Maximum target field length.
pub const MAX_TARGET_LENGTH: usize = 15;

/// Maximum value field length, sized to hold `NAK` diagnostics.
pub const MAX_VALUE_LENGTH: usize = 127;

/// Outgoing lines must be shorter than this.
pub const MAX_LINE_LENGTH: usize = 63;

/// Maximum overall inbound buffer.
pub const MAX_BUFFER_LENGTH: usize = 255;

/// Bytes after which at least one delimiter must have been seen.
pub const COMMAND_FIELD_BOUNDARY: usize = MAX_COMMAND_LENGTH - 5;

/// Bytes after which both delimiters must have been seen.
pub const TARGET_FIELD_BOUNDARY: usize = MAX_TARGET_LENGTH + COMMAND_FIELD_BOUNDARY - 5;

/// One complete protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command field.
    pub verb: Verb,
    /// Target field: a switch or button id, a `NAK` category, or `0`.
    pub target: String,
    /// Value field.
    pub value: String,
}

impl Frame {
    /// Create a frame from its three fields.
    pub fn new(verb: Verb, target: impl Into<String>, value: impl Into<String>) -> Self {
        Frame {
            verb,
            target: target.into(),
            value: value.into(),
        }
    }

    /// The response handed back when an incoming stream is rejected.
    pub fn canned_nak() -> Self {
        Frame::new(Verb::Nak, "NONE", "OFF")
    }

    /// Render the frame as text, without any length check.
    pub fn to_line(&self) -> String {
        format!("({}:{}:{})", self.verb.as_str(), self.target, self.value)
    }

    /// Encode the frame for transmission.
    ///
    /// Fails if a field contains a framing character or if the line would
    /// not fit in the controller's command buffer.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        for field in [&self.target, &self.value] {
            if field
                .bytes()
                .any(|b| b == START_MARKER || b == END_MARKER || b == DELIMITER)
            {
                return Err(ProtocolError::Malformed(format!(
                    "field contains a framing character: {}",
                    field
                )));
            }
        }

        let line = self.to_line();
        if line.len() >= MAX_LINE_LENGTH {
            return Err(ProtocolError::LineTooLong {
                max: MAX_LINE_LENGTH,
                actual: line.len(),
            });
        }
        Ok(line.into_bytes())
    }

    /// Parse a complete frame, markers included.
    pub fn parse(text: &str) -> ProtocolResult<Frame> {
        let inner = text
            .trim()
            .strip_prefix(START_MARKER as char)
            .and_then(|rest| rest.strip_suffix(END_MARKER as char))
            .ok_or_else(|| ProtocolError::Malformed(format!("missing frame markers: {}", text)))?;

        let fields: Vec<&str> = inner.split(DELIMITER as char).collect();
        if fields.len() != 3 {
            return Err(ProtocolError::Malformed(format!(
                "expected 3 fields, got {}: {}",
                fields.len(),
                text
            )));
        }

        let (command, target, value) = (fields[0], fields[1], fields[2]);
        if command.len() > MAX_COMMAND_LENGTH
            || target.len() > MAX_TARGET_LENGTH
            || value.len() > MAX_VALUE_LENGTH
        {
            return Err(ProtocolError::Malformed(format!("field too long: {}", text)));
        }

        let verb = Verb::from_wire(command)
            .ok_or_else(|| ProtocolError::UnrecognizedResponse(command.to_string()))?;

        Ok(Frame::new(verb, target, value))
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Assembles and validates incoming frames one byte at a time.
#[derive(Debug, Default)]
pub struct FrameReader {
    /// Bytes accepted since the start marker.
    buffer: BytesMut,
    /// Whether a start marker has been seen.
    started: bool,
    /// Delimiters seen since the start marker.
    delimiters: usize,
    /// Bytes seen before any start marker.
    stray: usize,
    /// Number of streams rejected since the last reset.
    rejected: u32,
}

impl FrameReader {
    /// Create a new frame reader.
    pub fn new() -> Self {
        FrameReader {
            buffer: BytesMut::with_capacity(MAX_BUFFER_LENGTH),
            ..Default::default()
        }
    }

    /// Feed one received byte.
    ///
    /// Returns `Ok(Some(frame))` once a frame completes and `Ok(None)` while
    /// more bytes are needed. A rejected stream resets the reader.
    pub fn push(&mut self, byte: u8) -> ProtocolResult<Option<Frame>> {
        if !self.started {
            if byte != START_MARKER {
                self.stray += 1;
                if self.stray >= 2 {
                    return Err(self.reject(FrameViolation::MissingStart));
                }
                return Ok(None);
            }
            self.started = true;
        }

        self.buffer.extend_from_slice(&[byte]);
        if byte == DELIMITER {
            self.delimiters += 1;
        }
        let ended = byte == END_MARKER;
        let accepted = self.buffer.len();

        if accepted > MAX_VALUE_LENGTH {
            return Err(self.reject(FrameViolation::TooLong));
        }
        if accepted >= COMMAND_FIELD_BOUNDARY && self.delimiters == 0 {
            return Err(self.reject(FrameViolation::CommandTooLong));
        }
        if accepted >= TARGET_FIELD_BOUNDARY && self.delimiters < 2 {
            return Err(self.reject(FrameViolation::TargetTooLong));
        }
        if ended && self.delimiters != 2 {
            return Err(self.reject(FrameViolation::BadDelimiters));
        }

        if !ended {
            return Ok(None);
        }

        let text = String::from_utf8_lossy(&self.buffer).to_string();
        self.clear();
        log::trace!("received frame {}", text);
        Frame::parse(&text).map(Some)
    }

    /// Read one frame, pulling bytes from `next_byte` until it completes.
    ///
    /// Transport errors from `next_byte` are returned unchanged; framing
    /// errors are converted into the caller's error type.
    pub fn read_frame<E, F>(&mut self, mut next_byte: F) -> Result<Frame, E>
    where
        F: FnMut() -> Result<u8, E>,
        E: From<ProtocolError>,
    {
        self.clear();
        loop {
            let byte = match next_byte() {
                Ok(byte) => byte,
                Err(e) => {
                    self.clear();
                    return Err(e);
                }
            };
            if let Some(frame) = self.push(byte)? {
                return Ok(frame);
            }
        }
    }

    /// Number of rejected streams since creation or the last reset.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Reset the rejection counter.
    pub fn reset_rejected(&mut self) {
        self.rejected = 0;
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Discard any partial frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.started = false;
        self.delimiters = 0;
        self.stray = 0;
    }

    fn reject(&mut self, reason: FrameViolation) -> ProtocolError {
        self.rejected += 1;
        let raw = String::from_utf8_lossy(&self.buffer).to_string();
        log::warn!("received communication protocol not valid ({}): {}", reason, raw);
        self.clear();
        ProtocolError::InvalidFrame {
            reason,
            raw,
            response: Frame::canned_nak(),
        }
    }
}
