//! Interpretation of frames received from the roof controller.
//!
//! Responses take one of three forms:
//! - `(ACK:<target>:ON|OFF)` for switch reads and relay commands
//! - `(ACK:0:<version>[ACT<n>])` for the handshake
//! - `(NAK:<category>:<message>)` when the controller refuses a request

use crate::codec::Frame;
use crate::commands::{Verb, HANDSHAKE_TARGET, MAX_ACTIONS, VALUE_ON};
use crate::error::{ProtocolError, ProtocolResult};

/// Parsed response from the roof controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Acknowledgement of the handshake.
    Handshake(Handshake),
    /// Acknowledgement carrying a switch or relay state.
    Switch(bool),
}

impl Response {
    /// Interpret a received frame.
    ///
    /// A `NAK` becomes [`ProtocolError::Rejected`]. A frame addressed to
    /// target `0` is a handshake acknowledgement whatever its value.
    /// Otherwise only `ACK` is accepted, with `ON` meaning true.
    pub fn interpret(frame: &Frame) -> ProtocolResult<Response> {
        if frame.verb == Verb::Nak {
            return Err(ProtocolError::Rejected {
                category: frame.target.clone(),
                message: frame.value.clone(),
            });
        }

        if frame.target == HANDSHAKE_TARGET {
            return Ok(Response::Handshake(Handshake::parse(&frame.value)));
        }

        if frame.verb != Verb::Ack {
            return Err(ProtocolError::UnrecognizedResponse(
                frame.verb.as_str().to_string(),
            ));
        }

        Ok(Response::Switch(frame.value == VALUE_ON))
    }

    /// The logical value carried by the response.
    ///
    /// A handshake acknowledgement is always true.
    pub fn is_on(&self) -> bool {
        match self {
            Response::Handshake(_) => true,
            Response::Switch(on) => *on,
        }
    }

    /// Get the handshake details if this is a handshake acknowledgement.
    pub fn as_handshake(&self) -> Option<&Handshake> {
        match self {
            Response::Handshake(h) => Some(h),
            _ => None,
        }
    }
}

/// Details advertised by the controller in its handshake acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Firmware version string (e.g. `V1.3-0`).
    pub version: String,
    /// Number of auxiliary actions supported, `0..=MAX_ACTIONS`.
    pub actions: u8,
}

impl Handshake {
    /// Parse a handshake value.
    ///
    /// Format: `version` or `version[ACTn]`. An action count outside
    /// `1..=MAX_ACTIONS` is treated as no actions.
    pub fn parse(value: &str) -> Handshake {
        let value = value.trim();
        let Some((version, suffix)) = value.split_once('[') else {
            return Handshake {
                version: value.to_string(),
                actions: 0,
            };
        };

        let actions = suffix
            .trim_end_matches(']')
            .strip_prefix("ACT")
            .and_then(|n| n.trim().parse::<u8>().ok())
            .filter(|n| (1..=MAX_ACTIONS).contains(n))
            .unwrap_or(0);

        Handshake {
            version: version.trim().to_string(),
            actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_switch_on() {
        let response = Response::interpret(&Frame::new(Verb::Ack, "OPENED", "ON")).unwrap();
        assert_eq!(response, Response::Switch(true));
        assert!(response.is_on());
    }

    #[test]
    fn test_interpret_switch_anything_else_is_off() {
        for value in ["OFF", "on", "1", ""] {
            let response = Response::interpret(&Frame::new(Verb::Ack, "CLOSED", value)).unwrap();
            assert!(!response.is_on(), "value {:?}", value);
        }
    }

    #[test]
    fn test_interpret_nak() {
        let err = Response::interpret(&Frame::new(Verb::Nak, "ERROR", "Unknown target")).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::Rejected {
                category: "ERROR".to_string(),
                message: "Unknown target".to_string(),
            }
        );
        assert!(!err.is_communication_failure());
    }

    #[test]
    fn test_interpret_canned_nak() {
        let err = Response::interpret(&Frame::canned_nak()).unwrap_err();
        assert!(matches!(err, ProtocolError::Rejected { ref category, .. } if category == "NONE"));
    }

    #[test]
    fn test_interpret_handshake_regardless_of_value() {
        let response = Response::interpret(&Frame::new(Verb::Ack, "0", "OFF")).unwrap();
        assert!(response.is_on());
        assert_eq!(response.as_handshake().unwrap().version, "OFF");
    }

    #[test]
    fn test_interpret_unrecognized() {
        let err = Response::interpret(&Frame::new(Verb::Get, "OPENED", "0")).unwrap_err();
        assert_eq!(err, ProtocolError::UnrecognizedResponse("GET".to_string()));
        assert!(err.is_communication_failure());
    }

    #[test]
    fn test_handshake_with_actions() {
        let h = Handshake::parse("V1.3-0[ACT3]");
        assert_eq!(h.version, "V1.3-0");
        assert_eq!(h.actions, 3);
    }

    #[test]
    fn test_handshake_without_actions() {
        let h = Handshake::parse("V1.3-0");
        assert_eq!(h.version, "V1.3-0");
        assert_eq!(h.actions, 0);
    }

    #[test]
    fn test_handshake_action_count_out_of_range() {
        assert_eq!(Handshake::parse("V1.3-0[ACT0]").actions, 0);
        assert_eq!(Handshake::parse("V1.3-0[ACT9]").actions, 0);
        assert_eq!(Handshake::parse("V1.3-0[ACTx]").actions, 0);
        assert_eq!(Handshake::parse("V1.3-0[ACT8]").actions, 8);
    }
}
