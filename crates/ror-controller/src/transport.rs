//! Byte-level link to the roof controller.

use std::time::Duration;

use crate::error::TransportError;

/// A blocking serial-style link.
///
/// Implementations must return from [`Transport::read_byte`] within the
/// given timeout so that a tick can never hang.
pub trait Transport {
    /// Read a single byte, waiting at most `timeout`.
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, TransportError>;

    /// Write a complete request line.
    fn write_line(&mut self, line: &[u8]) -> Result<(), TransportError>;

    /// Drop any bytes received but not yet read.
    ///
    /// Called before every request so a late or partial response from an
    /// earlier exchange is not mistaken for the next answer.
    fn discard_input(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Tear down and prepare to re-establish the link.
    fn reset(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, TransportError> {
        (**self).read_byte(timeout)
    }

    fn write_line(&mut self, line: &[u8]) -> Result<(), TransportError> {
        (**self).write_line(line)
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        (**self).discard_input()
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        (**self).reset()
    }
}
