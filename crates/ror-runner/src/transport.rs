//! Serial port and TCP bridge transports.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use ror_controller::{Transport, TransportError};
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info};

use crate::error::{Result, RunnerError};

/// Timeout used while opening a port, before any exchange sets its own.
const OPEN_TIMEOUT: Duration = Duration::from_secs(3);

/// Smallest read timeout passed to the OS; zero means "block forever" on sockets.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

fn read_one(reader: &mut impl Read, timeout: Duration) -> std::result::Result<u8, TransportError> {
    let mut buf = [0u8; 1];
    match reader.read(&mut buf) {
        Ok(1) => Ok(buf[0]),
        Ok(_) => Err(TransportError::Closed),
        Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
            Err(TransportError::Timeout(timeout))
        }
        Err(e) => Err(TransportError::Io(e)),
    }
}

// ============================================================================
// Serial
// ============================================================================

/// A roof controller on a local serial port, 8N1 without flow control.
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Open the port.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = open_port(path, baud_rate).map_err(|source| RunnerError::SerialOpen {
            path: path.to_string(),
            source,
        })?;
        info!("Opened {} at {} baud", path, baud_rate);
        Ok(SerialTransport {
            path: path.to_string(),
            baud_rate,
            port: Some(port),
        })
    }

    /// The port, reopened if an earlier reset closed it.
    fn port(&mut self) -> std::result::Result<&mut Box<dyn SerialPort>, TransportError> {
        if self.port.is_none() {
            debug!("Reopening {}", self.path);
            let port = open_port(&self.path, self.baud_rate).map_err(io::Error::from)?;
            self.port = Some(port);
        }
        self.port.as_mut().ok_or(TransportError::Closed)
    }
}

fn open_port(path: &str, baud_rate: u32) -> serialport::Result<Box<dyn SerialPort>> {
    serialport::new(path, baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(OPEN_TIMEOUT)
        .open()
}

impl Transport for SerialTransport {
    fn read_byte(&mut self, timeout: Duration) -> std::result::Result<u8, TransportError> {
        let port = self.port()?;
        port.set_timeout(timeout.max(MIN_READ_TIMEOUT))
            .map_err(io::Error::from)?;
        read_one(port, timeout)
    }

    fn write_line(&mut self, line: &[u8]) -> std::result::Result<(), TransportError> {
        let port = self.port()?;
        port.write_all(line)?;
        port.flush()?;
        Ok(())
    }

    fn discard_input(&mut self) -> std::result::Result<(), TransportError> {
        self.port()?
            .clear(ClearBuffer::Input)
            .map_err(io::Error::from)?;
        Ok(())
    }

    fn reset(&mut self) -> std::result::Result<(), TransportError> {
        if self.port.take().is_some() {
            debug!("Closed {}", self.path);
        }
        Ok(())
    }
}

// ============================================================================
// TCP
// ============================================================================

/// A roof controller behind a serial-over-TCP bridge.
pub struct TcpTransport {
    address: String,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Connect to `host:port`.
    pub fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address).map_err(|source| RunnerError::TcpConnect {
            address: address.to_string(),
            source,
        })?;
        stream
            .set_nodelay(true)
            .map_err(|source| RunnerError::TcpConnect {
                address: address.to_string(),
                source,
            })?;
        info!("Connected to roof controller bridge at {}", address);
        Ok(TcpTransport {
            address: address.to_string(),
            stream: Some(stream),
        })
    }

    fn stream(&mut self) -> std::result::Result<&mut TcpStream, TransportError> {
        if self.stream.is_none() {
            debug!("Reconnecting to {}", self.address);
            let stream = TcpStream::connect(&self.address)?;
            stream.set_nodelay(true)?;
            self.stream = Some(stream);
        }
        self.stream.as_mut().ok_or(TransportError::Closed)
    }
}

impl Transport for TcpTransport {
    fn read_byte(&mut self, timeout: Duration) -> std::result::Result<u8, TransportError> {
        let stream = self.stream()?;
        stream.set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;
        let result = read_one(stream, timeout);
        if matches!(result, Err(TransportError::Closed)) {
            self.stream = None;
        }
        result
    }

    fn write_line(&mut self, line: &[u8]) -> std::result::Result<(), TransportError> {
        let stream = self.stream()?;
        if let Err(e) = stream.write_all(line).and_then(|_| stream.flush()) {
            self.stream = None;
            return Err(e.into());
        }
        Ok(())
    }

    fn discard_input(&mut self) -> std::result::Result<(), TransportError> {
        let stream = self.stream()?;
        stream.set_nonblocking(true)?;
        let mut buf = [0u8; 64];
        let drained = loop {
            match stream.read(&mut buf) {
                Ok(0) => break Err(TransportError::Closed),
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
                Err(e) => break Err(TransportError::Io(e)),
            }
        };
        stream.set_nonblocking(false)?;
        if drained.is_err() {
            self.stream = None;
        }
        drained
    }

    fn reset(&mut self) -> std::result::Result<(), TransportError> {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            debug!("Disconnected from {}", self.address);
        }
        Ok(())
    }
}
