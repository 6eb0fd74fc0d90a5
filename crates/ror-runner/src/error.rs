//! Error types for the roof daemon.

use std::io;
use std::path::PathBuf;

use ror_controller::RoofError;
use thiserror::Error;

/// Errors that stop the daemon or a one-shot command.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to open serial port {path}: {source}")]
    SerialOpen {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("failed to connect to roof controller at {address}: {source}")]
    TcpConnect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Roof(#[from] RoofError),
}

pub type Result<T> = std::result::Result<T, RunnerError>;
