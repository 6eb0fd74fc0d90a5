//! Roll-off roof daemon
//!
//! Loads a [`RunnerConfig`], opens the configured link to the roof
//! controller and either runs the tick loop until interrupted or executes a
//! single command.

pub mod config;
pub mod daemon;
pub mod error;
pub mod transport;

pub use config::{load_config, Overrides, RunnerConfig, TransportConfig};
pub use daemon::{build_roof, build_source, run, run_once, shutdown_flag, OneShot, Roof};
pub use error::{Result, RunnerError};
pub use transport::{SerialTransport, TcpTransport};
