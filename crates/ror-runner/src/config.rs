//! Daemon configuration loaded from YAML.
//!
//! ```yaml
//! transport:
//!   type: serial
//!   path: /dev/ttyACM0
//!   baud_rate: 38400
//! session:
//!   read_timeout_ms: 3000
//! roof:
//!   motion_timeout_secs: 60
//!   action_labels: [Flat panel, Dew heater]
//! ```

use std::fs;
use std::path::Path;

use ror_controller::{validate_motion_timeout, RoofConfig, SessionConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RunnerError};

/// Serial speed of the roof controller firmware.
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Serial device used when none is configured.
pub const DEFAULT_SERIAL_PATH: &str = "/dev/ttyACM0";

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

/// How the daemon reaches the roof controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// A local serial port.
    Serial {
        path: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
    /// A serial-over-TCP bridge, `host:port`.
    Tcp { address: String },
    /// No hardware; a simulated roof.
    Simulated,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Serial {
            path: DEFAULT_SERIAL_PATH.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub transport: TransportConfig,
    pub session: SessionConfig,
    pub roof: RoofConfig,
}

/// Command line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub tcp: Option<String>,
    pub simulate: bool,
    pub timeout: Option<u32>,
}

impl RunnerConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: RunnerConfig = serde_yaml::from_str(text)?;
        Ok(config)
    }

    /// Apply command line overrides. `--simulate` wins over `--tcp`, which
    /// wins over `--port`.
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(path) = &overrides.port {
            let baud_rate = match &self.transport {
                TransportConfig::Serial { baud_rate, .. } => *baud_rate,
                _ => DEFAULT_BAUD_RATE,
            };
            self.transport = TransportConfig::Serial {
                path: path.clone(),
                baud_rate,
            };
        }
        if let (Some(rate), TransportConfig::Serial { baud_rate, .. }) =
            (overrides.baud_rate, &mut self.transport)
        {
            *baud_rate = rate;
        }
        if let Some(address) = &overrides.tcp {
            self.transport = TransportConfig::Tcp {
                address: address.clone(),
            };
        }
        if overrides.simulate {
            self.transport = TransportConfig::Simulated;
        }
        if let Some(secs) = overrides.timeout {
            self.roof.motion_timeout_secs = secs;
        }
    }

    /// Check that the configuration can be used to start the daemon.
    pub fn validate(&self) -> Result<()> {
        match &self.transport {
            TransportConfig::Serial { path, baud_rate } => {
                if path.trim().is_empty() {
                    return Err(RunnerError::InvalidConfig(
                        "serial port path is empty".to_string(),
                    ));
                }
                if *baud_rate == 0 {
                    return Err(RunnerError::InvalidConfig(
                        "baud rate must be greater than zero".to_string(),
                    ));
                }
            }
            TransportConfig::Tcp { address } => {
                if !address.contains(':') {
                    return Err(RunnerError::InvalidConfig(format!(
                        "TCP address must be host:port, got {:?}",
                        address
                    )));
                }
            }
            TransportConfig::Simulated => {}
        }
        if self.session.read_timeout_ms == 0 {
            return Err(RunnerError::InvalidConfig(
                "read timeout must be greater than zero".to_string(),
            ));
        }
        validate_motion_timeout(self.roof.motion_timeout_secs)?;
        self.roof.validate()?;
        Ok(())
    }
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    let text = fs::read_to_string(path).map_err(|source| RunnerError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let config = RunnerConfig::from_yaml(&text)?;
    config.validate()?;
    Ok(config)
}
