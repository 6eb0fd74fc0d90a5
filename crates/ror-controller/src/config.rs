//! Configuration for the controller session and the roof state machine.

use std::time::Duration;

use ror_protocol::MAX_ACTIONS;
use serde::{Deserialize, Serialize};

use crate::error::RoofError;

/// Default seconds allowed for the roof to reach a limit switch.
pub const DEFAULT_MOTION_TIMEOUT_SECS: u32 = 40;

/// Shortest accepted motion timeout.
pub const MIN_MOTION_TIMEOUT_SECS: u32 = 1;

/// Longest accepted motion timeout.
pub const MAX_MOTION_TIMEOUT_SECS: u32 = 300;

/// Consecutive communication errors tolerated before the session is torn down.
pub const MAX_COMM_ERRORS: u32 = 10;

/// Timing of exchanges with the roof controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Per-byte read timeout in milliseconds.
    pub read_timeout_ms: u64,
    /// Wait after pushing a button before reading the acknowledgement.
    pub settle_delay_ms: u64,
    /// Wait before the single handshake retry.
    pub handshake_retry_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            read_timeout_ms: 3000,
            settle_delay_ms: 1000,
            handshake_retry_delay_ms: 1000,
        }
    }
}

impl SessionConfig {
    /// Configuration with no delays, for scripted controllers.
    pub fn immediate() -> Self {
        SessionConfig {
            read_timeout_ms: 100,
            settle_delay_ms: 0,
            handshake_retry_delay_ms: 0,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn handshake_retry_delay(&self) -> Duration {
        Duration::from_millis(self.handshake_retry_delay_ms)
    }
}

/// Behaviour of the roof motion controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoofConfig {
    /// Seconds allowed for a move before it is reported as timed out.
    pub motion_timeout_secs: u32,
    /// Tick cadence while a move is in progress.
    pub active_tick_ms: u64,
    /// Tick cadence while the roof is idle.
    pub idle_tick_ms: u64,
    /// Consecutive communication errors tolerated before teardown.
    pub max_comm_errors: u32,
    /// Seconds the simulated roof takes to travel between limits.
    pub simulated_travel_secs: u64,
    /// Display labels for the auxiliary actions, in action order.
    pub action_labels: Vec<String>,
}

impl Default for RoofConfig {
    fn default() -> Self {
        RoofConfig {
            motion_timeout_secs: DEFAULT_MOTION_TIMEOUT_SECS,
            active_tick_ms: 1000,
            idle_tick_ms: 4000,
            max_comm_errors: MAX_COMM_ERRORS,
            simulated_travel_secs: 10,
            action_labels: Vec::new(),
        }
    }
}

impl RoofConfig {
    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), RoofError> {
        validate_motion_timeout(self.motion_timeout_secs)?;
        if self.active_tick_ms == 0 || self.idle_tick_ms == 0 {
            return Err(RoofError::InvalidConfig(
                "tick intervals must be greater than zero".to_string(),
            ));
        }
        if self.action_labels.len() > usize::from(MAX_ACTIONS) {
            return Err(RoofError::InvalidConfig(format!(
                "at most {} action labels, got {}",
                MAX_ACTIONS,
                self.action_labels.len()
            )));
        }
        Ok(())
    }

    pub fn motion_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.motion_timeout_secs))
    }

    pub fn active_tick(&self) -> Duration {
        Duration::from_millis(self.active_tick_ms)
    }

    pub fn idle_tick(&self) -> Duration {
        Duration::from_millis(self.idle_tick_ms)
    }

    pub fn simulated_travel(&self) -> Duration {
        Duration::from_secs(self.simulated_travel_secs)
    }

    /// Label for a 1-based action number.
    ///
    /// Missing or blank labels fall back to `Action n`; a label that repeats
    /// an earlier one is shown as a duplicate.
    pub fn action_label(&self, number: u8) -> String {
        let index = usize::from(number.saturating_sub(1));
        match self.action_labels.get(index).map(|l| l.trim()) {
            Some(label) if !label.is_empty() => {
                match self.action_labels[..index].iter().position(|l| l.trim() == label) {
                    Some(first) => format!("Duplicate Label {}", first + 1),
                    None => label.to_string(),
                }
            }
            _ => format!("Action {}", number),
        }
    }
}

/// Check a motion timeout in seconds.
pub fn validate_motion_timeout(secs: u32) -> Result<(), RoofError> {
    if !(MIN_MOTION_TIMEOUT_SECS..=MAX_MOTION_TIMEOUT_SECS).contains(&secs) {
        return Err(RoofError::InvalidConfig(format!(
            "roof motion timeout must be between {} and {} seconds, got {}",
            MIN_MOTION_TIMEOUT_SECS, MAX_MOTION_TIMEOUT_SECS, secs
        )));
    }
    Ok(())
}
