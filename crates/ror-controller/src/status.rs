//! Roof status derived from switch readings and motion state.
//!
//! [`derive_status`] is a pure function: it reads the latest switch values
//! and the motion controller's view and produces a snapshot. Nothing here
//! changes controller state.

use serde::Serialize;

use crate::motion::Direction;

/// State of one status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Light {
    #[default]
    Idle,
    Ok,
    Busy,
    Alert,
}

/// Switch values read during one refresh. `None` means the read failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchReadings {
    pub opened: Option<bool>,
    pub closed: Option<bool>,
    pub locked: Option<bool>,
    pub auxiliary: Option<bool>,
    /// Action states, index 0 holding action 1.
    pub actions: Vec<Option<bool>>,
}

impl SwitchReadings {
    pub fn is_opened(&self) -> bool {
        self.opened == Some(true)
    }

    pub fn is_closed(&self) -> bool {
        self.closed == Some(true)
    }

    pub fn is_locked(&self) -> bool {
        self.locked == Some(true)
    }

    pub fn is_auxiliary_on(&self) -> bool {
        self.auxiliary == Some(true)
    }
}

/// What the aggregator needs to know about motion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionView {
    /// Direction of the active motion request, if any.
    pub moving: Option<Direction>,
    /// Direction of the last move that ran out of time.
    pub timed_out: Option<Direction>,
}

/// Conditions worth an operator's attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Anomaly {
    /// Opened and closed limit switches are both on.
    BothLimitsActive,
    /// The lock is on with the roof open.
    OpenWhileLocked,
    /// A move is in progress with the lock on.
    MovingWhileLocked,
    /// Stationary with neither limit switch on.
    Stranded { timed_out: Option<Direction> },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::BothLimitsActive => {
                write!(f, "roof showing it is both opened and closed according to the controller")
            }
            Anomaly::OpenWhileLocked => write!(f, "roof lock is on while the roof is open"),
            Anomaly::MovingWhileLocked => write!(f, "roof is moving while locked"),
            Anomaly::Stranded { timed_out: Some(direction) } => write!(
                f,
                "roof stationary, neither opened or closed, after {} timed out",
                direction.progressive()
            ),
            Anomaly::Stranded { timed_out: None } => {
                write!(f, "roof stationary, neither opened or closed")
            }
        }
    }
}

/// Indicator lights for the roof.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoofLights {
    pub opened: Light,
    pub closed: Light,
    pub moving: Light,
    pub locked: Light,
    pub auxiliary: Light,
}

/// State of one auxiliary action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionStatus {
    /// 1-based action number.
    pub number: u8,
    pub on: bool,
    pub light: Light,
}

/// A snapshot of the roof.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoofStatus {
    pub opened: bool,
    pub closed: bool,
    pub locked: bool,
    pub auxiliary: bool,
    pub moving: Option<Direction>,
    pub timed_out: Option<Direction>,
    pub lights: RoofLights,
    /// Overall roof indicator.
    pub summary: Light,
    pub actions: Vec<ActionStatus>,
    /// Overall action indicator, OK when any action is on.
    pub action_summary: Light,
    pub anomalies: Vec<Anomaly>,
}

impl RoofStatus {
    pub fn has_anomaly(&self, anomaly: Anomaly) -> bool {
        self.anomalies.contains(&anomaly)
    }
}

/// Derive the roof status.
pub fn derive_status(readings: &SwitchReadings, motion: &MotionView) -> RoofStatus {
    let opened = readings.is_opened();
    let closed = readings.is_closed();
    let locked = readings.is_locked();
    let auxiliary = readings.is_auxiliary_on();

    let mut lights = RoofLights::default();
    let mut summary = Light::Idle;
    let mut anomalies = Vec::new();

    if auxiliary {
        lights.auxiliary = Light::Ok;
    }

    if opened && closed {
        anomalies.push(Anomaly::BothLimitsActive);
    }

    if locked {
        lights.locked = Light::Alert;
        if closed {
            // Closed and locked is the normal resting state.
            lights.closed = Light::Ok;
            summary = Light::Ok;
        } else if opened {
            lights.opened = Light::Ok;
            summary = Light::Ok;
            anomalies.push(Anomaly::OpenWhileLocked);
        } else if motion.moving.is_some() {
            lights.moving = Light::Alert;
            summary = Light::Alert;
            anomalies.push(Anomaly::MovingWhileLocked);
        }
    } else if opened && closed {
        summary = Light::Alert;
    } else if opened {
        lights.opened = Light::Ok;
        summary = Light::Ok;
    } else if closed {
        lights.closed = Light::Ok;
        summary = Light::Ok;
    } else if let Some(direction) = motion.moving {
        match direction {
            Direction::Open => lights.opened = Light::Busy,
            Direction::Close => lights.closed = Light::Busy,
        }
        lights.moving = Light::Busy;
        summary = Light::Busy;
    } else {
        match motion.timed_out {
            Some(Direction::Open) => lights.opened = Light::Alert,
            Some(Direction::Close) => lights.closed = Light::Alert,
            None => {}
        }
        summary = Light::Alert;
    }

    if !opened && !closed && motion.moving.is_none() {
        anomalies.push(Anomaly::Stranded {
            timed_out: motion.timed_out,
        });
    }

    let actions: Vec<ActionStatus> = readings
        .actions
        .iter()
        .enumerate()
        .map(|(i, state)| {
            let on = *state == Some(true);
            ActionStatus {
                number: i as u8 + 1,
                on,
                light: if on { Light::Ok } else { Light::Idle },
            }
        })
        .collect();
    let action_summary = if actions.iter().any(|a| a.on) {
        Light::Ok
    } else {
        Light::Idle
    };

    RoofStatus {
        opened,
        closed,
        locked,
        auxiliary,
        moving: motion.moving,
        timed_out: motion.timed_out,
        lights,
        summary,
        actions,
        action_summary,
        anomalies,
    }
}
