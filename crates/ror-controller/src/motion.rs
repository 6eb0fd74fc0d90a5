//! Roof motion state machine.
//!
//! [`RoofController`] turns open, close and abort requests into button
//! pushes, watches the limit switches on every [`tick`](RoofController::tick)
//! and keeps the dome's park flag in step with what the switches report.
//! It is driven cooperatively: the host calls `tick()` at the interval
//! returned by [`next_tick_interval`](RoofController::next_tick_interval).

use std::fmt;
use std::time::{Duration, Instant};

use ror_protocol::{Action, Button, Switch};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{validate_motion_timeout, RoofConfig};
use crate::dome::Dome;
use crate::error::RoofError;
use crate::source::SwitchSource;
use crate::status::{derive_status, Light, MotionView, RoofStatus, SwitchReadings};

// ============================================================================
// Motion Types
// ============================================================================

/// Direction of roof travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Open,
    Close,
}

impl Direction {
    /// Present participle, for log lines.
    pub fn progressive(&self) -> &'static str {
        match self {
            Direction::Open => "opening",
            Direction::Close => "closing",
        }
    }

    fn button(&self) -> Button {
        match self {
            Direction::Open => Button::Open,
            Direction::Close => Button::Close,
        }
    }

    fn parked_at_limit(&self) -> bool {
        *self == Direction::Close
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Open => write!(f, "open"),
            Direction::Close => write!(f, "close"),
        }
    }
}

/// State of the motion controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionState {
    #[default]
    Idle,
    Opening,
    Closing,
    /// Held only while an abort is being sent.
    Aborting,
}

impl MotionState {
    fn moving(direction: Direction) -> MotionState {
        match direction {
            Direction::Open => MotionState::Opening,
            Direction::Close => MotionState::Closing,
        }
    }
}

/// The single active move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionRequest {
    pub direction: Direction,
    pub issued: Instant,
    pub deadline: Instant,
}

/// Outcome of an accepted open or close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStatus {
    /// The button was pushed and the roof is moving.
    Started(Direction),
    /// A move was already in progress; nothing was sent.
    AlreadyMoving(Direction),
}

impl MoveStatus {
    /// Indicator for the host's motion control.
    pub fn light(&self) -> Light {
        match self {
            MoveStatus::Started(_) => Light::Busy,
            MoveStatus::AlreadyMoving(_) => Light::Ok,
        }
    }
}

/// Outcome of an abort request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortStatus {
    /// The roof was moving and an abort was sent.
    Stopped(Direction),
    /// Nothing needed stopping.
    Stationary,
}

/// Result of comparing the park flag with the limit switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The switches confirm the park flag.
    Agrees,
    /// The park flag was changed to match the switches.
    Corrected { parked: bool },
    /// Both, neither or unreadable limit switches; the flag was left alone.
    Ambiguous,
}

// ============================================================================
// Clock
// ============================================================================

/// Source of monotonic time.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

// ============================================================================
// Roof Controller
// ============================================================================

/// Motion controller for one roll-off roof.
pub struct RoofController<S, D, C = MonotonicClock> {
    source: S,
    dome: D,
    clock: C,
    config: RoofConfig,

    // Motion
    state: MotionState,
    request: Option<MotionRequest>,
    timed_out: Option<Direction>,

    // Latest observations
    readings: SwitchReadings,
    status: RoofStatus,
    last_reconciliation: Option<Reconciliation>,

    // Recovery
    reconnect_pending: bool,
    escalations: u32,
}

impl<S: SwitchSource, D: Dome> RoofController<S, D, MonotonicClock> {
    /// Create a controller using the system monotonic clock.
    pub fn new(source: S, dome: D, config: RoofConfig) -> Self {
        Self::with_clock(source, dome, config, MonotonicClock)
    }
}

impl<S: SwitchSource, D: Dome, C: Clock> RoofController<S, D, C> {
    /// Create a controller with an explicit clock.
    pub fn with_clock(source: S, dome: D, config: RoofConfig, clock: C) -> Self {
        RoofController {
            source,
            dome,
            clock,
            config,
            state: MotionState::Idle,
            request: None,
            timed_out: None,
            readings: SwitchReadings::default(),
            status: RoofStatus::default(),
            last_reconciliation: None,
            reconnect_pending: false,
            escalations: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn request(&self) -> Option<&MotionRequest> {
        self.request.as_ref()
    }

    /// Direction of the last move that ran out of time, cleared by the next move.
    pub fn timed_out(&self) -> Option<Direction> {
        self.timed_out
    }

    /// The status derived at the last tick, connect or abort.
    pub fn snapshot(&self) -> &RoofStatus {
        &self.status
    }

    pub fn readings(&self) -> &SwitchReadings {
        &self.readings
    }

    pub fn config(&self) -> &RoofConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn dome(&self) -> &D {
        &self.dome
    }

    pub fn dome_mut(&mut self) -> &mut D {
        &mut self.dome
    }

    /// Number of times the session was torn down for too many errors.
    pub fn escalations(&self) -> u32 {
        self.escalations
    }

    /// Whether a torn-down session will be re-established on the next tick.
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn is_moving(&self) -> bool {
        self.request.is_some()
    }

    /// Labels for the actions advertised by the controller.
    pub fn action_labels(&self) -> Vec<String> {
        Action::up_to(self.source.supported_actions())
            .map(|action| self.config.action_label(action.number()))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------------

    /// Establish contact and bring the park flag in line with the switches.
    pub fn connect(&mut self) -> Result<&RoofStatus, RoofError> {
        self.source.connect()?;
        self.reconnect_pending = false;
        info!(
            "Roof controller ready, {} actions supported",
            self.source.supported_actions()
        );
        self.refresh();
        self.reconcile();
        self.update_status();
        Ok(&self.status)
    }

    /// Drop contact. Any motion is forgotten; the roof is not told to stop.
    pub fn disconnect(&mut self) {
        if let Some(request) = self.request {
            warn!(
                "Disconnecting while the roof is {}",
                request.direction.progressive()
            );
        }
        self.clear_motion();
        self.reconnect_pending = false;
        self.source.disconnect();
        self.readings = SwitchReadings::default();
        self.status = RoofStatus::default();
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_connected()
    }

    // ------------------------------------------------------------------------
    // Motion requests
    // ------------------------------------------------------------------------

    /// Open the roof.
    pub fn open(&mut self) -> Result<MoveStatus, RoofError> {
        self.start_move(Direction::Open)
    }

    /// Close the roof.
    pub fn close(&mut self) -> Result<MoveStatus, RoofError> {
        self.start_move(Direction::Close)
    }

    /// Park the dome, which closes the roof.
    pub fn park(&mut self) -> Result<MoveStatus, RoofError> {
        let status = self.close()?;
        if let MoveStatus::Started(_) = status {
            info!("Roof is parking...");
        }
        Ok(status)
    }

    /// Unpark the dome, which opens the roof.
    pub fn unpark(&mut self) -> Result<MoveStatus, RoofError> {
        let status = self.open()?;
        if let MoveStatus::Started(_) = status {
            info!("Roof is unparking...");
        }
        Ok(status)
    }

    /// Start moving the roof.
    ///
    /// The switches are read afresh before any veto is decided. A vetoed
    /// request pushes no button.
    pub fn start_move(&mut self, direction: Direction) -> Result<MoveStatus, RoofError> {
        if !self.source.is_connected() {
            warn!("Roof {} requested while not connected", direction);
            return Err(RoofError::NotConnected);
        }

        self.refresh();
        self.check_errors();
        self.update_status();
        if !self.source.is_connected() {
            return Err(RoofError::NotConnected);
        }

        if self.readings.is_locked() {
            warn!("Roof is externally locked, no movement possible");
            return Err(RoofError::Locked);
        }

        if let Some(request) = self.request {
            warn!(
                "Roof is in process of {}, wait for completion",
                request.direction.progressive()
            );
            return Ok(MoveStatus::AlreadyMoving(request.direction));
        }

        match direction {
            Direction::Open if self.readings.is_opened() => {
                warn!("Open requested but the roof is already fully opened");
                self.dome.set_parked(false);
                return Err(RoofError::AlreadyOpen);
            }
            Direction::Close if self.readings.is_closed() => {
                warn!("Close requested but the roof is already fully closed");
                self.dome.set_parked(true);
                return Err(RoofError::AlreadyClosed);
            }
            Direction::Close if self.dome.is_locked() => {
                warn!("Cannot close the roof while the mount is locking");
                return Err(RoofError::MountLocked);
            }
            _ => {}
        }

        if let Err(e) = self.source.push_button(direction.button(), true, false) {
            warn!("Failed to operate controller to {} roof: {}", direction, e);
            self.check_errors();
            self.update_status();
            return Err(e.into());
        }

        let issued = self.clock.now();
        let timeout = self.config.motion_timeout();
        self.request = Some(MotionRequest {
            direction,
            issued,
            deadline: issued + timeout,
        });
        self.state = MotionState::moving(direction);
        self.timed_out = None;
        info!("Roof is {}...", direction.progressive());
        debug!("Roof motion timeout setting: {:?}", timeout);
        self.update_status();
        Ok(MoveStatus::Started(direction))
    }

    /// Stop the roof.
    ///
    /// Always leaves the controller idle. An abort is only sent while a move
    /// is in progress, the roof is unlocked and neither limit switch is on.
    pub fn abort(&mut self) -> Result<AbortStatus, RoofError> {
        let request = self.request;
        if !self.source.is_connected() {
            self.clear_motion();
            self.update_status();
            return Ok(AbortStatus::Stationary);
        }

        self.state = MotionState::Aborting;
        self.refresh();
        let readings = &self.readings;
        let result = if readings.is_locked() {
            warn!("Roof is externally locked, no action taken on abort request");
            Ok(AbortStatus::Stationary)
        } else if readings.is_closed() {
            warn!("Roof appears to be closed and stationary, no action taken on abort request");
            Ok(AbortStatus::Stationary)
        } else if readings.is_opened() {
            warn!("Roof appears to be open and stationary, no action taken on abort request");
            Ok(AbortStatus::Stationary)
        } else if let Some(request) = request {
            warn!(
                "Abort requested while the roof was {}, direction correction may be needed on the next move",
                request.direction.progressive()
            );
            self.source
                .push_button(Button::Abort, true, false)
                .map(|_| AbortStatus::Stopped(request.direction))
                .map_err(RoofError::from)
        } else {
            warn!("Roof appears to be partially open and stationary, no action taken on abort request");
            Ok(AbortStatus::Stationary)
        };

        self.clear_motion();
        if !self.readings.is_opened() && !self.readings.is_closed() {
            self.dome.clear_park();
        }
        self.check_errors();
        self.update_status();
        result
    }

    // ------------------------------------------------------------------------
    // Periodic work
    // ------------------------------------------------------------------------

    /// Refresh switches, advance motion and update the status.
    pub fn tick(&mut self) -> &RoofStatus {
        if !self.source.is_connected() {
            if !self.reconnect_pending {
                return &self.status;
            }
            match self.connect() {
                Ok(_) => info!("Roof controller contact re-established"),
                Err(e) => debug!("Roof controller reconnect failed: {}", e),
            }
            return &self.status;
        }

        self.refresh();
        if self.request.is_some() {
            self.check_motion();
        } else {
            self.reconcile();
        }
        self.check_errors();
        self.update_status();
        &self.status
    }

    /// Interval until the next tick.
    pub fn next_tick_interval(&self) -> Duration {
        if self.request.is_some() {
            self.config.active_tick()
        } else {
            self.config.idle_tick()
        }
    }

    /// Change the time allowed for future moves.
    pub fn set_motion_timeout(&mut self, secs: u32) -> Result<(), RoofError> {
        validate_motion_timeout(secs)?;
        self.config.motion_timeout_secs = secs;
        debug!("Roof motion timeout set to {} seconds", secs);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Lock, auxiliary and actions
    // ------------------------------------------------------------------------

    /// Switch the roof lock. Allowed while locked.
    pub fn set_lock(&mut self, on: bool) -> Result<(), RoofError> {
        self.push_override(Button::Lock, on)
    }

    /// Switch the auxiliary output. Allowed while locked.
    pub fn set_auxiliary(&mut self, on: bool) -> Result<(), RoofError> {
        self.push_override(Button::Auxiliary, on)
    }

    /// Switch an auxiliary action advertised by the controller.
    pub fn set_action(&mut self, number: u8, on: bool) -> Result<(), RoofError> {
        let action = Action::new(number)
            .filter(|action| action.number() <= self.source.supported_actions())
            .ok_or(RoofError::UnknownAction(number))?;
        self.push_override(Button::ActionCommand(action), on)
    }

    fn push_override(&mut self, button: Button, on: bool) -> Result<(), RoofError> {
        if !self.source.is_connected() {
            return Err(RoofError::NotConnected);
        }
        let result = self.source.push_button(button, on, true);
        self.check_errors();
        result.map_err(|e| {
            warn!("Failed to set {}: {}", button.as_str(), e);
            RoofError::from(e)
        })
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Read every switch once. Failed reads are recorded as unknown, and
    /// reading stops once consecutive errors pass the ceiling.
    fn refresh(&mut self) {
        self.source.advance(self.clock.now());

        let opened = self.read(Switch::Opened);
        let closed = self.read(Switch::Closed);
        let locked = self.read(Switch::Locked);
        let auxiliary = self.read(Switch::Auxiliary);
        let actions = Action::up_to(self.source.supported_actions())
            .map(|action| self.read(Switch::ActionState(action)))
            .collect();

        self.readings = SwitchReadings {
            opened,
            closed,
            locked,
            auxiliary,
            actions,
        };
    }

    fn read(&mut self, switch: Switch) -> Option<bool> {
        // Past the ceiling the session is about to be torn down.
        if self.source.communication_errors() > self.config.max_comm_errors {
            return None;
        }
        match self.source.read_switch(switch) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Unable to read {}: {}", switch.as_str(), e);
                None
            }
        }
    }

    /// Finish the active move when its limit switch is reached or time runs out.
    fn check_motion(&mut self) {
        let Some(request) = self.request else {
            return;
        };
        let reached = match request.direction {
            Direction::Open => self.readings.is_opened(),
            Direction::Close => self.readings.is_closed(),
        };

        if reached {
            let parked = request.direction.parked_at_limit();
            info!(
                "Roof is {}",
                if parked { "closed" } else { "open" }
            );
            self.dome.set_parked(parked);
            self.clear_motion();
        } else if self.clock.now() >= request.deadline {
            warn!(
                "Time allowed for {} the roof has expired",
                request.direction.progressive()
            );
            self.timed_out = Some(request.direction);
            self.clear_motion();
        }
    }

    /// Bring the park flag in line with a single active limit switch.
    pub fn reconcile(&mut self) -> Reconciliation {
        let outcome = match (self.readings.opened, self.readings.closed) {
            (Some(opened), Some(closed)) if opened != closed => {
                let parked = closed;
                if self.dome.is_parked() == parked {
                    self.dome.set_parked(parked);
                    Reconciliation::Agrees
                } else {
                    info!(
                        "Roof found {} outside of a move, marking the dome {}",
                        if parked { "closed" } else { "open" },
                        if parked { "parked" } else { "unparked" }
                    );
                    self.dome.set_parked(parked);
                    Reconciliation::Corrected { parked }
                }
            }
            _ => {
                if self.last_reconciliation != Some(Reconciliation::Ambiguous) {
                    warn!(
                        "Roof limit switches do not identify a parked or unparked roof (opened={:?}, closed={:?})",
                        self.readings.opened, self.readings.closed
                    );
                }
                Reconciliation::Ambiguous
            }
        };
        self.last_reconciliation = Some(outcome);
        outcome
    }

    /// Tear the session down once consecutive errors pass the ceiling.
    fn check_errors(&mut self) {
        let errors = self.source.communication_errors();
        if errors <= self.config.max_comm_errors {
            return;
        }
        error!(
            "Too many errors communicating with the roof controller ({}), resetting the connection",
            errors
        );
        self.source.disconnect();
        self.clear_motion();
        self.reconnect_pending = true;
        self.escalations += 1;
    }

    fn update_status(&mut self) {
        let view = MotionView {
            moving: self.request.map(|r| r.direction),
            timed_out: self.timed_out,
        };
        let status = derive_status(&self.readings, &view);
        for anomaly in &status.anomalies {
            if !self.status.anomalies.contains(anomaly) {
                warn!("Roof anomaly: {}", anomaly);
            }
        }
        self.status = status;
    }

    fn clear_motion(&mut self) {
        self.request = None;
        self.state = MotionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dome::ParkState;
    use crate::error::SessionError;
    use std::cell::Cell;

    /// Switch source answering from plain fields.
    #[derive(Default)]
    struct Switches {
        connected: bool,
        opened: bool,
        closed: bool,
        locked: bool,
        errors: u32,
        pushed: Vec<(Button, bool, bool)>,
    }

    impl SwitchSource for Switches {
        fn connect(&mut self) -> Result<(), SessionError> {
            self.connected = true;
            Ok(())
        }

        fn disconnect(&mut self) {
            self.connected = false;
            self.errors = 0;
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn supported_actions(&self) -> u8 {
            2
        }

        fn communication_errors(&self) -> u32 {
            self.errors
        }

        fn read_switch(&mut self, switch: Switch) -> Result<bool, SessionError> {
            Ok(match switch {
                Switch::Opened => self.opened,
                Switch::Closed => self.closed,
                Switch::Locked => self.locked,
                _ => false,
            })
        }

        fn push_button(
            &mut self,
            button: Button,
            on: bool,
            ignore_lock: bool,
        ) -> Result<(), SessionError> {
            self.pushed.push((button, on, ignore_lock));
            Ok(())
        }
    }

    struct TestClock(Cell<Instant>);

    impl TestClock {
        fn advance(&self, by: Duration) {
            self.0.set(self.0.get() + by);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.0.get()
        }
    }

    fn closed_roof() -> Switches {
        Switches {
            closed: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_open_then_reach_limit() {
        let clock = TestClock(Cell::new(Instant::now()));
        let mut roof =
            RoofController::with_clock(closed_roof(), ParkState::new(None), RoofConfig::default(), &clock);
        roof.connect().unwrap();
        assert!(roof.dome().is_parked());

        assert_eq!(roof.open().unwrap(), MoveStatus::Started(Direction::Open));
        assert_eq!(roof.state(), MotionState::Opening);
        assert_eq!(roof.next_tick_interval(), Duration::from_secs(1));

        roof.source_mut().closed = false;
        roof.tick();
        assert_eq!(roof.snapshot().summary, Light::Busy);

        roof.source_mut().opened = true;
        roof.tick();
        assert_eq!(roof.state(), MotionState::Idle);
        assert_eq!(roof.dome().parked(), Some(false));
        assert_eq!(roof.next_tick_interval(), Duration::from_secs(4));
    }

    #[test]
    fn test_timeout_leaves_park_flag() {
        let clock = TestClock(Cell::new(Instant::now()));
        let mut roof =
            RoofController::with_clock(closed_roof(), ParkState::new(None), RoofConfig::default(), &clock);
        roof.connect().unwrap();
        roof.close().unwrap_err();
        roof.source_mut().closed = false;
        roof.source_mut().opened = true;
        roof.tick();
        assert_eq!(roof.dome().parked(), Some(false));

        roof.close().unwrap();
        roof.source_mut().opened = false;
        clock.advance(Duration::from_secs(39));
        roof.tick();
        assert!(roof.is_moving());
        clock.advance(Duration::from_secs(1));
        roof.tick();
        assert!(!roof.is_moving());
        assert_eq!(roof.timed_out(), Some(Direction::Close));
        assert_eq!(roof.dome().parked(), Some(false));
        assert_eq!(roof.snapshot().lights.closed, Light::Alert);
    }

    #[test]
    fn test_lock_vetoes_without_push() {
        let mut switches = closed_roof();
        switches.closed = false;
        switches.opened = true;
        switches.locked = true;
        let mut roof = RoofController::new(switches, ParkState::new(None), RoofConfig::default());
        roof.connect().unwrap();
        assert!(matches!(roof.close(), Err(RoofError::Locked)));
        assert!(roof.source().pushed.is_empty());
    }

    #[test]
    fn test_mount_lock_vetoes_close_only() {
        let mut switches = closed_roof();
        switches.closed = false;
        let mut dome = ParkState::new(None);
        dome.set_mount_locked(true);
        let mut roof = RoofController::new(switches, dome, RoofConfig::default());
        roof.connect().unwrap();
        assert!(matches!(roof.close(), Err(RoofError::MountLocked)));
        assert_eq!(roof.open().unwrap(), MoveStatus::Started(Direction::Open));
    }

    #[test]
    fn test_second_move_is_noop() {
        let mut roof = RoofController::new(closed_roof(), ParkState::new(None), RoofConfig::default());
        roof.connect().unwrap();
        roof.open().unwrap();
        let request = *roof.request().unwrap();
        assert_eq!(roof.close().unwrap(), MoveStatus::AlreadyMoving(Direction::Open));
        assert_eq!(roof.request(), Some(&request));
        assert_eq!(roof.source().pushed.len(), 1);
    }

    #[test]
    fn test_abort_while_moving_sends_abort() {
        let mut roof = RoofController::new(closed_roof(), ParkState::new(None), RoofConfig::default());
        roof.connect().unwrap();
        roof.open().unwrap();
        roof.source_mut().closed = false;
        assert_eq!(roof.abort().unwrap(), AbortStatus::Stopped(Direction::Open));
        assert_eq!(roof.state(), MotionState::Idle);
        assert_eq!(roof.dome().parked(), None);
        assert_eq!(roof.source().pushed.last(), Some(&(Button::Abort, true, false)));
    }

    #[test]
    fn test_abort_at_limit_sends_nothing() {
        let mut roof = RoofController::new(closed_roof(), ParkState::new(None), RoofConfig::default());
        roof.connect().unwrap();
        assert_eq!(roof.abort().unwrap(), AbortStatus::Stationary);
        assert!(roof.source().pushed.is_empty());
        assert_eq!(roof.dome().parked(), Some(true));
    }

    #[test]
    fn test_reconcile_ambiguous_keeps_flag() {
        let mut roof = RoofController::new(closed_roof(), ParkState::new(Some(true)), RoofConfig::default());
        roof.connect().unwrap();
        roof.source_mut().closed = false;
        roof.tick();
        assert_eq!(roof.reconcile(), Reconciliation::Ambiguous);
        assert_eq!(roof.dome().parked(), Some(true));

        roof.source_mut().opened = true;
        roof.tick();
        assert_eq!(roof.dome().parked(), Some(false));
        assert_eq!(roof.reconcile(), Reconciliation::Agrees);
    }

    #[test]
    fn test_escalation_disconnects_and_reconnects() {
        let mut roof = RoofController::new(closed_roof(), ParkState::new(None), RoofConfig::default());
        roof.connect().unwrap();
        roof.source_mut().errors = 11;
        roof.tick();
        assert!(!roof.is_connected());
        assert_eq!(roof.escalations(), 1);
        assert!(roof.reconnect_pending());
        assert_eq!(roof.source().errors, 0);

        roof.tick();
        assert!(roof.is_connected());
        assert!(!roof.reconnect_pending());
    }

    #[test]
    fn test_set_action_range() {
        let mut roof = RoofController::new(closed_roof(), ParkState::new(None), RoofConfig::default());
        roof.connect().unwrap();
        assert!(matches!(roof.set_action(3, true), Err(RoofError::UnknownAction(3))));
        assert!(matches!(roof.set_action(0, true), Err(RoofError::UnknownAction(0))));
        roof.set_action(2, true).unwrap();
        roof.set_lock(true).unwrap();
        assert_eq!(roof.source().pushed.len(), 2);
        assert!(roof.source().pushed.iter().all(|(_, _, ignore)| *ignore));
    }

    #[test]
    fn test_set_motion_timeout() {
        let mut roof = RoofController::new(closed_roof(), ParkState::new(None), RoofConfig::default());
        assert!(roof.set_motion_timeout(0).is_err());
        roof.set_motion_timeout(120).unwrap();
        assert_eq!(roof.config().motion_timeout(), Duration::from_secs(120));
    }
}
