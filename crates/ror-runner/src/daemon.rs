//! The tick loop and one-shot commands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ror_controller::{
    ControllerSession, Dome, Light, ParkState, RoofController, RoofError, RoofStatus,
    SimulatedRoof, SwitchSource, Transport,
};
use ror_protocol::Button;
use tracing::{debug, info, warn};

use crate::config::{RunnerConfig, TransportConfig};
use crate::error::{Result, RunnerError};
use crate::transport::{SerialTransport, TcpTransport};

/// The roof controller as the daemon runs it.
pub type Roof = RoofController<Box<dyn SwitchSource>, ParkState>;

/// Longest single sleep, so a shutdown request is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// A single command run against the roof before exiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneShot {
    Open,
    Close,
    Abort,
    Status,
}

/// Build the switch source named by the configuration.
pub fn build_source(config: &RunnerConfig) -> Result<Box<dyn SwitchSource>> {
    let transport: Box<dyn Transport> = match &config.transport {
        TransportConfig::Serial { path, baud_rate } => {
            Box::new(SerialTransport::open(path, *baud_rate)?)
        }
        TransportConfig::Tcp { address } => Box::new(TcpTransport::connect(address)?),
        TransportConfig::Simulated => {
            info!("Running with a simulated roof");
            return Ok(Box::new(SimulatedRoof::new(config.roof.simulated_travel())));
        }
    };
    Ok(Box::new(ControllerSession::new(
        transport,
        config.session.clone(),
    )))
}

/// Build a roof controller from a validated configuration.
pub fn build_roof(config: &RunnerConfig) -> Result<Roof> {
    let source = build_source(config)?;
    Ok(RoofController::new(
        source,
        ParkState::new(None),
        config.roof.clone(),
    ))
}

/// Install a Ctrl-C handler that clears the returned flag.
pub fn shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Shutdown requested");
        flag.store(false, Ordering::SeqCst);
    })?;
    Ok(running)
}

/// Sleep for `duration`, returning early with `false` if `running` clears.
fn sleep_while(running: &AtomicBool, duration: Duration) -> bool {
    let until = Instant::now() + duration;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= until {
            return true;
        }
        thread::sleep((until - now).min(SLEEP_SLICE));
    }
}

/// What changed between two status snapshots, worth an info line.
fn describe_change(previous: &RoofStatus, current: &RoofStatus) -> Option<String> {
    if previous.summary == current.summary
        && previous.moving == current.moving
        && previous.opened == current.opened
        && previous.closed == current.closed
        && previous.locked == current.locked
    {
        return None;
    }
    let position = match (current.opened, current.closed, current.moving) {
        (_, _, Some(direction)) => direction.progressive().to_string(),
        (true, false, None) => "open".to_string(),
        (false, true, None) => "closed".to_string(),
        (true, true, None) => "both limits active".to_string(),
        (false, false, None) => "between limits".to_string(),
    };
    Some(format!(
        "Roof {}{}, status {:?}",
        position,
        if current.locked { ", locked" } else { "" },
        current.summary
    ))
}

/// Run the roof until `running` clears.
///
/// Contact is retried on the idle cadence until the first handshake
/// succeeds. On shutdown any motion is aborted before disconnecting.
pub fn run(roof: &mut Roof, running: &AtomicBool) -> Result<()> {
    while !roof.is_connected() {
        match roof.connect() {
            Ok(status) => info!("Roof status {:?}", status.summary),
            Err(e) => {
                warn!("Roof controller not reachable: {}", e);
                if !sleep_while(running, roof.config().idle_tick()) {
                    return Ok(());
                }
            }
        }
    }
    let labels = roof.action_labels();
    if !labels.is_empty() {
        info!("Actions: {}", labels.join(", "));
    }

    let mut previous = roof.snapshot().clone();
    let mut was_connected = true;
    while sleep_while(running, roof.next_tick_interval()) {
        let status = roof.tick().clone();
        let connected = roof.is_connected();
        if connected != was_connected {
            if connected {
                info!("Roof controller connection restored");
            } else {
                warn!("Roof controller connection lost, retrying");
            }
            was_connected = connected;
        }
        if let Some(change) = describe_change(&previous, &status) {
            info!("{}", change);
        }
        previous = status;
    }

    if roof.is_moving() {
        warn!("Stopping roof motion before exit");
        if let Err(e) = roof.abort() {
            warn!("Abort on exit failed: {}", e);
        }
    }
    roof.disconnect();
    info!("Roof daemon stopped");
    Ok(())
}

/// Connect, run one command, and follow any motion to its end.
pub fn run_once(roof: &mut Roof, command: OneShot, running: &AtomicBool) -> Result<RoofStatus> {
    roof.connect()?;
    match command {
        OneShot::Open => {
            let status = roof.open()?;
            debug!("Open request: {:?} ({:?})", status, status.light());
        }
        OneShot::Close => {
            let status = roof.close()?;
            debug!("Close request: {:?} ({:?})", status, status.light());
        }
        OneShot::Abort => {
            // A fresh process knows of no motion, so a roof found between
            // its limits is told to stop directly.
            let readings = roof.readings();
            if !roof.is_moving()
                && !readings.is_locked()
                && !readings.is_opened()
                && !readings.is_closed()
            {
                roof.source_mut()
                    .push_button(Button::Abort, true, false)
                    .map_err(RoofError::from)?;
                roof.dome_mut().clear_park();
                info!("Abort sent to a roof between its limits");
            } else {
                let status = roof.abort()?;
                info!("Abort: {:?}", status);
            }
        }
        OneShot::Status => {}
    }

    while roof.is_moving() {
        if !sleep_while(running, roof.next_tick_interval()) {
            roof.abort()?;
            roof.disconnect();
            return Err(RunnerError::Interrupted);
        }
        roof.tick();
        if !roof.is_connected() {
            warn!("Lost contact with the roof controller while moving");
            break;
        }
    }

    let status = roof.snapshot().clone();
    if status.summary == Light::Alert {
        for anomaly in &status.anomalies {
            warn!("{}", anomaly);
        }
    }
    roof.disconnect();
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ror_controller::Direction;

    #[test]
    fn test_sleep_while_stops_early() {
        let running = AtomicBool::new(false);
        let start = Instant::now();
        assert!(!sleep_while(&running, Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));

        let running = AtomicBool::new(true);
        assert!(sleep_while(&running, Duration::from_millis(1)));
    }

    #[test]
    fn test_describe_change() {
        let closed = RoofStatus {
            closed: true,
            summary: Light::Ok,
            ..Default::default()
        };
        assert_eq!(describe_change(&closed, &closed), None);

        let opening = RoofStatus {
            moving: Some(Direction::Open),
            summary: Light::Busy,
            ..Default::default()
        };
        assert_eq!(
            describe_change(&closed, &opening).as_deref(),
            Some("Roof opening, status Busy")
        );
    }
}
