//! Integration tests for configuration loading and one-shot commands.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::AtomicBool;
use std::thread;

use ror_controller::{Light, RoofError};
use ror_runner::{
    build_roof, load_config, run, run_once, OneShot, RunnerConfig, RunnerError, TransportConfig,
};

fn simulated_config() -> RunnerConfig {
    let mut config = RunnerConfig::default();
    config.transport = TransportConfig::Simulated;
    config.roof.simulated_travel_secs = 0;
    config.roof.active_tick_ms = 10;
    config.roof.idle_tick_ms = 10;
    config
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_load_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "transport:\n  type: simulated\nsession:\n  settle_delay_ms: 250\nroof:\n  motion_timeout_secs: 75\n  action_labels: [Flat panel]"
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.transport, TransportConfig::Simulated);
    assert_eq!(config.session.settle_delay_ms, 250);
    assert_eq!(config.session.read_timeout_ms, 3000);
    assert_eq!(config.roof.motion_timeout_secs, 75);
    assert_eq!(config.roof.action_label(1), "Flat panel");
}

#[test]
fn test_load_config_rejects_invalid_timeout() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "roof:\n  motion_timeout_secs: 0").unwrap();

    assert!(matches!(
        load_config(file.path()),
        Err(RunnerError::Roof(RoofError::InvalidConfig(_)))
    ));
}

#[test]
fn test_load_config_missing_file() {
    assert!(matches!(
        load_config(std::path::Path::new("/nonexistent/rord.yaml")),
        Err(RunnerError::ConfigRead { .. })
    ));
}

// ============================================================================
// Simulated roof
// ============================================================================

#[test]
fn test_open_simulated_roof() {
    let running = AtomicBool::new(true);
    let mut roof = build_roof(&simulated_config()).unwrap();

    let status = run_once(&mut roof, OneShot::Open, &running).unwrap();
    assert!(status.opened);
    assert!(!status.closed);
    assert_eq!(status.summary, Light::Ok);
    assert!(!roof.is_connected());
}

#[test]
fn test_close_closed_simulated_roof() {
    let running = AtomicBool::new(true);
    let mut roof = build_roof(&simulated_config()).unwrap();

    assert!(matches!(
        run_once(&mut roof, OneShot::Close, &running),
        Err(RunnerError::Roof(RoofError::AlreadyClosed))
    ));
}

#[test]
fn test_status_simulated_roof() {
    let running = AtomicBool::new(true);
    let mut roof = build_roof(&simulated_config()).unwrap();

    let status = run_once(&mut roof, OneShot::Status, &running).unwrap();
    assert!(status.closed);
    assert!(status.anomalies.is_empty());
}

#[test]
fn test_run_stops_when_not_running() {
    let running = AtomicBool::new(false);
    let mut roof = build_roof(&simulated_config()).unwrap();

    run(&mut roof, &running).unwrap();
    assert!(!roof.is_connected());
}

// ============================================================================
// TCP bridge
// ============================================================================

/// Answer requests like a closed, unlocked roof until the client hangs up.
fn serve_closed_roof(listener: TcpListener) -> Vec<String> {
    let (mut socket, _) = listener.accept().unwrap();
    let mut requests = Vec::new();
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while let Ok(1) = socket.read(&mut byte) {
        line.push(byte[0]);
        if byte[0] != b')' {
            continue;
        }
        let request = String::from_utf8_lossy(&line).to_string();
        line.clear();
        let reply = match request.as_str() {
            "(CON:0:0)" => "(ACK:0:V1.3-0[ACT1])".to_string(),
            "(GET:CLOSED:0)" => "(ACK:CLOSED:ON)".to_string(),
            r if r.starts_with("(GET:") => {
                let target = &r[5..r.len() - 3];
                format!("(ACK:{}:OFF)", target)
            }
            _ => "(NAK:ERROR:UNEXPECTED)".to_string(),
        };
        requests.push(request);
        if socket.write_all(reply.as_bytes()).is_err() {
            break;
        }
    }
    requests
}

#[test]
fn test_status_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let server = thread::spawn(move || serve_closed_roof(listener));

    let mut config = RunnerConfig::default();
    config.transport = TransportConfig::Tcp { address };
    config.session.read_timeout_ms = 1000;
    config.session.settle_delay_ms = 0;
    config.session.handshake_retry_delay_ms = 0;

    let running = AtomicBool::new(true);
    let mut roof = build_roof(&config).unwrap();
    let status = run_once(&mut roof, OneShot::Status, &running).unwrap();

    assert!(status.closed);
    assert!(!status.opened);
    assert_eq!(status.actions.len(), 1);
    assert_eq!(status.summary, Light::Ok);

    let requests = server.join().unwrap();
    assert_eq!(requests[0], "(CON:0:0)");
    assert!(requests.contains(&"(GET:ACT1STATE:0)".to_string()));
}
