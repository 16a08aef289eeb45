//! Drive the fixture binaries the way the orchestrator does, over loopback
//! and with a short tick.

use std::net::TcpListener;
use std::process::{Command, Output};

use stall_core::{Composition, ContentionReport, EndReason, SocketReport};

fn free_loopback_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn run(binary: &str, args: &[&str]) -> Output {
    Command::new(binary)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to start {}: {}", binary, e))
}

#[test]
fn test_forked_connector_reports_received_data() {
    let port = free_loopback_port().to_string();
    let output = run(
        env!("CARGO_BIN_EXE_net_blocker"),
        &[
            "--address",
            "127.0.0.1",
            "--port",
            &port,
            "--tick-ms",
            "10",
            "--cycles",
            "3",
            "--json",
        ],
    );
    assert!(
        output.status.success(),
        "net_blocker failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).unwrap();
    let report: SocketReport = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(report.composition, Composition::Fork);
    assert_eq!(report.peer_exit_code, Some(0));

    let connector = report.connector.as_ref().expect("connector report");
    assert!(connector.reads >= 1);
    assert!(connector.bytes_received >= 100);
    assert_eq!(report.listener.as_ref().map(|l| l.messages_sent), Some(3));
    assert!(report.exchanged_data());
}

#[test]
fn test_threaded_composition_reports_both_sides() {
    let port = free_loopback_port().to_string();
    let output = run(
        env!("CARGO_BIN_EXE_net_blocker"),
        &[
            "--composition",
            "threads",
            "--address",
            "127.0.0.1",
            "--port",
            &port,
            "--tick-ms",
            "10",
            "--cycles",
            "2",
            "--json",
        ],
    );
    assert!(output.status.success());

    let report: SocketReport =
        serde_json::from_str(String::from_utf8(output.stdout).unwrap().trim()).unwrap();
    assert_eq!(report.peer_exit_code, None);
    let connector = report.connector.expect("connector report");
    assert!(connector.bytes_received >= 100);
    assert_eq!(connector.ended_by, EndReason::CycleLimit);
}

#[test]
fn test_connector_without_listener_exits_with_setup_failure() {
    let port = free_loopback_port().to_string();
    let output = run(
        env!("CARGO_BIN_EXE_net_blocker"),
        &[
            "--role",
            "connector",
            "--address",
            "127.0.0.1",
            "--port",
            &port,
            "--tick-ms",
            "1",
            "--json",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_sem_contention_completes_every_cycle() {
    let output = run(
        env!("CARGO_BIN_EXE_sem_contention"),
        &["--tick-ms", "1", "--cycles", "3", "--json"],
    );
    assert!(output.status.success());

    let report: ContentionReport =
        serde_json::from_str(String::from_utf8(output.stdout).unwrap().trim()).unwrap();
    assert_eq!(report.workers.len(), 8);
    assert_eq!(report.total_acquisitions(), 24);
    assert!(report.mutual_exclusion_held());
    assert!(report.all_finished());
}

#[test]
fn test_overflowing_timed_wait_is_a_config_error() {
    let output = run(
        env!("CARGO_BIN_EXE_sem_contention"),
        &[
            "--legacy-timed-wait",
            "--wait-ticks",
            "4294967295",
            "--tick-ms",
            "18446744073709551615",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
}
