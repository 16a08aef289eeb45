//! Socket blocking scenario.
//!
//! A listener accepts one connection and writes a small buffer once per tick;
//! a connector reads from it in blocking mode, so for most of the scenario it
//! is parked in `read(2)`. The only coordination between the two is the
//! connector's startup delay and the blocking semantics of the socket calls.

pub mod connector;
pub mod listener;

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::process;
use std::thread;

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, pipe, ForkResult};
use tracing::{debug, error, info};

use crate::config::{Composition, Role, SocketScenarioConfig, MESSAGE_SIZE};
use crate::error::Error;
use crate::netif::{discover_address, InterfaceSource, SystemInterfaces};
use crate::report::{ConnectorReport, ListenerReport, SocketReport};
use crate::Result;

pub use connector::run_connector_at;
pub use listener::Listener;

/// Leading bytes of every message; the rest of the buffer is zero.
pub const MESSAGE_LITERAL: &[u8] = b"nothing";

/// The fixed-size buffer the listener writes.
pub fn message_buffer() -> [u8; MESSAGE_SIZE] {
    let mut buffer = [0u8; MESSAGE_SIZE];
    buffer[..MESSAGE_LITERAL.len()].copy_from_slice(MESSAGE_LITERAL);
    buffer
}

/// Configured address, or the first non-loopback IPv4 address of `source`.
pub fn resolve_address(
    config: &SocketScenarioConfig,
    source: &dyn InterfaceSource,
) -> Result<Ipv4Addr> {
    match config.address {
        Some(ip) => {
            info!("Using configured address {}", ip);
            Ok(ip)
        }
        None => discover_address(source),
    }
}

/// Bind `endpoint`, accept one connection and feed it for `config.cycles` ticks.
pub fn run_listener(
    config: &SocketScenarioConfig,
    endpoint: SocketAddrV4,
) -> Result<ListenerReport> {
    Listener::bind(endpoint)?.serve(config.cycles, config.tick)
}

/// Connect to `endpoint` after the startup delay and block in reads.
pub fn run_connector(
    config: &SocketScenarioConfig,
    endpoint: SocketAddrV4,
) -> Result<ConnectorReport> {
    run_connector_at(endpoint.into(), config.cycles, config.connect_delay())
}

/// Run the scenario against the host's interface table.
pub fn run_socket_scenario(config: &SocketScenarioConfig) -> Result<SocketReport> {
    run_socket_scenario_with(config, &SystemInterfaces)
}

/// Run the roles selected by `config`, discovering the address through `source`.
///
/// Address resolution happens before any socket is created, so a host
/// without a usable interface fails with [`Error::NoInterfaceFound`] and no
/// side effects.
pub fn run_socket_scenario_with(
    config: &SocketScenarioConfig,
    source: &dyn InterfaceSource,
) -> Result<SocketReport> {
    config.validate()?;
    let ip = resolve_address(config, source)?;
    let endpoint = SocketAddrV4::new(ip, config.port);

    let mut report = SocketReport {
        address: endpoint.into(),
        role: config.role,
        composition: config.composition,
        listener: None,
        connector: None,
        peer_exit_code: None,
    };

    match config.role {
        Role::Listener => {
            report.listener = Some(run_listener(config, endpoint)?);
        }
        Role::Connector => {
            report.connector = Some(run_connector(config, endpoint)?);
        }
        Role::Both => {
            // Bound before the connector starts so an ephemeral port can be handed over.
            let listener = Listener::bind(endpoint)?;
            report.address = listener.local_addr();
            match config.composition {
                Composition::Threads => run_threaded(config, listener, &mut report)?,
                Composition::Fork => run_forked(config, listener, &mut report)?,
            }
        }
    }

    Ok(report)
}

fn run_threaded(
    config: &SocketScenarioConfig,
    listener: Listener,
    report: &mut SocketReport,
) -> Result<()> {
    let address = listener.local_addr();
    let cycles = config.cycles;
    let delay = config.connect_delay();

    let connector = thread::Builder::new()
        .name("connector".to_string())
        .spawn(move || run_connector_at(address, cycles, delay))?;

    let listener_result = listener.serve(config.cycles, config.tick);
    let connector_result = connector.join().map_err(|_| Error::PeerFailed {
        role: "connector",
        detail: "thread panicked".to_string(),
    })?;

    report.listener = Some(listener_result?);
    report.connector = Some(connector_result?);
    Ok(())
}

/// Write `report` as one JSON line.
pub fn send_connector_report<W: Write>(mut writer: W, report: &ConnectorReport) -> Result<()> {
    serde_json::to_writer(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read the report a forked connector sent, if it sent one before exiting.
pub fn receive_connector_report<R: Read>(reader: R) -> Result<Option<ConnectorReport>> {
    let mut line = String::new();
    if BufReader::new(reader).read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line.trim_end())?))
}

fn run_forked(
    config: &SocketScenarioConfig,
    listener: Listener,
    report: &mut SocketReport,
) -> Result<()> {
    let address: SocketAddr = listener.local_addr();
    let (report_rx, report_tx) = pipe().map_err(std::io::Error::from)?;

    // SAFETY: callers fork from a single-threaded process; the child only
    // runs the connector loop and exits without returning to the caller.
    let forked = unsafe { fork() }.map_err(Error::Fork)?;
    match forked {
        ForkResult::Child => {
            drop(listener);
            drop(report_rx);
            let code = match run_connector_at(address, config.cycles, config.connect_delay()) {
                Ok(connector) => {
                    info!(
                        "Connector finished: {} reads, {} bytes, {:?}",
                        connector.reads, connector.bytes_received, connector.ended_by
                    );
                    match send_connector_report(File::from(report_tx), &connector) {
                        Ok(()) => 0,
                        Err(e) => {
                            error!("Failed to hand the connector report over: {}", e);
                            e.exit_code()
                        }
                    }
                }
                Err(e) => {
                    error!("Connector failed: {}", e);
                    e.exit_code()
                }
            };
            process::exit(code);
        }
        ForkResult::Parent { child } => {
            drop(report_tx);
            info!("Forked connector process {}", child);
            let listener_result = listener.serve(config.cycles, config.tick);

            // The child holds the only write end; EOF arrives once it exits.
            let received = receive_connector_report(File::from(report_rx));

            let code = match waitpid(child, None).map_err(Error::Wait)? {
                WaitStatus::Exited(_, code) => code,
                other => {
                    return Err(Error::PeerFailed {
                        role: "connector",
                        detail: format!("{:?}", other),
                    })
                }
            };
            report.peer_exit_code = Some(code);
            report.listener = Some(listener_result?);

            if code != 0 {
                return Err(Error::PeerFailed {
                    role: "connector",
                    detail: format!("exit code {}", code),
                });
            }
            match received? {
                Some(connector) => {
                    debug!("Connector report received from process {}", child);
                    report.connector = Some(connector);
                    Ok(())
                }
                None => Err(Error::PeerFailed {
                    role: "connector",
                    detail: "exited without sending its report".to_string(),
                }),
            }
        }
    }
}
