//! Connecting endpoint: sits in a blocking read while the listener trickles data.

use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::MESSAGE_SIZE;
use crate::error::Error;
use crate::report::{ConnectorReport, EndReason};
use crate::Result;

/// Sleep `startup_delay`, connect to `addr` and issue up to `cycles` blocking reads.
///
/// End-of-stream or a read error ends the loop with
/// [`EndReason::PeerClosed`]; that is a normal outcome. Only the connect
/// itself can fail.
pub fn run_connector_at(
    addr: SocketAddr,
    cycles: u32,
    startup_delay: Duration,
) -> Result<ConnectorReport> {
    if !startup_delay.is_zero() {
        debug!("Waiting {:?} for the listener to come up", startup_delay);
        thread::sleep(startup_delay);
    }

    let mut stream =
        TcpStream::connect(addr).map_err(|source| Error::ConnectFailed { addr, source })?;
    info!("Connected to {}", addr);

    let mut buffer = [0u8; MESSAGE_SIZE];
    let mut attempts = 0;
    let mut reads = 0;
    let mut bytes_received = 0u64;
    let mut ended_by = EndReason::CycleLimit;

    while attempts < cycles {
        match stream.read(&mut buffer) {
            Ok(0) => {
                info!("Listener closed the stream after {} reads", reads);
                ended_by = EndReason::PeerClosed;
                break;
            }
            Ok(n) => {
                reads += 1;
                bytes_received += n as u64;
                debug!("Read {} bytes ({} total)", n, bytes_received);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                info!("Read failed after {} reads: {}", reads, e);
                ended_by = EndReason::PeerClosed;
                break;
            }
        }
        attempts += 1;
    }

    Ok(ConnectorReport {
        reads,
        bytes_received,
        ended_by,
    })
}
