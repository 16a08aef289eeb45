//! Listening endpoint: accepts one connection and feeds it slowly.

use std::io::Write;
use std::net::{SocketAddr, SocketAddrV4, TcpListener};
use std::thread;
use std::time::Duration;

use nix::sys::socket::{listen, Backlog};
use tracing::{debug, info};

use super::message_buffer;
use crate::config::LISTEN_BACKLOG;
use crate::error::Error;
use crate::report::{EndReason, ListenerReport};
use crate::Result;

/// A bound, listening stream socket that has not accepted yet
#[derive(Debug)]
pub struct Listener {
    socket: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Create a stream socket, bind it to `addr` and listen with a backlog of one.
    pub fn bind(addr: SocketAddrV4) -> Result<Self> {
        // std sets SO_REUSEADDR, so a rerun can bind while the previous
        // connection sits in TIME_WAIT.
        let socket = TcpListener::bind(addr).map_err(|source| Error::Bind {
            addr: addr.into(),
            source,
        })?;

        // std listens with its own default backlog; shrink it to one.
        let backlog = Backlog::new(LISTEN_BACKLOG).map_err(|source| Error::Listen {
            addr: addr.into(),
            source,
        })?;
        listen(&socket, backlog).map_err(|source| Error::Listen {
            addr: addr.into(),
            source,
        })?;

        let local_addr = socket.local_addr()?;
        debug!("Listening on {} (backlog {})", local_addr, LISTEN_BACKLOG);

        Ok(Self { socket, local_addr })
    }

    /// Address actually bound; differs from the requested one when port 0 was used.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept exactly one connection, then write the message buffer once per
    /// tick for `cycles` cycles.
    ///
    /// A failed write ends the loop early with [`EndReason::PeerClosed`]. Both
    /// the accepted stream and the listening socket are closed on return.
    pub fn serve(self, cycles: u32, tick: Duration) -> Result<ListenerReport> {
        info!("Waiting for a connection on {}", self.local_addr);
        let (mut conn, peer) = self.socket.accept().map_err(Error::Accept)?;
        info!("Accepted connection from {}", peer);

        let message = message_buffer();
        let mut messages_sent = 0;
        let mut ended_by = EndReason::CycleLimit;

        for cycle in 0..cycles {
            if let Err(e) = conn.write_all(&message) {
                info!("Peer closed the stream after {} cycles: {}", cycle, e);
                ended_by = EndReason::PeerClosed;
                break;
            }
            messages_sent += 1;
            debug!("Sent message {}/{}", messages_sent, cycles);
            thread::sleep(tick);
        }

        Ok(ListenerReport {
            messages_sent,
            ended_by,
        })
    }
}
