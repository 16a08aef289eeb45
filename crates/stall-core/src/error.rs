//! Error types for scenario setup.
//!
//! Every variant is a setup failure and therefore fatal. A peer closing the
//! stream mid-scenario is not an error; it is recorded as
//! [`EndReason::PeerClosed`](crate::report::EndReason::PeerClosed).

use std::net::SocketAddr;

use thiserror::Error;

/// Exit code used when no usable network interface exists.
pub const EXIT_NO_INTERFACE: i32 = 2;

/// Exit code used for every other setup failure.
pub const EXIT_SETUP_FAILURE: i32 = 1;

/// Errors that can occur while setting up or running a scenario
#[derive(Error, Debug)]
pub enum Error {
    #[error("No non-loopback IPv4 interface found")]
    NoInterfaceFound,

    #[error("Interface scan failed: {0}")]
    InterfaceScan(#[source] nix::Error),

    #[error("Bind to {addr} failed: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Listen on {addr} failed: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: nix::Error,
    },

    #[error("Accept failed: {0}")]
    Accept(#[source] std::io::Error),

    #[error("Connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn worker {index}: {source}")]
    WorkerSpawnFailed {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Fork failed: {0}")]
    Fork(#[source] nix::Error),

    #[error("Waiting for peer process failed: {0}")]
    Wait(#[source] nix::Error),

    #[error("Peer {role} exited abnormally: {detail}")]
    PeerFailed { role: &'static str, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Process exit code a fixture binary reports for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NoInterfaceFound => EXIT_NO_INTERFACE,
            _ => EXIT_SETUP_FAILURE,
        }
    }
}
