//! Scenario outcome records.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::config::{CompletionMode, Composition, Role};
use crate::Result;

/// Why a socket endpoint stopped its loop
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// All configured cycles ran.
    CycleLimit,
    /// The other side went away first.
    PeerClosed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerReport {
    pub messages_sent: u32,
    pub ended_by: EndReason,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorReport {
    /// Reads that returned data.
    pub reads: u32,
    pub bytes_received: u64,
    pub ended_by: EndReason,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SocketReport {
    pub address: SocketAddr,
    pub role: Role,
    pub composition: Composition,
    pub listener: Option<ListenerReport>,
    pub connector: Option<ConnectorReport>,
    /// Exit code of the forked connector, when one was reaped.
    pub peer_exit_code: Option<i32>,
}

impl SocketReport {
    /// At least one message made it across the stream.
    ///
    /// When the connector reported back, only bytes it actually received
    /// count; a successful write alone does not.
    pub fn exchanged_data(&self) -> bool {
        match (&self.listener, &self.connector) {
            (_, Some(connector)) => connector.bytes_received > 0,
            (Some(listener), None) => listener.messages_sent > 0,
            (None, None) => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub index: usize,
    pub lock: usize,
    /// Completed acquire/hold/release cycles.
    pub cycles: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockReport {
    pub index: usize,
    pub acquisitions: u64,
    /// Largest number of workers observed holding the lock at once.
    pub peak_holders: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentionReport {
    pub completion: CompletionMode,
    pub workers: Vec<WorkerReport>,
    pub locks: Vec<LockReport>,
    pub finished_workers: usize,
}

impl ContentionReport {
    pub fn total_acquisitions(&self) -> u64 {
        self.locks.iter().map(|lock| lock.acquisitions).sum()
    }

    /// No lock was ever held by more than one worker.
    pub fn mutual_exclusion_held(&self) -> bool {
        self.locks.iter().all(|lock| lock.peak_holders <= 1)
    }

    pub fn all_finished(&self) -> bool {
        self.finished_workers == self.workers.len()
    }
}

/// Render a report as a single JSON line.
pub fn to_json_line<T: Serialize>(report: &T) -> Result<String> {
    Ok(serde_json::to_string(report)?)
}
