//! Configuration types for the blocking scenarios.
//!
//! Defaults reproduce the fixed constants of the fixtures: port 9999, 30
//! cycles of one second, 8 workers over 2 locks.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Result;

pub const DEFAULT_PORT: u16 = 9999;
pub const DEFAULT_CYCLES: u32 = 30;
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_CONNECT_DELAY_TICKS: u32 = 2;
pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_LOCKS: usize = 2;

/// Size of the send and receive buffers.
pub const MESSAGE_SIZE: usize = 100;

/// Backlog passed to `listen(2)`; a single pending connection is expected.
pub const LISTEN_BACKLOG: i32 = 1;

/// Which socket endpoint(s) an entry point runs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Listener,
    Connector,
    Both,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Listener => "listener",
            Role::Connector => "connector",
            Role::Both => "both",
        }
    }
}

/// How the two socket endpoints are hosted when [`Role::Both`] is selected
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    /// Parent process listens, forked child connects.
    Fork,
    /// Two named threads of the current process.
    Threads,
}

/// Socket blocking scenario settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SocketScenarioConfig {
    /// Explicit address; discovered from the first non-loopback interface when unset.
    pub address: Option<Ipv4Addr>,
    pub port: u16,
    /// Write cycles on the listener side, read attempts on the connector side.
    pub cycles: u32,
    pub tick: Duration,
    /// Ticks the connector sleeps before connecting.
    pub connect_delay_ticks: u32,
    pub role: Role,
    pub composition: Composition,
}

impl Default for SocketScenarioConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: DEFAULT_PORT,
            cycles: DEFAULT_CYCLES,
            tick: DEFAULT_TICK,
            connect_delay_ticks: DEFAULT_CONNECT_DELAY_TICKS,
            role: Role::Both,
            composition: Composition::Fork,
        }
    }
}

impl SocketScenarioConfig {
    pub fn connect_delay(&self) -> Duration {
        self.tick.saturating_mul(self.connect_delay_ticks)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cycles == 0 {
            return Err(Error::config("cycles must be greater than zero"));
        }
        if self.tick.checked_mul(self.connect_delay_ticks).is_none() {
            return Err(Error::config(format!(
                "connect delay of {} ticks of {:?} overflows",
                self.connect_delay_ticks, self.tick
            )));
        }
        // An ephemeral port is only known to a connector started from the same entry point.
        if self.port == 0 && self.role != Role::Both {
            return Err(Error::config(format!(
                "port 0 requires role 'both', got '{}'",
                self.role.as_str()
            )));
        }
        Ok(())
    }
}

/// How the contention coordinator decides the scenario is over
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// Join every worker thread.
    Join,
    /// Sleep a fixed number of ticks and return without joining. Workers may
    /// still be running when the report is taken.
    TimedWait { ticks: u32 },
}

impl CompletionMode {
    /// The original coordinator behavior: wait as many ticks as a worker has cycles.
    pub fn legacy() -> Self {
        CompletionMode::TimedWait {
            ticks: DEFAULT_CYCLES,
        }
    }
}

/// Semaphore contention scenario settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentionConfig {
    pub workers: usize,
    pub locks: usize,
    /// Acquire/hold/release cycles per worker.
    pub cycles: u32,
    pub tick: Duration,
    pub completion: CompletionMode,
}

impl Default for ContentionConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            locks: DEFAULT_LOCKS,
            cycles: DEFAULT_CYCLES,
            tick: DEFAULT_TICK,
            completion: CompletionMode::Join,
        }
    }
}

impl ContentionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::config("at least one worker is required"));
        }
        if self.locks == 0 {
            return Err(Error::config("at least one lock is required"));
        }
        if self.cycles == 0 {
            return Err(Error::config("cycles must be greater than zero"));
        }
        if let CompletionMode::TimedWait { ticks } = self.completion {
            if self.tick.checked_mul(ticks).is_none() {
                return Err(Error::config(format!(
                    "timed wait of {} ticks of {:?} overflows",
                    ticks, self.tick
                )));
            }
        }
        Ok(())
    }

    /// Lock index worker `worker` is bound to.
    pub fn lock_for(&self, worker: usize) -> usize {
        worker % self.locks
    }
}
