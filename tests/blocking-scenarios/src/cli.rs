//! Command line arguments of the fixture binaries.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

pub use clap::Parser;
use clap::ValueEnum;
use stall_core::config::{
    DEFAULT_CONNECT_DELAY_TICKS, DEFAULT_CYCLES, DEFAULT_LOCKS, DEFAULT_PORT, DEFAULT_WORKERS,
};
use stall_core::{CompletionMode, Composition, ContentionConfig, Role, SocketScenarioConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Listener,
    Connector,
    Both,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Listener => Role::Listener,
            RoleArg::Connector => Role::Connector,
            RoleArg::Both => Role::Both,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CompositionArg {
    Fork,
    Threads,
}

impl From<CompositionArg> for Composition {
    fn from(composition: CompositionArg) -> Self {
        match composition {
            CompositionArg::Fork => Composition::Fork,
            CompositionArg::Threads => Composition::Threads,
        }
    }
}

/// Hold a TCP connector blocked in read while a listener feeds it slowly
#[derive(Parser, Debug)]
#[command(name = "net_blocker")]
#[command(author, version, about, long_about = None)]
pub struct NetBlockerArgs {
    /// Endpoint(s) to run
    #[arg(long, value_enum, default_value = "both")]
    pub role: RoleArg,

    /// How to host both endpoints when --role both
    #[arg(long, value_enum, default_value = "fork")]
    pub composition: CompositionArg,

    /// IPv4 address to bind/connect; defaults to the first non-loopback interface
    #[arg(long)]
    pub address: Option<Ipv4Addr>,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Send cycles on the listener, read attempts on the connector
    #[arg(long, default_value_t = DEFAULT_CYCLES)]
    pub cycles: u32,

    /// Length of one tick in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub tick_ms: u64,

    /// Ticks the connector waits before connecting
    #[arg(long, default_value_t = DEFAULT_CONNECT_DELAY_TICKS)]
    pub connect_delay_ticks: u32,

    /// Print the scenario report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl NetBlockerArgs {
    pub fn to_config(&self) -> SocketScenarioConfig {
        SocketScenarioConfig {
            address: self.address,
            port: self.port,
            cycles: self.cycles,
            tick: Duration::from_millis(self.tick_ms),
            connect_delay_ticks: self.connect_delay_ticks,
            role: self.role.into(),
            composition: self.composition.into(),
        }
    }
}

/// Keep worker threads queued on shared binary semaphores
#[derive(Parser, Debug)]
#[command(name = "sem_contention")]
#[command(author, version, about, long_about = None)]
pub struct SemContentionArgs {
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    #[arg(long, default_value_t = DEFAULT_LOCKS)]
    pub locks: usize,

    /// Acquire/hold/release cycles per worker
    #[arg(long, default_value_t = DEFAULT_CYCLES)]
    pub cycles: u32,

    /// Length of one tick in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub tick_ms: u64,

    /// Sleep a fixed number of ticks instead of joining the workers
    #[arg(long)]
    pub legacy_timed_wait: bool,

    /// Ticks to sleep with --legacy-timed-wait
    #[arg(long, default_value_t = DEFAULT_CYCLES, requires = "legacy_timed_wait")]
    pub wait_ticks: u32,

    /// Print the scenario report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl SemContentionArgs {
    pub fn to_config(&self) -> ContentionConfig {
        let completion = if self.legacy_timed_wait {
            CompletionMode::TimedWait {
                ticks: self.wait_ticks,
            }
        } else {
            CompletionMode::Join
        };

        ContentionConfig {
            workers: self.workers,
            locks: self.locks,
            cycles: self.cycles,
            tick: Duration::from_millis(self.tick_ms),
            completion,
        }
    }
}

/// Run both fixtures through their binaries and check their reports
#[derive(Parser, Debug)]
#[command(name = "scenario_orchestrator")]
#[command(author, version, about, long_about = None)]
pub struct OrchestratorArgs {
    /// Tick passed to the fixtures, in milliseconds
    #[arg(long, default_value_t = 20)]
    pub tick_ms: u64,

    /// Cycles passed to the fixtures
    #[arg(long, default_value_t = 5)]
    pub cycles: u32,

    /// Times each fixture is run back to back
    #[arg(long, default_value_t = 2)]
    pub runs: u32,

    /// Per-run timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Port for the socket fixture
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory holding the fixture binaries; defaults to this executable's directory
    #[arg(long)]
    pub bin_dir: Option<PathBuf>,
}
