//! Synthetic blocking-scenario generators.
//!
//! Two independent fixtures drive execution units into well-defined waiting
//! states for a bounded window so that an external monitor can observe them:
//!
//! - [`socket`]: a listener feeds a connector slowly, keeping the connector
//!   blocked in `read(2)`.
//! - [`contention`]: worker threads contend for counting semaphores used as
//!   mutexes, holding each acquisition for one tick.

#![cfg(target_os = "linux")]

pub mod config;
pub mod contention;
pub mod error;
pub mod netif;
pub mod report;
pub mod semaphore;
pub mod socket;

pub use config::{CompletionMode, Composition, ContentionConfig, Role, SocketScenarioConfig};
pub use error::Error;
pub use report::{ContentionReport, EndReason, SocketReport};

pub type Result<T> = std::result::Result<T, error::Error>;
