//! Endpoint address discovery.

use std::net::{Ipv4Addr, SocketAddrV4};

use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;
use tracing::{debug, info};

use crate::error::Error;
use crate::Result;

/// One IPv4-capable entry of the interface table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub name: String,
    pub loopback: bool,
    /// `None` for entries whose address family is not IPv4.
    pub ipv4: Option<Ipv4Addr>,
}

impl InterfaceRecord {
    fn is_usable(&self) -> bool {
        match self.ipv4 {
            Some(ip) => !self.loopback && self.name != "lo" && !ip.is_loopback(),
            None => false,
        }
    }
}

/// Source of interface records
pub trait InterfaceSource {
    fn interfaces(&self) -> Result<Vec<InterfaceRecord>>;
}

/// Interface table of the running host, read with `getifaddrs(3)`
#[derive(Debug, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> Result<Vec<InterfaceRecord>> {
        let addrs = getifaddrs().map_err(Error::InterfaceScan)?;
        Ok(addrs
            .map(|ifa| {
                let ipv4 = ifa
                    .address
                    .as_ref()
                    .and_then(|addr| addr.as_sockaddr_in())
                    .map(|sin| *SocketAddrV4::from(*sin).ip());
                InterfaceRecord {
                    loopback: ifa.flags.contains(InterfaceFlags::IFF_LOOPBACK),
                    name: ifa.interface_name,
                    ipv4,
                }
            })
            .collect())
    }
}

/// Fixed interface table, for environments where discovery is decided up front
#[derive(Clone, Debug, Default)]
pub struct StaticInterfaces(pub Vec<InterfaceRecord>);

impl InterfaceSource for StaticInterfaces {
    fn interfaces(&self) -> Result<Vec<InterfaceRecord>> {
        Ok(self.0.clone())
    }
}

/// Pick the first record carrying a non-loopback IPv4 address.
pub fn select_address(records: &[InterfaceRecord]) -> Option<&InterfaceRecord> {
    records.iter().find(|record| record.is_usable())
}

/// Return the address of the first non-loopback IPv4 interface.
pub fn discover_address(source: &dyn InterfaceSource) -> Result<Ipv4Addr> {
    let records = source.interfaces()?;
    debug!("Scanned {} interface entries", records.len());

    let record = select_address(&records).ok_or(Error::NoInterfaceFound)?;
    let ip = record.ipv4.ok_or(Error::NoInterfaceFound)?;
    info!("Using interface {} with address {}", record.name, ip);
    Ok(ip)
}
