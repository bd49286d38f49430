//! Relay configuration
//!
//! Everything comes from the command line; nothing is read from or written
//! to disk.

use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};
use crate::iface::{InterfaceAddress, Mode};

/// One side of the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Requested interface name (empty lets the OS pick one)
    pub name: String,
    /// IPv4 address in dotted decimal notation
    pub address: String,
}

impl EndpointConfig {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Complete relay configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// TUN or TAP for both interfaces
    pub mode: Mode,
    pub first: EndpointConfig,
    pub second: EndpointConfig,
    /// Netmask shared by both interfaces
    pub netmask: String,
    /// Periodic statistics interval; `None` disables the reports
    pub stats_interval: Option<Duration>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Tap,
            first: EndpointConfig::new("sdr_tap0", "192.168.10.1"),
            second: EndpointConfig::new("sdr_tap1", "192.168.20.1"),
            netmask: "255.255.255.0".to_string(),
            stats_interval: Some(crate::relay::DEFAULT_STATS_INTERVAL),
        }
    }
}

impl RelayConfig {
    /// Parse both endpoint addresses against the shared netmask.
    ///
    /// Identical interface names or addresses are rejected. Two addresses in
    /// the same subnet are allowed but usually leave the kernel with two
    /// routes for one prefix, so a warning is logged.
    pub fn validate(&self) -> Result<(InterfaceAddress, InterfaceAddress)> {
        let first = InterfaceAddress::parse(&self.first.address, &self.netmask)?;
        let second = InterfaceAddress::parse(&self.second.address, &self.netmask)?;

        if !self.first.name.is_empty() && self.first.name == self.second.name {
            return Err(Error::invalid_argument(format!(
                "both interfaces are named {:?}",
                self.first.name
            )));
        }
        if first.address == second.address {
            return Err(Error::invalid_argument(format!(
                "both interfaces use address {}",
                first.address
            )));
        }
        if first.is_same_network(&second.address) {
            warn!(
                network = %first.network_address(),
                prefix = first.prefix_len(),
                "both interfaces share a subnet"
            );
        }

        Ok((first, second))
    }
}
