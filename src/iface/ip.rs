//! IPv4 address and netmask pair assigned to an interface.

use std::fmt;
use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// Address configuration for one interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddress {
    /// Local IPv4 address
    pub address: Ipv4Addr,
    /// Network mask
    pub netmask: Ipv4Addr,
}

impl InterfaceAddress {
    /// Build from already parsed values, rejecting non-contiguous masks.
    pub fn new(address: Ipv4Addr, netmask: Ipv4Addr) -> Result<Self> {
        let bits = u32::from(netmask);
        if bits.leading_ones() + bits.trailing_zeros() != 32 {
            return Err(Error::invalid_argument(format!(
                "netmask {netmask} is not contiguous"
            )));
        }
        Ok(InterfaceAddress { address, netmask })
    }

    /// Parse dotted-decimal address and netmask strings.
    pub fn parse(address: &str, netmask: &str) -> Result<Self> {
        let addr: Ipv4Addr = address
            .trim()
            .parse()
            .map_err(|_| Error::invalid_argument(format!("invalid IPv4 address {address:?}")))?;
        let mask: Ipv4Addr = netmask
            .trim()
            .parse()
            .map_err(|_| Error::invalid_argument(format!("invalid netmask {netmask:?}")))?;
        Self::new(addr, mask)
    }

    pub fn prefix_len(&self) -> u32 {
        u32::from(self.netmask).leading_ones()
    }

    pub fn network_address(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) & u32::from(self.netmask))
    }

    /// Directed broadcast address for our network
    pub fn broadcast_address(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) | !u32::from(self.netmask))
    }

    /// Check if address is in the same network
    pub fn is_same_network(&self, addr: &Ipv4Addr) -> bool {
        u32::from(*addr) & u32::from(self.netmask) == u32::from(self.network_address())
    }
}

impl fmt::Display for InterfaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len())
    }
}
