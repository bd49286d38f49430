//! OS device handles behind a small trait, so the lifecycle and capture
//! logic can run against kernel TUN/TAP devices or an in-process stand-in.

use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;

use tun_tap::Iface;

use super::netconf;

/// Frame semantics of a virtual device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Layer 3: IP packets only
    Tun,
    /// Layer 2: full Ethernet frames
    Tap,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Tun => f.write_str("TUN"),
            Mode::Tap => f.write_str("TAP"),
        }
    }
}

impl From<Mode> for tun_tap::Mode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Tun => tun_tap::Mode::Tun,
            Mode::Tap => tun_tap::Mode::Tap,
        }
    }
}

/// An open, non-blocking virtual device.
///
/// `recv` and `send` may be called concurrently from different threads.
pub trait Device: Send + Sync {
    /// Name the OS actually assigned.
    fn name(&self) -> &str;

    /// Read one frame. `WouldBlock` when nothing is queued.
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write one frame, returning how many bytes the OS accepted.
    fn send(&self, buf: &[u8]) -> io::Result<usize>;

    fn get_flags(&self) -> io::Result<i16>;

    fn set_flags(&self, flags: i16) -> io::Result<()>;

    fn set_address(&self, addr: Ipv4Addr) -> io::Result<()>;

    fn set_netmask(&self, mask: Ipv4Addr) -> io::Result<()>;
}

/// Opens devices on behalf of a `VirtualInterface`.
pub trait DeviceProvider: Send + Sync {
    /// Open a device, asking for `name` (empty lets the OS choose).
    fn open(&self, name: &str, mode: Mode) -> io::Result<Arc<dyn Device>>;
}

/// Kernel TUN/TAP device opened through `/dev/net/tun`.
pub struct TunTapDevice {
    iface: Iface,
}

impl TunTapDevice {
    /// Create the device without packet info headers and switch it to non-blocking I/O.
    pub fn open(name: &str, mode: Mode) -> io::Result<Self> {
        let iface = Iface::without_packet_info(name, mode.into())?;
        iface.set_non_blocking()?;
        Ok(TunTapDevice { iface })
    }
}

impl Device for TunTapDevice {
    fn name(&self) -> &str {
        self.iface.name()
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.iface.recv(buf)
    }

    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        self.iface.send(buf)
    }

    fn get_flags(&self) -> io::Result<i16> {
        netconf::get_flags(self.name())
    }

    fn set_flags(&self, flags: i16) -> io::Result<()> {
        netconf::set_flags(self.name(), flags)
    }

    fn set_address(&self, addr: Ipv4Addr) -> io::Result<()> {
        netconf::set_address(self.name(), addr)
    }

    fn set_netmask(&self, mask: Ipv4Addr) -> io::Result<()> {
        netconf::set_netmask(self.name(), mask)
    }
}

/// Default provider backed by the kernel clone device.
#[derive(Debug, Default, Clone, Copy)]
pub struct TunTapProvider;

impl DeviceProvider for TunTapProvider {
    fn open(&self, name: &str, mode: Mode) -> io::Result<Arc<dyn Device>> {
        Ok(Arc::new(TunTapDevice::open(name, mode)?))
    }
}
