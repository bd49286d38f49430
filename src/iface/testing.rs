//! In-process stand-in for kernel devices.
//!
//! Each device is one end of a non-blocking `UnixDatagram` pair; the other
//! end is handed to the test as "the wire", so writing to the peer looks
//! like traffic arriving on the interface and reading from it observes
//! frames the interface sent. Datagram boundaries are preserved, including
//! empty ones.

use std::collections::HashMap;
use std::io;
use std::net::Ipv4Addr;
use std::os::unix::net::UnixDatagram;
use std::sync::atomic::{AtomicI16, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use super::device::{Device, DeviceProvider, Mode};
use crate::error::ConfigStep;

/// Holds every `send` until opened, so a test can catch a write in flight.
#[derive(Default)]
pub(crate) struct SendGate {
    open: Mutex<bool>,
    opened: Condvar,
    waiting: AtomicUsize,
}

impl SendGate {
    fn pass(&self) {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
    }

    /// Number of sends that have reached the gate.
    pub(crate) fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub(crate) fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }
}

pub(crate) struct LoopbackDevice {
    name: String,
    sock: UnixDatagram,
    flags: AtomicI16,
    address: Mutex<Option<Ipv4Addr>>,
    netmask: Mutex<Option<Ipv4Addr>>,
    fail_step: Option<ConfigStep>,
    max_write: Option<usize>,
    gate: Option<Arc<SendGate>>,
}

impl LoopbackDevice {
    fn check(&self, step: ConfigStep) -> io::Result<()> {
        if self.fail_step == Some(step) {
            return Err(io::Error::from_raw_os_error(libc::EPERM));
        }
        Ok(())
    }

    pub(crate) fn flags(&self) -> i16 {
        self.flags.load(Ordering::SeqCst)
    }

    pub(crate) fn address(&self) -> Option<Ipv4Addr> {
        *self.address.lock().unwrap()
    }

    pub(crate) fn netmask(&self) -> Option<Ipv4Addr> {
        *self.netmask.lock().unwrap()
    }
}

impl Device for LoopbackDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.sock.recv(buf)
    }

    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        if let Some(gate) = &self.gate {
            gate.pass();
        }
        match self.max_write {
            Some(max) if buf.len() > max => self.sock.send(&buf[..max]),
            _ => self.sock.send(buf),
        }
    }

    fn get_flags(&self) -> io::Result<i16> {
        self.check(ConfigStep::ReadFlags)?;
        Ok(self.flags())
    }

    fn set_flags(&self, flags: i16) -> io::Result<()> {
        self.check(ConfigStep::BringUp)?;
        self.flags.store(flags, Ordering::SeqCst);
        Ok(())
    }

    fn set_address(&self, addr: Ipv4Addr) -> io::Result<()> {
        self.check(ConfigStep::SetAddress)?;
        *self.address.lock().unwrap() = Some(addr);
        Ok(())
    }

    fn set_netmask(&self, mask: Ipv4Addr) -> io::Result<()> {
        self.check(ConfigStep::SetNetmask)?;
        *self.netmask.lock().unwrap() = Some(mask);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct LoopbackProvider {
    devices: Mutex<HashMap<String, Arc<LoopbackDevice>>>,
    peers: Mutex<HashMap<String, UnixDatagram>>,
    next_id: AtomicUsize,
    deny_open: bool,
    fail_step: Option<ConfigStep>,
    max_write: Option<usize>,
    gate: Option<Arc<SendGate>>,
}

impl LoopbackProvider {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every open fails as if the caller lacked privilege.
    pub(crate) fn denying() -> Arc<Self> {
        Arc::new(LoopbackProvider {
            deny_open: true,
            ..Default::default()
        })
    }

    /// Devices fail the given configuration step.
    pub(crate) fn failing_at(step: ConfigStep) -> Arc<Self> {
        Arc::new(LoopbackProvider {
            fail_step: Some(step),
            ..Default::default()
        })
    }

    /// Devices accept at most `max` bytes per write.
    pub(crate) fn truncating(max: usize) -> Arc<Self> {
        Arc::new(LoopbackProvider {
            max_write: Some(max),
            ..Default::default()
        })
    }

    /// Device writes wait on `gate`.
    pub(crate) fn gated(gate: Arc<SendGate>) -> Arc<Self> {
        Arc::new(LoopbackProvider {
            gate: Some(gate),
            ..Default::default()
        })
    }

    /// Take the wire end of a device. Blocking, with a read timeout so tests cannot hang.
    pub(crate) fn peer(&self, name: &str) -> UnixDatagram {
        let peer = self
            .peers
            .lock()
            .unwrap()
            .remove(name)
            .unwrap_or_else(|| panic!("no loopback peer for {name}"));
        peer.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        peer
    }

    pub(crate) fn device(&self, name: &str) -> Arc<LoopbackDevice> {
        Arc::clone(&self.devices.lock().unwrap()[name])
    }
}

impl DeviceProvider for LoopbackProvider {
    fn open(&self, name: &str, _mode: Mode) -> io::Result<Arc<dyn Device>> {
        if self.deny_open {
            return Err(io::Error::from_raw_os_error(libc::EPERM));
        }

        let name = if name.is_empty() {
            format!("loop{}", self.next_id.fetch_add(1, Ordering::SeqCst))
        } else {
            name.to_string()
        };

        let mut devices = self.devices.lock().unwrap();
        if devices.contains_key(&name) {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }

        let (sock, peer) = UnixDatagram::pair()?;
        sock.set_nonblocking(true)?;

        let device = Arc::new(LoopbackDevice {
            name: name.clone(),
            sock,
            flags: AtomicI16::new(0),
            address: Mutex::new(None),
            netmask: Mutex::new(None),
            fail_step: self.fail_step,
            max_write: self.max_write,
            gate: self.gate.clone(),
        });
        devices.insert(name.clone(), Arc::clone(&device));
        self.peers.lock().unwrap().insert(name, peer);
        Ok(device)
    }
}
