//! Virtual interface lifecycle: open, configure, capture, write, close.
//!
//! A `VirtualInterface` is shared between threads behind an `Arc`: the
//! coordinating thread drives the lifecycle, the capture worker reads from
//! the device, and the paired interface's worker writes into it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};

use tracing::{debug, info, warn};

use super::capture::CaptureWorker;
use super::device::{Device, DeviceProvider, Mode, TunTapProvider};
use super::frame::FrameHandler;
use super::ip::InterfaceAddress;
use super::netconf::{IFF_RUNNING, IFF_UP, IFNAMSIZ};
use super::stats::{InterfaceCounters, InterfaceStats};
use crate::error::{ConfigStep, Error, Result, WriteError};
use crate::shutdown::ShutdownSignal;

/// Lifecycle position of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InterfaceState {
    Uninitialized,
    Initialized,
    Configured,
    Capturing,
    Stopped,
}

impl fmt::Display for InterfaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InterfaceState::Uninitialized => "uninitialized",
            InterfaceState::Initialized => "initialized",
            InterfaceState::Configured => "configured",
            InterfaceState::Capturing => "capturing",
            InterfaceState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

struct Lifecycle {
    state: InterfaceState,
    address: Option<InterfaceAddress>,
    worker: Option<CaptureWorker>,
    closed: bool,
}

/// One OS virtual network device and its capture worker
pub struct VirtualInterface {
    requested_name: String,
    mode: Mode,
    provider: Arc<dyn DeviceProvider>,
    /// Realized name, set once by `initialize`
    name: OnceLock<String>,
    device: RwLock<Option<Arc<dyn Device>>>,
    lifecycle: Mutex<Lifecycle>,
    /// Mirrors `Lifecycle::worker.is_some()` for readers on the forwarding path
    capturing: AtomicBool,
    counters: Arc<InterfaceCounters>,
}

impl VirtualInterface {
    /// Describe a kernel TUN/TAP interface. Nothing is opened until `initialize`.
    pub fn new(name: &str, mode: Mode) -> Self {
        Self::with_provider(name, mode, Arc::new(TunTapProvider))
    }

    pub fn with_provider(name: &str, mode: Mode, provider: Arc<dyn DeviceProvider>) -> Self {
        VirtualInterface {
            requested_name: name.to_string(),
            mode,
            provider,
            name: OnceLock::new(),
            device: RwLock::new(None),
            lifecycle: Mutex::new(Lifecycle {
                state: InterfaceState::Uninitialized,
                address: None,
                worker: None,
                closed: false,
            }),
            capturing: AtomicBool::new(false),
            counters: Arc::new(InterfaceCounters::default()),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn device(&self) -> Option<Arc<dyn Device>> {
        self.device
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Device name as realized by the OS, or the requested name before `initialize`.
    pub fn name(&self) -> &str {
        self.name.get().map_or(self.requested_name.as_str(), String::as_str)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> InterfaceState {
        self.lifecycle().state
    }

    pub fn address(&self) -> Option<InterfaceAddress> {
        self.lifecycle().address
    }

    /// Whether a capture worker is running. Does not take the lifecycle lock.
    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    pub fn is_open(&self) -> bool {
        self.device().is_some()
    }

    pub fn stats(&self) -> InterfaceStats {
        self.counters.snapshot()
    }

    /// Open the OS device in non-blocking mode and read back its name.
    pub fn initialize(&self) -> Result<()> {
        let mut lc = self.lifecycle();
        if lc.state != InterfaceState::Uninitialized || lc.closed {
            return Err(Error::InvalidState {
                op: "initialize",
                state: lc.state,
            });
        }

        let requested = self.requested_name.as_str();
        if requested.len() >= IFNAMSIZ || requested.contains('\0') {
            return Err(Error::invalid_argument(format!(
                "interface name {requested:?} must be at most {} bytes without NUL",
                IFNAMSIZ - 1
            )));
        }

        let device = self
            .provider
            .open(requested, self.mode)
            .map_err(|source| Error::DeviceUnavailable {
                name: requested.to_string(),
                source,
            })?;

        let realized = device.name().to_string();
        // Unset on a fresh instance: the state check above guarantees one successful open.
        let _ = self.name.set(realized);
        *self.device.write().unwrap_or_else(PoisonError::into_inner) = Some(device);
        lc.state = InterfaceState::Initialized;

        info!(iface = %self.name(), mode = %self.mode, "created interface");
        Ok(())
    }

    /// Assign an IPv4 address and netmask and bring the device up.
    pub fn configure(&self, address: &str, netmask: &str) -> Result<()> {
        self.ensure_open("configure")?;
        let addr = InterfaceAddress::parse(address, netmask)?;
        self.configure_address(addr)
    }

    /// Typed form of `configure`.
    ///
    /// Runs four ioctls in order: read flags, set UP|RUNNING, set address,
    /// set netmask. The first failure is returned and the state is left
    /// where it was; steps that already succeeded are not undone.
    pub fn configure_address(&self, addr: InterfaceAddress) -> Result<()> {
        let mut lc = self.lifecycle();
        let device = match self.device() {
            Some(device) if lc.state != InterfaceState::Uninitialized => device,
            _ => {
                return Err(Error::InvalidState {
                    op: "configure",
                    state: lc.state,
                })
            }
        };

        let name = self.name().to_string();
        let step_err = |step: ConfigStep| {
            let name = name.clone();
            move |source: std::io::Error| {
                if matches!(step, ConfigStep::SetAddress | ConfigStep::SetNetmask) {
                    warn!(iface = %name, failed = %step, "interface left partially configured");
                }
                Error::DeviceConfig { name, step, source }
            }
        };

        let flags = device.get_flags().map_err(step_err(ConfigStep::ReadFlags))?;
        device
            .set_flags(flags | IFF_UP | IFF_RUNNING)
            .map_err(step_err(ConfigStep::BringUp))?;
        device
            .set_address(addr.address)
            .map_err(step_err(ConfigStep::SetAddress))?;
        device
            .set_netmask(addr.netmask)
            .map_err(step_err(ConfigStep::SetNetmask))?;

        lc.address = Some(addr);
        if lc.state != InterfaceState::Capturing {
            lc.state = InterfaceState::Configured;
        }

        info!(
            iface = %name,
            address = %addr.address,
            netmask = %addr.netmask,
            broadcast = %addr.broadcast_address(),
            "configured interface"
        );
        Ok(())
    }

    fn ensure_open(&self, op: &'static str) -> Result<()> {
        let lc = self.lifecycle();
        if lc.state == InterfaceState::Uninitialized || lc.closed {
            return Err(Error::InvalidState { op, state: lc.state });
        }
        Ok(())
    }

    /// Start the capture worker. `handler` runs on it once per frame.
    pub fn start_capture<H>(&self, handler: H) -> Result<()>
    where
        H: FrameHandler + 'static,
    {
        self.spawn_capture(Box::new(handler), None)
    }

    /// Like `start_capture`, but the worker also exits when `shutdown` fires.
    pub fn start_capture_linked<H>(&self, handler: H, shutdown: ShutdownSignal) -> Result<()>
    where
        H: FrameHandler + 'static,
    {
        self.spawn_capture(Box::new(handler), Some(shutdown))
    }

    fn spawn_capture(
        &self,
        handler: Box<dyn FrameHandler>,
        shutdown: Option<ShutdownSignal>,
    ) -> Result<()> {
        let mut lc = self.lifecycle();
        let device = match self.device() {
            Some(device) if lc.worker.is_none() && !lc.closed => device,
            _ => {
                return Err(Error::InvalidState {
                    op: "start capture",
                    state: lc.state,
                })
            }
        };

        let worker = CaptureWorker::spawn(
            self.name(),
            device,
            Arc::clone(&self.counters),
            handler,
            shutdown,
        )
        .map_err(|source| Error::WorkerSpawn {
            name: self.name().to_string(),
            source,
        })?;

        lc.worker = Some(worker);
        lc.state = InterfaceState::Capturing;
        self.capturing.store(true, Ordering::Release);
        info!(iface = %self.name(), "started packet capture");
        Ok(())
    }

    /// Stop the capture worker and wait for it to exit. No-op when not capturing.
    ///
    /// Once this returns the handler will not be invoked again.
    pub fn stop_capture(&self) {
        let worker = {
            let mut lc = self.lifecycle();
            let worker = lc.worker.take();
            if worker.is_some() {
                lc.state = InterfaceState::Stopped;
                self.capturing.store(false, Ordering::Release);
            }
            worker
        };

        if let Some(worker) = worker {
            worker.stop();
        }
    }

    /// Write one frame to the device.
    ///
    /// Best effort: a frame that cannot be written in full right now is
    /// dropped and counted, never queued or retried.
    pub fn write_packet(&self, frame: &[u8]) -> std::result::Result<usize, WriteError> {
        let Some(device) = self.device() else {
            self.counters.record_dropped();
            return Err(WriteError::NotOpen);
        };

        match device.send(frame) {
            Ok(written) if written == frame.len() => {
                self.counters.record_sent(written);
                Ok(written)
            }
            Ok(written) => {
                self.counters.record_dropped();
                warn!(
                    iface = %self.name(),
                    written,
                    expected = frame.len(),
                    "short write, frame dropped"
                );
                Err(WriteError::ShortWrite {
                    written,
                    expected: frame.len(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                self.counters.record_dropped();
                debug!(iface = %self.name(), len = frame.len(), "device busy, frame dropped");
                Err(WriteError::WouldBlock)
            }
            Err(e) => {
                self.counters.record_dropped();
                warn!(iface = %self.name(), error = %e, "failed to write packet");
                Err(WriteError::Io(e))
            }
        }
    }

    /// Count a frame that was meant for this interface but not written.
    pub(crate) fn discard(&self, frame: &[u8]) {
        self.counters.record_dropped();
        debug!(iface = %self.name(), len = frame.len(), "frame discarded");
    }

    /// Stop capture and release the device. Safe to call more than once.
    pub fn close(&self) {
        self.stop_capture();
        self.lifecycle().closed = true;
        let device = self
            .device
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if device.is_some() {
            info!(iface = %self.name(), "closed interface");
        }
    }
}

impl fmt::Debug for VirtualInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualInterface")
            .field("name", &self.name())
            .field("mode", &self.mode)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for VirtualInterface {
    fn drop(&mut self) {
        self.close();
    }
}
