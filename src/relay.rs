//! Cross-wired pair of interfaces.
//!
//! Each interface's capture handler writes the captured frame straight into
//! the other interface, on the capturing thread. There is no queue between
//! the two sides, so frames from one source keep their capture order.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::iface::{Frame, FrameHandler, InterfaceStats, VirtualInterface};
use crate::shutdown::ShutdownSignal;

/// Interval between periodic statistics reports.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(10);

/// Bytes of each frame shown in debug logs.
const FRAME_PREVIEW_LEN: usize = 16;

/// Forwards frames captured on one interface to its peer
struct Forwarder {
    from: String,
    to: Arc<VirtualInterface>,
    shutdown: ShutdownSignal,
}

impl FrameHandler for Forwarder {
    fn on_frame(&mut self, frame: Frame) {
        debug!(
            iface = %self.from,
            len = frame.len(),
            data = %frame.hex_preview(FRAME_PREVIEW_LEN),
            "received packet"
        );

        // Skipped frames still count against the peer so rx == tx + dropped holds.
        if self.shutdown.is_triggered() || !self.to.is_capturing() {
            trace!(from = %self.from, to = %self.to.name(), "peer stopped, frame not forwarded");
            self.to.discard(&frame);
            return;
        }

        if let Err(e) = self.to.write_packet(&frame) {
            trace!(from = %self.from, to = %self.to.name(), error = %e, "frame dropped");
        }
    }
}

/// Counters of both sides at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub first: InterfaceStats,
    pub second: InterfaceStats,
}

/// Two interfaces relaying to each other until shutdown
pub struct Relay {
    first: Arc<VirtualInterface>,
    second: Arc<VirtualInterface>,
    shutdown: ShutdownSignal,
    released: bool,
}

impl Relay {
    /// Start capture on both interfaces, each forwarding into the other.
    ///
    /// Both must be initialized and not yet capturing. If the second capture
    /// cannot start, the first is stopped again before returning.
    pub fn wire(
        first: Arc<VirtualInterface>,
        second: Arc<VirtualInterface>,
        shutdown: ShutdownSignal,
    ) -> Result<Self> {
        if Arc::ptr_eq(&first, &second) {
            return Err(Error::invalid_argument(format!(
                "cannot relay {} to itself",
                first.name()
            )));
        }

        let forward = |from: &Arc<VirtualInterface>, to: &Arc<VirtualInterface>| Forwarder {
            from: from.name().to_string(),
            to: Arc::clone(to),
            shutdown: shutdown.clone(),
        };

        first.start_capture_linked(forward(&first, &second), shutdown.clone())?;
        if let Err(e) = second.start_capture_linked(forward(&second, &first), shutdown.clone()) {
            first.stop_capture();
            return Err(e);
        }

        info!(first = %first.name(), second = %second.name(), "relay wired");
        Ok(Relay {
            first,
            second,
            shutdown,
            released: false,
        })
    }

    pub fn first(&self) -> &Arc<VirtualInterface> {
        &self.first
    }

    pub fn second(&self) -> &Arc<VirtualInterface> {
        &self.second
    }

    /// The signal that ends `run_until_shutdown`.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            first: self.first.stats(),
            second: self.second.stats(),
        }
    }

    fn report(&self, label: &str) {
        let stats = self.stats();
        info!(iface = %self.first.name(), "{label}: {}", stats.first);
        info!(iface = %self.second.name(), "{label}: {}", stats.second);
    }

    /// Block until the shutdown signal fires, then drain and release both interfaces.
    ///
    /// With an interval, statistics are logged every `interval` while
    /// waiting. Returns the final counters.
    pub fn run_until_shutdown(mut self, stats_interval: Option<Duration>) -> RelayStats {
        match stats_interval {
            Some(interval) if !interval.is_zero() => {
                while !self.shutdown.wait_timeout(interval) {
                    self.report("statistics");
                }
            }
            _ => self.shutdown.wait(),
        }

        info!("shutting down relay");
        self.teardown()
    }

    fn teardown(&mut self) -> RelayStats {
        self.shutdown.trigger();
        self.first.stop_capture();
        self.second.stop_capture();

        let stats = self.stats();
        self.report("final statistics");

        self.first.close();
        self.second.close();
        self.released = true;
        stats
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        if !self.released {
            self.teardown();
        }
    }
}
