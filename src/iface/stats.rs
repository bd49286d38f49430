//! Lock-free per-interface traffic counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters for one interface.
///
/// The receive side is written only by the capture worker and the send side
/// only by whichever thread writes to the device, so plain relaxed atomics
/// are enough. Readers may see any interleaving of the two sides.
#[derive(Debug, Default)]
pub struct InterfaceCounters {
    frames_received: AtomicU64,
    bytes_received: AtomicU64,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    frames_dropped: AtomicU64,
    read_errors: AtomicU64,
}

impl InterfaceCounters {
    pub(crate) fn record_received(&self, bytes: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> InterfaceStats {
        InterfaceStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of an interface's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceStats {
    pub frames_received: u64,
    pub bytes_received: u64,
    pub frames_sent: u64,
    pub bytes_sent: u64,
    /// Frames meant for this interface that were discarded instead of written
    pub frames_dropped: u64,
    /// Device reads that failed with something other than would-block
    pub read_errors: u64,
}

impl fmt::Display for InterfaceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RX={} packets ({} bytes), TX={} packets ({} bytes), dropped={}, read errors={}",
            self.frames_received,
            self.bytes_received,
            self.frames_sent,
            self.bytes_sent,
            self.frames_dropped,
            self.read_errors
        )
    }
}
