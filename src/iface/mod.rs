//! Virtual interface layer
//!
//! This module owns everything about a single OS virtual device:
//! - Device handles and the providers that open them
//! - Address configuration ioctls
//! - The per-interface capture worker
//! - Lock-free traffic counters

mod capture;
pub mod device;
pub mod frame;
pub mod interface;
pub mod ip;
mod netconf;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used items
pub use capture::{ERROR_BACKOFF, IDLE_POLL_INTERVAL};
pub use device::{Device, DeviceProvider, Mode, TunTapDevice, TunTapProvider};
pub use frame::{Frame, FrameHandler, MAX_FRAME_SIZE};
pub use interface::{InterfaceState, VirtualInterface};
pub use ip::InterfaceAddress;
pub use stats::{InterfaceCounters, InterfaceStats};
