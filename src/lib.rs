//! Relay frames between two TUN/TAP interfaces
//!
//! This library provides:
//! - Virtual interface lifecycle (create, configure, capture, write, close)
//! - A non-blocking per-interface capture worker
//! - A relay that cross-wires two interfaces and drains them on shutdown
//! - Lock-free traffic statistics

pub mod config;
pub mod error;
pub mod iface;
pub mod relay;
pub mod shutdown;

// Re-export commonly used types
pub use config::{EndpointConfig, RelayConfig};
pub use error::{ConfigStep, Error, Result, WriteError};
pub use iface::{
    Frame, FrameHandler, InterfaceAddress, InterfaceState, InterfaceStats, Mode, VirtualInterface,
};
pub use relay::{Relay, RelayStats, DEFAULT_STATS_INTERVAL};
pub use shutdown::ShutdownSignal;
