//! Error types for interface lifecycle and frame writes.

use std::io;

use thiserror::Error;

use crate::iface::interface::InterfaceState;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// One OS call in the address configuration sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStep {
    /// Read the current interface flags
    ReadFlags,
    /// Set IFF_UP | IFF_RUNNING
    BringUp,
    /// Assign the IPv4 address
    SetAddress,
    /// Assign the netmask
    SetNetmask,
}

impl std::fmt::Display for ConfigStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let step = match self {
            ConfigStep::ReadFlags => "read interface flags",
            ConfigStep::BringUp => "bring interface up",
            ConfigStep::SetAddress => "set interface address",
            ConfigStep::SetNetmask => "set interface netmask",
        };
        f.write_str(step)
    }
}

/// Errors surfaced by interface and relay setup.
#[derive(Error, Debug)]
pub enum Error {
    /// The clone device could not be opened or the kernel rejected registration
    #[error("device {name:?} unavailable: {source}")]
    DeviceUnavailable {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Malformed address, netmask or interface name
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted out of lifecycle order
    #[error("cannot {op} while interface is {state}")]
    InvalidState {
        op: &'static str,
        state: InterfaceState,
    },

    /// A configuration ioctl failed after the device was opened
    #[error("failed to {step} on {name}: {source}")]
    DeviceConfig {
        name: String,
        step: ConfigStep,
        #[source]
        source: io::Error,
    },

    /// The capture thread could not be spawned
    #[error("failed to spawn capture worker for {name}: {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True for errors caused by the host (privilege, missing module) rather than by the caller.
    pub fn is_environmental(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable { .. } | Self::DeviceConfig { .. } | Self::WorkerSpawn { .. }
        )
    }
}

/// Why a frame could not be written. The frame is dropped in every case.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("device is not open")]
    NotOpen,

    #[error("device would block")]
    WouldBlock,

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
