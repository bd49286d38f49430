//! Captured frames and the per-frame handler seam.

use std::fmt::Write as _;
use std::ops::Deref;

/// Largest frame read from a device in one call.
pub const MAX_FRAME_SIZE: usize = 2048;

/// One frame as read from or written to a device.
///
/// The bytes are opaque: TUN frames carry an IP packet, TAP frames an
/// Ethernet frame, and nothing here looks inside either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn new(data: Vec<u8>) -> Self {
        Frame(data)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Hex dump of the first `max` bytes, with a trailing `...` when truncated.
    pub fn hex_preview(&self, max: usize) -> String {
        let mut out = String::with_capacity(max.min(self.0.len()) * 3 + 3);
        for (i, byte) in self.0.iter().take(max).enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{byte:02x}");
        }
        if self.0.len() > max {
            out.push_str(" ...");
        }
        out
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Frame(data)
    }
}

/// Receives every frame captured on an interface.
///
/// Called synchronously on the capture worker, once per frame, in capture
/// order. A stage that transforms frames before they are forwarded plugs in
/// here by wrapping another handler.
pub trait FrameHandler: Send {
    fn on_frame(&mut self, frame: Frame);
}

impl<F> FrameHandler for F
where
    F: FnMut(Frame) + Send,
{
    fn on_frame(&mut self, frame: Frame) {
        self(frame)
    }
}
