//! Per-interface capture worker.
//!
//! The worker polls a non-blocking device: it sleeps briefly when nothing is
//! queued and backs off a little longer on read errors. Only a stop signal
//! ends the loop.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use super::device::Device;
use super::frame::{Frame, FrameHandler, MAX_FRAME_SIZE};
use super::stats::InterfaceCounters;
use crate::shutdown::ShutdownSignal;

/// Sleep between reads that found nothing queued.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Sleep after a zero-length read or a read error.
pub const ERROR_BACKOFF: Duration = Duration::from_millis(10);

struct CaptureLoop {
    name: String,
    device: Arc<dyn Device>,
    counters: Arc<InterfaceCounters>,
    handler: Box<dyn FrameHandler>,
    stop: ShutdownSignal,
    linked: Option<ShutdownSignal>,
}

impl CaptureLoop {
    fn should_stop(&self) -> bool {
        self.stop.is_triggered() || self.linked.as_ref().is_some_and(|s| s.is_triggered())
    }

    fn run(mut self) {
        debug!(iface = %self.name, "capture loop started");
        let mut buf = vec![0u8; MAX_FRAME_SIZE];

        while !self.should_stop() {
            match self.device.recv(&mut buf) {
                Ok(0) => {
                    trace!(iface = %self.name, "zero-length read");
                    thread::sleep(ERROR_BACKOFF);
                }
                Ok(nread) => {
                    self.counters.record_received(nread);
                    self.deliver(Frame::new(buf[..nread].to_vec()));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(IDLE_POLL_INTERVAL);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.counters.record_read_error();
                    warn!(iface = %self.name, error = %e, "error reading from interface");
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }

        debug!(iface = %self.name, "capture loop exited");
    }

    fn deliver(&mut self, frame: Frame) {
        let handler = &mut self.handler;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler.on_frame(frame))) {
            error!(
                iface = %self.name,
                reason = panic_message(&*payload),
                "frame handler panicked, frame not delivered"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle to a running capture thread.
pub(crate) struct CaptureWorker {
    name: String,
    stop: ShutdownSignal,
    handle: JoinHandle<()>,
}

impl CaptureWorker {
    /// Spawn the capture thread. `linked` is an outer signal that also ends the loop.
    pub(crate) fn spawn(
        name: &str,
        device: Arc<dyn Device>,
        counters: Arc<InterfaceCounters>,
        handler: Box<dyn FrameHandler>,
        linked: Option<ShutdownSignal>,
    ) -> io::Result<Self> {
        let stop = ShutdownSignal::new();
        let capture = CaptureLoop {
            name: name.to_string(),
            device,
            counters,
            handler,
            stop: stop.clone(),
            linked,
        };
        let handle = thread::Builder::new()
            .name(format!("capture-{name}"))
            .spawn(move || capture.run())?;

        Ok(CaptureWorker {
            name: name.to_string(),
            stop,
            handle,
        })
    }

    /// Signal the thread and wait for it to exit.
    pub(crate) fn stop(self) {
        self.stop.trigger();

        if self.handle.thread().id() == thread::current().id() {
            // Stopped from inside a handler; the loop exits once the handler returns.
            warn!(iface = %self.name, "capture stopped from its own worker, not joining");
            return;
        }

        if self.handle.join().is_err() {
            error!(iface = %self.name, "capture worker terminated abnormally");
        }
        info!(iface = %self.name, "stopped packet capture");
    }
}
