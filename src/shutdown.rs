//! Cancellation signal shared between a relay and its capture workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// A cloneable one-shot stop signal.
///
/// Clones observe the same flag. Once triggered it stays triggered.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    triggered: AtomicBool,
    lock: Mutex<()>,
    cv: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal and wake every waiter. Returns false if it had already fired.
    pub fn trigger(&self) -> bool {
        let _guard = self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let first = !self.inner.triggered.swap(true, Ordering::SeqCst);
        self.inner.cv.notify_all();
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Block until the signal fires.
    pub fn wait(&self) {
        let guard = self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .inner
            .cv
            .wait_while(guard, |_| !self.is_triggered())
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block for at most `timeout`. Returns true if the signal has fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _result = self
            .inner
            .cv
            .wait_timeout_while(guard, timeout, |_| !self.is_triggered())
            .unwrap_or_else(PoisonError::into_inner);
        self.is_triggered()
    }
}
