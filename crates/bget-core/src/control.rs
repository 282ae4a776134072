//! Cooperative stop signalling for a batch run.
//!
//! The runner hands a `StopToken` clone to the submitter loop and to every
//! fetch; setting it halts submission and collection and makes in-flight
//! transfers bail out at the next chunk boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cloneable stop flag. Blocking code polls `is_set`; async code awaits
/// `cancelled`. Once set it stays set: an interrupted fetch reports a
/// failed outcome while the token remains observable by the shutdown path.
#[derive(Clone, Default)]
pub struct StopToken {
    inner: Arc<StopInner>,
}

#[derive(Default)]
struct StopInner {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent; wakes every task parked in `cancelled`.
    pub fn trigger(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_set(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Resolves once the token is set. Safe against the trigger racing the
    /// registration: the flag is re-checked after arming the notifier.
    pub async fn cancelled(&self) {
        loop {
            if self.is_set() {
                return;
            }
            let notified = self.inner.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}
