use std::fmt::{self, Debug};
use std::sync::{Arc, Weak};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::*;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Something parked on a pool condvar that must be woken when a token fires.
pub(crate) trait Wake: Send + Sync {
    fn wake(&self);
}

/// A one-shot cancellation signal.
///
/// Once cancelled a token stays cancelled. Clones share the same state, so a
/// token can be handed to a claiming thread while another thread keeps a
/// clone to cancel with.
///
/// # Example
///
/// ```rust
/// use refill_pool::CancelToken;
///
/// let token = CancelToken::new();
/// let remote = token.clone();
/// assert!(!token.is_cancelled());
/// assert!(remote.cancel());
/// assert!(token.is_cancelled());
/// // Cancelling twice is a no-op.
/// assert!(!remote.cancel());
/// ```
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
    watchers: Mutex<Vec<Weak<dyn Wake>>>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`cancel`](Self::cancel) has been called on this token or any clone of it.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(SeqCst)
    }

    /// Cancel the token and wake everything waiting on it.
    ///
    /// Returns `true` for the call that performed the cancellation and `false`
    /// if the token was already cancelled.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, SeqCst) {
            return false;
        }
        {
            let _guard = self.inner.lock.lock();
            self.inner.cond.notify_all();
        }
        let watchers = std::mem::take(&mut *self.inner.watchers.lock());
        for watcher in watchers {
            if let Some(watcher) = watcher.upgrade() {
                watcher.wake();
            }
        }
        true
    }

    /// Sleep for `timeout`, returning early if the token is cancelled.
    ///
    /// Returns whether the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock.lock();
        while !self.is_cancelled() {
            if self.inner.cond.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        self.is_cancelled()
    }

    /// Register `watcher` to be woken on cancellation.
    ///
    /// Nothing is registered if the token is already cancelled; the caller
    /// observes that through `is_cancelled` before it parks.
    pub(crate) fn watch(&self, watcher: Weak<dyn Wake>) {
        let mut watchers = self.inner.watchers.lock();
        if self.is_cancelled() {
            return;
        }
        watchers.retain(|w| w.strong_count() > 0);
        if !watchers.iter().any(|w| Weak::ptr_eq(w, &watcher)) {
            watchers.push(watcher);
        }
    }
}

impl Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
