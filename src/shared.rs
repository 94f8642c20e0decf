use std::sync::{Arc, Weak};
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::*;
use std::time::{Duration, Instant};

use crossbeam_queue::ArrayQueue;
use parking_lot::{Condvar, Mutex};
use tracing::{trace, warn};

use crate::error::ClaimError;
use crate::pool::{Config, PoolStats};
use crate::signal::{CancelToken, Wake};
use crate::spawn::Spawn;

pub(crate) type Producer<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;
pub(crate) type ReleaseFn<T> = Box<dyn Fn(T) + Send + Sync>;

/// How long a producer facing a full queue sleeps before looking again.
///
/// A full queue means more outcomes are buffered than there are consumed
/// slots, which the one-task-per-slot accounting rules out, so this only
/// bounds the wait if a vacancy notification is missed.
const VACANCY_RECHECK: Duration = Duration::from_millis(50);

/// State shared by the pool handle and its production tasks.
pub(crate) struct Shared<T, E> {
    pub(crate) config: Config,
    /// Produced resources and surfaced production failures, oldest first.
    pub(crate) ready: ArrayQueue<Result<T, E>>,
    /// Raised exactly once, by disposal.
    pub(crate) shutdown: CancelToken,
    /// Serializes enqueueing against disposal and parks waiters.
    lock: Mutex<()>,
    /// Signaled when an outcome is enqueued.
    available: Condvar,
    /// Signaled when an outcome is removed.
    vacancy: Condvar,
    producer: Producer<T, E>,
    release: Option<ReleaseFn<T>>,
    spawner: Arc<dyn Spawn>,
    produced: AtomicUsize,
    claimed: AtomicUsize,
    released: AtomicUsize,
    failed: AtomicUsize,
}

impl<T, E> Shared<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(
        config: Config,
        producer: Producer<T, E>,
        release: Option<ReleaseFn<T>>,
        spawner: Arc<dyn Spawn>,
    ) -> Self {
        Self {
            ready: ArrayQueue::new(config.capacity),
            config,
            shutdown: CancelToken::new(),
            lock: Mutex::new(()),
            available: Condvar::new(),
            vacancy: Condvar::new(),
            producer,
            release,
            spawner,
            produced: AtomicUsize::new(0),
            claimed: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Start one production task for one slot.
    pub(crate) fn spawn_production(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        self.spawner.spawn(Box::new(move || shared.produce()));
    }

    /// Build one outcome and enqueue it, unless the pool is disposed first.
    fn produce(&self) {
        if self.shutdown.is_cancelled() {
            trace!("pool disposed before production started");
            return;
        }
        let Some(mut outcome) = self.attempt() else {
            trace!("pool disposed during production backoff");
            return;
        };
        if self.shutdown.is_cancelled() {
            self.discard(outcome);
            return;
        }

        let mut guard = self.lock.lock();
        loop {
            // Checked under the lock so nothing lands in the queue after the drain.
            if self.shutdown.is_cancelled() {
                drop(guard);
                self.discard(outcome);
                return;
            }
            match self.ready.push(outcome) {
                Ok(()) => {
                    self.available.notify_one();
                    trace!(ready = self.ready.len(), "production task enqueued outcome");
                    return;
                }
                Err(rejected) => {
                    outcome = rejected;
                    self.vacancy.wait_for(&mut guard, VACANCY_RECHECK);
                }
            }
        }
    }

    /// Invoke the producer, retrying with backoff as configured.
    ///
    /// Returns `None` if disposal interrupts a backoff.
    fn attempt(&self) -> Option<Result<T, E>> {
        let retry = &self.config.retry;
        let mut backoff = retry.initial_backoff;
        let mut retries = 0;
        loop {
            match (self.producer)() {
                Ok(resource) => {
                    self.produced.fetch_add(1, Relaxed);
                    return Some(Ok(resource));
                }
                Err(_) if retries < retry.max_retries => {
                    retries += 1;
                    warn!(retries, ?backoff, "resource production failed, retrying");
                    if self.shutdown.wait_timeout(backoff) {
                        return None;
                    }
                    backoff = retry.next_backoff(backoff);
                }
                Err(err) => {
                    self.failed.fetch_add(1, Relaxed);
                    warn!(
                        attempts = retries + 1,
                        "resource production failed, surfacing to the next claimant"
                    );
                    return Some(Err(err));
                }
            }
        }
    }

    /// Release an outcome that will never reach a claimant.
    fn discard(&self, outcome: Result<T, E>) {
        match outcome {
            Ok(resource) => {
                self.released.fetch_add(1, Relaxed);
                if let Some(release) = &self.release {
                    release(resource);
                }
            }
            Err(_) => trace!("dropping undelivered production failure"),
        }
    }

    /// Take the head outcome without blocking.
    ///
    /// Returns `None` when the queue is empty and the pool is alive.
    pub(crate) fn take(self: &Arc<Self>) -> Option<Result<T, ClaimError<E>>> {
        if self.shutdown.is_cancelled() {
            return Some(Err(ClaimError::Disposed));
        }
        let outcome = self.ready.pop()?;
        if self.shutdown.is_cancelled() {
            // Disposal raced the pop; the drain will not see this one.
            self.discard(outcome);
            return Some(Err(ClaimError::Disposed));
        }
        self.vacancy.notify_one();
        self.spawn_production();
        match outcome {
            Ok(resource) => {
                self.claimed.fetch_add(1, Relaxed);
                Some(Ok(resource))
            }
            Err(err) => Some(Err(ClaimError::Production(err))),
        }
    }

    /// Block until an outcome is taken, the pool is disposed, `deadline`
    /// passes or `token` is cancelled.
    ///
    /// A claim that gives up never removes an outcome, so the slot accounting
    /// is untouched by timeouts and cancellation.
    pub(crate) fn take_blocking(
        self: &Arc<Self>,
        deadline: Option<Instant>,
        token: Option<&CancelToken>,
    ) -> Result<T, ClaimError<E>> {
        if let Some(token) = token {
            let watcher: Weak<dyn Wake> = Arc::downgrade(self) as Weak<dyn Wake>;
            token.watch(watcher);
        }
        loop {
            if let Some(result) = self.take() {
                return result;
            }
            let mut guard = self.lock.lock();
            loop {
                if self.shutdown.is_cancelled() {
                    return Err(ClaimError::Disposed);
                }
                if !self.ready.is_empty() {
                    break;
                }
                if token.is_some_and(CancelToken::is_cancelled) {
                    return Err(ClaimError::Cancelled);
                }
                match deadline {
                    Some(deadline) => {
                        if self.available.wait_until(&mut guard, deadline).timed_out()
                            && self.ready.is_empty()
                        {
                            return Err(ClaimError::Timeout);
                        }
                    }
                    None => self.available.wait(&mut guard),
                }
            }
        }
    }

    /// Raise the disposal signal and release everything buffered.
    ///
    /// Returns the number of outcomes drained, or `None` if the pool was
    /// already disposed.
    pub(crate) fn dispose(&self) -> Option<usize> {
        if !self.shutdown.cancel() {
            return None;
        }
        // Any producer past its disposal check holds the lock until its push
        // completes, so after this the queue only shrinks.
        self.wake();
        let mut drained = 0;
        while let Some(outcome) = self.ready.pop() {
            self.discard(outcome);
            drained += 1;
        }
        Some(drained)
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            produced: self.produced.load(Relaxed),
            claimed: self.claimed.load(Relaxed),
            released: self.released.load(Relaxed),
            failed: self.failed.load(Relaxed),
        }
    }
}

impl<T, E> Wake for Shared<T, E>
where
    T: Send,
    E: Send,
{
    fn wake(&self) {
        let _guard = self.lock.lock();
        self.available.notify_all();
        self.vacancy.notify_all();
    }
}
