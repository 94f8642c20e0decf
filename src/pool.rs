use std::convert::Infallible;
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::Builder;
use crate::error::{ClaimError, ConfigError};
use crate::shared::{Producer, ReleaseFn, Shared};
use crate::signal::CancelToken;
use crate::spawn::{Spawn, ThreadSpawner};

pub(crate) const DEFAULT_THREAD_NAME: &str = "refill-pool";

/// A bounded pool of pre-built resources that refills itself in the background.
///
/// Every slot of the pool is filled by a production task that calls the
/// producer once and enqueues the result. Claiming a resource consumes its
/// slot and starts exactly one production task to fill it again, so the pool
/// trends back to full without the claimant waiting on the producer.
/// Claimed resources belong to the caller and are never returned.
///
/// # Examples
///
/// ```rust
/// use refill_pool::Pool;
/// use std::collections::HashSet;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let next = AtomicUsize::new(0);
/// let pool = Pool::new(3, move || next.fetch_add(1, Ordering::SeqCst)).unwrap();
///
/// // a fourth claim waits for a replacement to be produced
/// let claimed: HashSet<usize> = (0..4).map(|_| pool.claim().unwrap()).collect();
/// assert_eq!(claimed.len(), 4);
///
/// pool.dispose();
/// assert!(pool.claim().unwrap_err().is_terminal());
/// ```
pub struct Pool<T, E = Infallible>
where
    T: Send + 'static,
    E: Send + 'static,
{
    shared: Arc<Shared<T, E>>,
}

impl<T: Send + 'static> Pool<T> {
    /// Create a pool of `capacity` resources built by an infallible producer.
    ///
    /// # Example
    ///
    /// ```rust
    /// use refill_pool::{ConfigError, Pool};
    ///
    /// let pool = Pool::new(4, || vec![0u8; 1024]).unwrap();
    /// assert_eq!(pool.capacity(), 4);
    /// assert_eq!(pool.claim().unwrap().len(), 1024);
    ///
    /// assert_eq!(Pool::new(0, || 0u8).unwrap_err(), ConfigError::ZeroCapacity);
    /// ```
    pub fn new<F>(capacity: usize, producer: F) -> Result<Self, ConfigError>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Builder::new().capacity(capacity).build(producer)
    }
}

impl<T, E> Pool<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a pool of `capacity` resources built by a fallible producer.
    ///
    /// A producer error is handed to a claimant as
    /// [`ClaimError::Production`] in place of the resource.
    ///
    /// # Example
    ///
    /// ```rust
    /// use refill_pool::{ClaimError, Pool};
    ///
    /// let pool: Pool<u32, String> = Pool::try_new(1, || Err("refused".to_string())).unwrap();
    /// assert_eq!(pool.claim(), Err(ClaimError::Production("refused".to_string())));
    /// ```
    pub fn try_new<F>(capacity: usize, producer: F) -> Result<Self, ConfigError>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Builder::new().capacity(capacity).try_build(producer)
    }

    /// Create a pool with the given configuration and a fallible producer.
    ///
    /// # Example
    ///
    /// ```rust
    /// use refill_pool::{Config, Pool};
    ///
    /// let mut config = Config::default();
    /// config.capacity = 2;
    /// config.retry.max_retries = 3;
    /// let pool: Pool<String, std::io::Error> =
    ///     Pool::with_config(config, || Ok("ready".to_string())).unwrap();
    /// assert_eq!(pool.claim().unwrap(), "ready");
    /// ```
    pub fn with_config<F>(config: Config, producer: F) -> Result<Self, ConfigError>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let spawner = Arc::new(ThreadSpawner::new(config.thread_name.clone()));
        Self::from_parts(config, Box::new(producer), None, spawner)
    }

    pub(crate) fn from_parts(
        config: Config,
        producer: Producer<T, E>,
        release: Option<ReleaseFn<T>>,
        spawner: Arc<dyn Spawn>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = config.capacity;
        let shared = Arc::new(Shared::new(config, producer, release, spawner));
        for _ in 0..capacity {
            shared.spawn_production();
        }
        debug!(capacity, "resource pool created");
        Ok(Self { shared })
    }

    /// Get the capacity of the pool.
    pub fn capacity(&self) -> usize {
        self.shared.config.capacity
    }

    /// Get the number of outcomes ready to be claimed.
    ///
    /// Production failures waiting to be surfaced are counted too.
    pub fn len(&self) -> usize {
        self.shared.ready.len()
    }

    /// Check if nothing is ready to be claimed right now.
    pub fn is_empty(&self) -> bool {
        self.shared.ready.is_empty()
    }

    /// Check if the pool has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Get a snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }

    /// Claim a resource, waiting until one is ready.
    ///
    /// Returns [`ClaimError::Disposed`] without waiting once the pool is
    /// disposed, and wakes up with that error if disposal happens while
    /// waiting. Waiting claimants are served in no particular order.
    pub fn claim(&self) -> Result<T, ClaimError<E>> {
        self.shared.take_blocking(None, None)
    }

    /// Claim a resource if one is ready, without waiting.
    ///
    /// With the default [`ThreadSpawner`], a failure to start the replacement
    /// thread makes this call run the producer itself. See [`ThreadSpawner`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use refill_pool::{ClaimError, Pool};
    ///
    /// let pool = Pool::new(1, || 7u64).unwrap();
    /// let first = pool.claim().unwrap();
    /// assert_eq!(first, 7);
    /// match pool.try_claim() {
    ///     // the replacement may already have been produced
    ///     Ok(value) => assert_eq!(value, 7),
    ///     Err(err) => assert_eq!(err, ClaimError::Drained),
    /// }
    /// pool.dispose();
    /// assert_eq!(pool.try_claim(), Err(ClaimError::Disposed));
    /// ```
    pub fn try_claim(&self) -> Result<T, ClaimError<E>> {
        self.shared.take().unwrap_or(Err(ClaimError::Drained))
    }

    /// Claim a resource, giving up with [`ClaimError::Timeout`] after `timeout`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use refill_pool::{ClaimError, Pool};
    /// use std::time::Duration;
    ///
    /// let pool = Pool::new(1, || {
    ///     std::thread::sleep(Duration::from_secs(5));
    ///     0u8
    /// })
    /// .unwrap();
    /// assert_eq!(
    ///     pool.claim_timeout(Duration::from_millis(10)),
    ///     Err(ClaimError::Timeout)
    /// );
    /// ```
    pub fn claim_timeout(&self, timeout: Duration) -> Result<T, ClaimError<E>> {
        self.claim_deadline(Instant::now() + timeout)
    }

    /// Claim a resource, giving up with [`ClaimError::Timeout`] at `deadline`.
    pub fn claim_deadline(&self, deadline: Instant) -> Result<T, ClaimError<E>> {
        self.shared.take_blocking(Some(deadline), None)
    }

    /// Claim a resource, giving up with [`ClaimError::Cancelled`] when `token` is cancelled.
    ///
    /// A claim that gives up has not removed anything from the pool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use refill_pool::{CancelToken, Pool};
    ///
    /// let pool = Pool::new(1, || 1u8).unwrap();
    /// let token = CancelToken::new();
    /// assert_eq!(pool.claim_cancellable(&token), Ok(1));
    /// ```
    pub fn claim_cancellable(&self, token: &CancelToken) -> Result<T, ClaimError<E>> {
        self.shared.take_blocking(None, Some(token))
    }

    /// Dispose the pool.
    ///
    /// Stops replenishment and wakes every waiting claimant, then releases
    /// the buffered resources. Production tasks still running release their
    /// resource instead of enqueueing it. Calling this again is a no-op.
    /// Dropping the pool disposes it as well.
    pub fn dispose(&self) {
        if let Some(drained) = self.shared.dispose() {
            debug!(drained, "resource pool disposed");
        }
    }
}

impl<T, E> Drop for Pool<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T, E> Debug for Pool<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &self.capacity())
            .field("ready", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Counters describing what a pool has done so far.
///
/// Every produced resource ends up either claimed, released or still
/// buffered, so once a disposed pool has no production task running,
/// `produced == claimed + released`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Resources the producer built successfully.
    pub produced: usize,
    /// Resources handed to claimants.
    pub claimed: usize,
    /// Resources discarded by disposal or by abandoning production tasks.
    pub released: usize,
    /// Production failures surfaced after retries were exhausted.
    pub failed: usize,
}

/// Configuration for the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Number of resources the pool keeps ready.
    pub capacity: usize,
    /// What a production task does when the producer fails.
    pub retry: RetryPolicy,
    /// Name of the threads running production tasks.
    pub thread_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 16,
            retry: RetryPolicy::default(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl Config {
    /// Check the configuration can build a pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        self.retry.validate()
    }
}

/// Retry policy for a failing producer.
///
/// With `max_retries == 0` the first failure is surfaced to a claimant.
/// Otherwise the production task sleeps `initial_backoff`, then grows the
/// sleep by `multiplier` up to `max_backoff` between attempts. Disposal cuts
/// a sleep short and ends the task.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryPolicy {
    /// Extra producer calls allowed per slot before the failure is surfaced.
    pub max_retries: u32,
    /// Sleep before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for the sleep between retries.
    pub max_backoff: Duration,
    /// Factor applied to the sleep after each retry.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that surfaces the first failure.
    pub fn never() -> Self {
        Self::default()
    }

    /// A policy retrying up to `max_retries` times with the default backoff.
    pub fn retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.multiplier == 0 {
            return Err(ConfigError::InvalidRetry(
                "multiplier must be at least 1".to_string(),
            ));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(ConfigError::InvalidRetry(
                "initial_backoff exceeds max_backoff".to_string(),
            ));
        }
        Ok(())
    }

    /// Sleep to use after `current`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use refill_pool::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::retries(5);
    /// assert_eq!(policy.next_backoff(Duration::from_millis(10)), Duration::from_millis(20));
    /// assert_eq!(policy.next_backoff(Duration::from_millis(800)), Duration::from_secs(1));
    /// ```
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(self.multiplier).min(self.max_backoff)
    }
}
