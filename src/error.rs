use thiserror::Error;

/// An error returned when claiming a resource from a [`Pool`](crate::Pool).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError<E> {
    /// No resource is ready right now, but the pool is alive.
    ///
    /// Only returned by [`Pool::try_claim`](crate::Pool::try_claim). Retrying later is fine.
    #[error("resource pool drained")]
    Drained,
    /// The pool has been disposed and will never produce again.
    #[error("resource pool disposed")]
    Disposed,
    /// The producer failed to build the resource for this slot.
    #[error("resource production failed: {0}")]
    Production(E),
    /// The [`CancelToken`](crate::CancelToken) passed to the claim was cancelled.
    #[error("claim cancelled")]
    Cancelled,
    /// The deadline passed to the claim elapsed.
    #[error("claim timed out")]
    Timeout,
}

impl<E> ClaimError<E> {
    /// Whether the claim may succeed if simply retried.
    ///
    /// A production failure counts: its slot is already being refilled.
    ///
    /// # Example
    ///
    /// ```rust
    /// use refill_pool::ClaimError;
    ///
    /// assert!(ClaimError::<()>::Drained.is_transient());
    /// assert!(ClaimError::Production("refused").is_transient());
    /// assert!(!ClaimError::<()>::Disposed.is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether the pool is gone and callers should stop using it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disposed)
    }

    /// Get the producer error, if this is a production failure.
    pub fn into_production(self) -> Option<E> {
        match self {
            Self::Production(err) => Some(err),
            _ => None,
        }
    }
}

/// An error in the pool configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A pool must be able to buffer at least one resource.
    #[error("pool capacity must be at least 1")]
    ZeroCapacity,
    /// The retry policy is not usable.
    #[error("invalid retry policy: {0}")]
    InvalidRetry(String),
}
