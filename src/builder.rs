use std::sync::Arc;

use crate::shared::ReleaseFn;
use crate::spawn::{Spawn, ThreadSpawner};
use crate::{Config, ConfigError, Pool, RetryPolicy};

/// A builder for creating a [`Pool`] with custom configuration.
///
/// # Example
///
/// ```rust
/// use refill_pool::{Builder, RetryPolicy};
///
/// let mut builder = Builder::<String>::new();
/// let pool = builder
///     .capacity(10)
///     .retry(RetryPolicy::retries(3))
///     .release(|conn: String| drop(conn))
///     .build(|| "connection".to_string())
///     .unwrap();
/// assert_eq!(pool.capacity(), 10);
/// ```
pub struct Builder<T> {
    /// Configuration of the pool.
    config: Config,
    /// Spawner for production tasks, threads named after the config by default.
    spawner: Option<Arc<dyn Spawn>>,
    /// Hook run on resources the pool discards.
    release: Option<ReleaseFn<T>>,
}

impl<T: Send + 'static> Builder<T> {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            spawner: None,
            release: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }

    /// Set the number of resources the pool keeps ready.
    pub fn capacity(&mut self, capacity: usize) -> &mut Self {
        self.config.capacity = capacity;
        self
    }

    /// Set what production tasks do when the producer fails.
    pub fn retry(&mut self, retry: RetryPolicy) -> &mut Self {
        self.config.retry = retry;
        self
    }

    /// Set the name of the threads running production tasks.
    ///
    /// Ignored when a custom [`spawner`](Self::spawner) is set.
    pub fn thread_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.config.thread_name = name.into();
        self
    }

    /// Run production tasks on `spawner` instead of dedicated threads.
    pub fn spawner<S: Spawn + 'static>(&mut self, spawner: S) -> &mut Self {
        self.spawner = Some(Arc::new(spawner));
        self
    }

    /// Set the function cleaning up a resource the pool discards.
    ///
    /// It runs for every resource drained by disposal and for every resource
    /// a production task finishes after disposal. Claimed resources never
    /// pass through it.
    pub fn release<F>(&mut self, func: F) -> &mut Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.release = Some(Box::new(func));
        self
    }

    /// Build the pool around an infallible producer.
    pub fn build<F>(&mut self, producer: F) -> Result<Pool<T>, ConfigError>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.try_build(move || Ok(producer()))
    }

    /// Build the pool around a fallible producer.
    pub fn try_build<F, E>(&mut self, producer: F) -> Result<Pool<T, E>, ConfigError>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Send + 'static,
    {
        let config = std::mem::take(&mut self.config);
        let spawner = self
            .spawner
            .take()
            .unwrap_or_else(|| {
                Arc::new(ThreadSpawner::new(config.thread_name.clone())) as Arc<dyn Spawn>
            });
        Pool::from_parts(config, Box::new(producer), self.release.take(), spawner)
    }
}

impl<T: Send + 'static> Default for Builder<T> {
    fn default() -> Self {
        Self::new()
    }
}
