use std::io;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::error;

/// A unit of background work handed to a [`Spawn`] implementation.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs production tasks off the calling thread.
///
/// Implementations must not run the task inline unless they cannot do
/// otherwise, since claims spawn their replacement task while the claimant waits.
pub trait Spawn: Send + Sync {
    /// Start `task` and return without waiting for it.
    fn spawn(&self, task: Task);
}

/// Spawns every task on its own named OS thread.
///
/// If the OS refuses to create a thread, the task runs on the calling thread
/// instead and an error is logged. The caller then blocks for the whole
/// production attempt, retry backoff included. This applies to the claim
/// that spawned the replacement, [`Pool::try_claim`](crate::Pool::try_claim)
/// too, and to pool construction.
#[derive(Debug, Clone)]
pub struct ThreadSpawner {
    name: String,
}

impl ThreadSpawner {
    /// Create a spawner whose threads are named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Name given to spawned threads.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        Self::new(crate::pool::DEFAULT_THREAD_NAME)
    }
}

impl Spawn for ThreadSpawner {
    fn spawn(&self, task: Task) {
        // `Builder::spawn` drops the closure on failure, so keep the task
        // reachable from here to run it ourselves.
        let slot = Arc::new(Mutex::new(Some(task)));
        let remote = Arc::clone(&slot);
        let spawned = thread::Builder::new().name(self.name.clone()).spawn(move || {
            let task = remote.lock().take();
            if let Some(task) = task {
                task();
            }
        });
        if let Err(err) = spawned {
            let task = slot.lock().take();
            if let Some(task) = task {
                run_inline(&err, task);
            }
        }
    }
}

fn run_inline(err: &io::Error, task: Task) {
    error!(error = %err, "failed to spawn producer thread, running task on the caller");
    task();
}
