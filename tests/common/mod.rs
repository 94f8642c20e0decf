#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use refill_pool::{Spawn, Task};

/// Queues production tasks until the test runs them.
#[derive(Clone, Default)]
pub struct ManualSpawner {
    tasks: Arc<Mutex<VecDeque<Task>>>,
}

impl ManualSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn take(&self) -> Option<Task> {
        self.tasks.lock().unwrap().pop_front()
    }

    /// Run the oldest pending task on the current thread.
    pub fn run_one(&self) -> bool {
        match self.take() {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run the tasks pending right now, returning how many ran.
    pub fn run_pending(&self) -> usize {
        let pending = self.pending();
        for _ in 0..pending {
            self.run_one();
        }
        pending
    }
}

impl Spawn for ManualSpawner {
    fn spawn(&self, task: Task) {
        self.tasks.lock().unwrap().push_back(task);
    }
}

#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicUsize);

impl AtomicCounter {
    /// Increment and return the previous value.
    pub fn next(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    pub fn value(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Spin until `cond` holds, panicking after five seconds.
pub fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}
