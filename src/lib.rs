//! A bounded object pool that refills itself in the background.
//!
//! # Features
//!
//! - Fixed capacity, filled by background production tasks right after construction.
//! - Every claim starts exactly one production task to replace what it took,
//!   so claimants never pay the construction cost themselves.
//! - Blocking, non-blocking, timed and cancellable claims.
//! - Orderly disposal that wakes waiting claimants and releases buffered
//!   resources. Production tasks still running abandon what they build.
//! - Producer failures are retried with backoff or surfaced to a claimant,
//!   never swallowed.
//!
//! # Claims
//!
//! A claim removes one resource from the pool for good. Claimed resources are
//! not returned; the pool builds a new one instead.
//!
//! # Examples
//!
//! ## Single thread
//!
//! ```rust
//! use refill_pool::{ClaimError, Pool};
//!
//! let pool = Pool::new(2, || String::from("conn")).unwrap();
//! assert_eq!(pool.capacity(), 2);
//! let conn = pool.claim().unwrap();
//! assert_eq!(conn, "conn");
//! pool.dispose();
//! assert_eq!(pool.try_claim(), Err(ClaimError::Disposed));
//! ```
//!
//! ## Multiple threads sharing a pool
//!
//! ```rust
//! use refill_pool::Pool;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::{Arc, mpsc};
//!
//! let next = AtomicUsize::new(0);
//! let pool = Arc::new(Pool::new(4, move || next.fetch_add(1, Ordering::SeqCst)).unwrap());
//!
//! let (tx, rx) = mpsc::channel();
//! let mut handles = Vec::new();
//! for _ in 0..2 {
//!     let pool = pool.clone();
//!     let tx = tx.clone();
//!     handles.push(std::thread::spawn(move || {
//!         for _ in 0..10 {
//!             tx.send(pool.claim().unwrap()).unwrap();
//!         }
//!     }));
//! }
//! drop(tx);
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//!
//! let mut claimed: Vec<usize> = rx.iter().collect();
//! claimed.sort();
//! claimed.dedup();
//! assert_eq!(claimed.len(), 20);
//! ```

mod builder;
mod error;
mod pool;
mod shared;
mod signal;
mod spawn;

pub use builder::Builder;
pub use error::{ClaimError, ConfigError};
pub use pool::{Config, Pool, PoolStats, RetryPolicy};
pub use signal::CancelToken;
pub use spawn::{Spawn, Task, ThreadSpawner};
