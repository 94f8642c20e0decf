use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use refill_pool::{Builder, CancelToken, ClaimError, Pool};

mod common;
use common::{AtomicCounter, ManualSpawner};

fn counter_pool(capacity: usize, spawner: &ManualSpawner) -> Pool<usize> {
    let source = AtomicCounter::default();
    Builder::new()
        .capacity(capacity)
        .spawner(spawner.clone())
        .build(move || source.next())
        .unwrap()
}

#[test]
fn claim_timeout_on_empty_pool() {
    let spawner = ManualSpawner::new();
    let pool = counter_pool(2, &spawner);
    let start = Instant::now();
    assert_eq!(
        pool.claim_timeout(Duration::from_millis(20)),
        Err(ClaimError::Timeout)
    );
    assert!(start.elapsed() >= Duration::from_millis(20));
    // nothing was consumed, so nothing was rescheduled
    assert_eq!(spawner.pending(), 2);
}

#[test]
fn claim_timeout_returns_ready_resource() {
    let spawner = ManualSpawner::new();
    let pool = counter_pool(1, &spawner);
    spawner.run_pending();
    assert_eq!(pool.claim_timeout(Duration::from_millis(20)), Ok(0));
}

#[test]
fn claim_deadline_in_the_past_does_not_block() {
    let spawner = ManualSpawner::new();
    let pool = counter_pool(1, &spawner);
    assert_eq!(pool.claim_deadline(Instant::now()), Err(ClaimError::Timeout));
}

#[test]
fn timed_claim_served_by_late_production() {
    let spawner = ManualSpawner::new();
    let pool = Arc::new(counter_pool(1, &spawner));
    let clone_pool = pool.clone();
    let claimant = thread::spawn(move || clone_pool.claim_timeout(Duration::from_secs(10)));
    thread::sleep(Duration::from_millis(20));
    spawner.run_one();
    assert_eq!(claimant.join().unwrap(), Ok(0));
}

#[test]
fn cancel_wakes_blocked_claimant() {
    let spawner = ManualSpawner::new();
    let pool = Arc::new(counter_pool(1, &spawner));
    let token = CancelToken::new();

    let clone_pool = pool.clone();
    let clone_token = token.clone();
    let claimant = thread::spawn(move || clone_pool.claim_cancellable(&clone_token));
    thread::sleep(Duration::from_millis(20));
    assert!(token.cancel());
    assert_eq!(claimant.join().unwrap(), Err(ClaimError::Cancelled));

    // the cancelled claim left the slot alone
    assert_eq!(spawner.pending(), 1);
    spawner.run_pending();
    assert_eq!(pool.len(), 1);
}

#[test]
fn cancelled_token_on_empty_pool_returns_immediately() {
    let spawner = ManualSpawner::new();
    let pool = counter_pool(1, &spawner);
    let token = CancelToken::new();
    token.cancel();
    assert_eq!(pool.claim_cancellable(&token), Err(ClaimError::Cancelled));
}

#[test]
fn ready_resource_wins_over_cancelled_token() {
    let spawner = ManualSpawner::new();
    let pool = counter_pool(1, &spawner);
    spawner.run_pending();
    let token = CancelToken::new();
    token.cancel();
    assert_eq!(pool.claim_cancellable(&token), Ok(0));
}

#[test]
fn token_reused_across_claims() {
    let spawner = ManualSpawner::new();
    let pool = counter_pool(2, &spawner);
    spawner.run_pending();
    let token = CancelToken::new();
    assert_eq!(pool.claim_cancellable(&token), Ok(0));
    assert_eq!(pool.claim_cancellable(&token), Ok(1));
    assert!(!token.is_cancelled());
}

#[test]
fn dispose_beats_cancellable_claim() {
    let spawner = ManualSpawner::new();
    let pool = Arc::new(counter_pool(1, &spawner));
    let token = CancelToken::new();

    let clone_pool = pool.clone();
    let clone_token = token.clone();
    let claimant = thread::spawn(move || clone_pool.claim_cancellable(&clone_token));
    thread::sleep(Duration::from_millis(20));
    pool.dispose();
    assert_eq!(claimant.join().unwrap(), Err(ClaimError::Disposed));
    assert!(!token.is_cancelled());
}

#[test]
fn error_kinds_classify() {
    assert!(ClaimError::<()>::Drained.is_transient());
    assert!(ClaimError::<()>::Timeout.is_transient());
    assert!(ClaimError::<()>::Disposed.is_terminal());
    assert!(!ClaimError::Production(()).is_terminal());
    assert!(ClaimError::Production(()).is_transient());
    assert!(!ClaimError::<()>::Disposed.is_transient());
    assert_eq!(ClaimError::Production(5).into_production(), Some(5));
    assert_eq!(ClaimError::<u8>::Drained.into_production(), None);
    assert_eq!(
        ClaimError::<String>::Disposed.to_string(),
        "resource pool disposed"
    );
    assert_eq!(
        ClaimError::Production("refused".to_string()).to_string(),
        "resource production failed: refused"
    );
}
