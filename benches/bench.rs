use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use criterion::{Criterion, criterion_group, criterion_main};
use refill_pool::{ClaimError, Pool};

fn claim_single_thread(c: &mut Criterion) {
    let next = AtomicUsize::new(0);
    let pool = Pool::new(64, move || next.fetch_add(1, Ordering::Relaxed)).unwrap();
    c.bench_function("claim", |b| b.iter(|| black_box(pool.claim().unwrap())));
}

fn try_claim_spin(c: &mut Criterion) {
    let pool = Pool::new(64, || vec![0u8; 256]).unwrap();
    c.bench_function("try_claim spin", |b| {
        b.iter(|| loop {
            match pool.try_claim() {
                Ok(buf) => break black_box(buf),
                Err(ClaimError::Drained) => std::hint::spin_loop(),
                Err(err) => panic!("{err}"),
            }
        })
    });
}

fn claim_contended(c: &mut Criterion) {
    let next = AtomicUsize::new(0);
    let pool = Arc::new(Pool::new(64, move || next.fetch_add(1, Ordering::Relaxed)).unwrap());
    c.bench_function("claim 4 threads", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let pool = pool.clone();
                    thread::spawn(move || {
                        for _ in 0..16 {
                            black_box(pool.claim().unwrap());
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        })
    });
}

criterion_group!(benches, claim_single_thread, try_claim_spin, claim_contended);
criterion_main!(benches);
