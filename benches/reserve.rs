//! Reservation path benchmarks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use framepool::pool::FramePool;
use std::sync::Arc;

fn bench_reserve_recycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("reserve_recycle");

    for capacity in [4, 16, 64] {
        let pool = FramePool::with_heap_memory(capacity).unwrap();
        // Warm up so the steady-state path is pure recycling.
        let r = pool.reserve_for_producer(4096).unwrap();
        pool.relinquish_producer_reservation(r.buffer_id).unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &pool, |b, pool| {
            b.iter(|| {
                let r = pool.reserve_for_producer(4096).expect("pool not exhausted");
                pool.relinquish_producer_reservation(r.buffer_id).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_hold_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("hold_release");

    let pool = FramePool::with_heap_memory(4).unwrap();

    group.throughput(Throughput::Elements(1));
    group.bench_function("hold_2_consumers", |b| {
        b.iter(|| {
            let r = pool.reserve_for_producer(4096).expect("pool not exhausted");
            pool.hold_for_consumers(r.buffer_id, 2).unwrap();
            pool.relinquish_consumer_hold(r.buffer_id, 1).unwrap();
            pool.relinquish_consumer_hold(r.buffer_id, 1).unwrap();
        });
    });

    group.finish();
}

fn bench_concurrent_producer_consumer(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");

    let pool = FramePool::with_heap_memory(8).unwrap();

    group.throughput(Throughput::Elements(100));
    group.bench_function("4_threads_100_cycles_each", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let pool = Arc::clone(&pool);
                    std::thread::spawn(move || {
                        for _ in 0..100 {
                            if let Some(r) = pool.reserve_for_producer(1024) {
                                pool.hold_for_consumers(r.buffer_id, 1).unwrap();
                                pool.relinquish_consumer_hold(r.buffer_id, 1).unwrap();
                            }
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_reserve_recycle,
    bench_hold_release,
    bench_concurrent_producer_consumer
);
criterion_main!(benches);
