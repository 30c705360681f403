//! Benchmarks for submission and result round-trips

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use taskpool_rs::prelude::*;

fn bench_round_trip(c: &mut Criterion) {
    let pool = ThreadPool::new(4).unwrap();

    c.bench_function("submit_get_single", |b| {
        b.iter(|| pool.submit(|| black_box(1 + 1)).unwrap().get().unwrap())
    });
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_batch");

    for workers in [1usize, 2, 4, 8] {
        let pool = ThreadPool::new(workers).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
            b.iter(|| {
                let handles: Vec<_> = (0..1000u64)
                    .map(|i| pool.submit(move || black_box(i * i)).unwrap())
                    .collect();
                handles.into_iter().map(|h| h.get().unwrap()).sum::<u64>()
            })
        });
    }

    group.finish();
}

fn bench_sequential_baseline(c: &mut Criterion) {
    c.bench_function("sequential_1000", |b| {
        b.iter(|| (0..1000u64).map(|i| black_box(i * i)).sum::<u64>())
    });
}

criterion_group!(benches, bench_round_trip, bench_batch, bench_sequential_baseline);
criterion_main!(benches);
