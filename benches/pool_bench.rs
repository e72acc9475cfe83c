//! Pool allocation benchmarks using criterion.
//!
//! Run with: cargo bench --bench pool_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use genpool::{Arena, ArenaConfig, Pool};

fn bench_arena_allocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena_allocate");
    group.throughput(Throughput::Bytes(16));

    group.bench_function("bump_16", |b| {
        let arena = Arena::new(ArenaConfig::default());
        b.iter(|| black_box(arena.allocate(16, 8)));
    });

    group.bench_function("bump_16_with_reset", |b| {
        let arena = Arena::new(ArenaConfig::default());
        b.iter(|| {
            for _ in 0..1024 {
                black_box(arena.allocate(16, 8));
            }
            arena.reset();
        });
    });

    group.finish();
}

fn bench_pool_allocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_allocate");

    let pool = Pool::new().unwrap();

    group.bench_function("default_16", |b| {
        b.iter(|| black_box(pool.allocate(16, 8)));
    });

    group.bench_function("temporary_16", |b| {
        b.iter(|| black_box(pool.allocate_temporary(16, 8)));
    });

    group.bench_function("typed_u64", |b| {
        b.iter(|| black_box(pool.alloc(0u64)));
    });

    group.finish();
    pool.clean();
}

fn bench_gc_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("gc_cycle");
    group.sample_size(20);

    group.bench_function("clean_after_4096_allocs", |b| {
        let pool = Pool::new().unwrap();
        b.iter(|| {
            for _ in 0..4096 {
                black_box(pool.allocate(32, 8));
            }
            pool.clean();
        });
    });

    group.bench_function("gc_with_small_copy", |b| {
        let pool = std::sync::Arc::new(Pool::new().unwrap());
        let hook_pool = std::sync::Arc::clone(&pool);
        pool.register_copy_hook(move || {
            for i in 0..64u64 {
                black_box(hook_pool.alloc(i));
            }
        });
        b.iter(|| {
            for _ in 0..1024 {
                black_box(pool.allocate(32, 8));
            }
            pool.gc();
        });
        pool.register_copy_hook(|| {});
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_arena_allocate,
    bench_pool_allocate,
    bench_gc_cycle
);
criterion_main!(benches);
