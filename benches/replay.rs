//! Replay throughput benchmarks for both oracles and the FIFO baseline.
//!
//! Traces are generated deterministically (hot/cold key split, no external
//! RNG crates) so runs are comparable across machines.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use beladykit::prelude::*;

#[derive(Debug, Clone)]
struct XorShift64(u64);

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

/// Leveled trace with an 80/20 hot/cold key split: 20% of the universe
/// receives 80% of accesses, so caches in the benchmarked size range see a
/// realistic mix of hits and evictions.
fn hotset_trace(requests: usize, universe: u64, seed: u64) -> Trace<u64> {
    let mut rng = XorShift64::new(seed);
    let hot_size = (universe / 5).max(1);
    let mut next_key = |rng: &mut XorShift64| {
        if rng.next_u64() % 10 < 8 {
            rng.next_u64() % hot_size
        } else {
            hot_size + rng.next_u64() % (universe - hot_size).max(1)
        }
    };

    (0..requests)
        .map(|_| {
            let levels = 1 + (rng.next_u64() % 3) as usize;
            Request::new(
                (0..levels)
                    .map(|_| {
                        let keys = 1 + (rng.next_u64() % 4) as usize;
                        (0..keys).map(|_| next_key(&mut rng)).collect()
                    })
                    .collect(),
            )
        })
        .collect()
}

fn cfg(capacity: usize) -> ReplayConfig {
    ReplayConfig::try_new(capacity)
        .unwrap()
        .with_warmup(0)
        .with_checkpoint(None)
}

fn bench_annotate(c: &mut Criterion) {
    let trace = hotset_trace(10_000, 2_000, 42);
    c.bench_function("annotate_10k", |b| {
        b.iter(|| black_box(annotate(black_box(&trace))))
    });
}

fn bench_belady_replay(c: &mut Criterion) {
    let trace = hotset_trace(10_000, 2_000, 42);
    let annotated = annotate(&trace);

    let mut group = c.benchmark_group("belady_replay_10k");
    for capacity in [64, 256, 1024] {
        group.bench_function(format!("capacity_{capacity}"), |b| {
            b.iter(|| black_box(run_belady(&annotated, cfg(capacity)).unwrap()))
        });
    }
    group.finish();
}

fn bench_transactional_replay(c: &mut Criterion) {
    let trace = hotset_trace(10_000, 2_000, 42);

    let mut group = c.benchmark_group("transactional_replay_10k");
    for capacity in [64, 256, 1024] {
        group.bench_function(format!("capacity_{capacity}"), |b| {
            b.iter(|| black_box(run_transactional(&trace, cfg(capacity)).unwrap()))
        });
    }
    group.finish();
}

fn bench_fifo_baseline(c: &mut Criterion) {
    let trace = hotset_trace(10_000, 2_000, 42);
    c.bench_function("fifo_replay_10k_capacity_256", |b| {
        b.iter(|| black_box(FifoReplay::new(cfg(256)).run(&trace).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_annotate,
    bench_belady_replay,
    bench_transactional_replay,
    bench_fifo_baseline
);
criterion_main!(benches);
