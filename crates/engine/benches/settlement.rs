use alloy_primitives::Address;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use nftswap_core::Holder;
use nftswap_engine::{EngineConfig, SwapEngine};
use nftswap_registry::InMemoryRegistry;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn holder(i: u64) -> Holder {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&(i + 1).to_be_bytes());
    Address::new(bytes)
}

/// Engine with `count` open trades over disjoint assets, plus the
/// (counterparty, id) calls that accept them.
fn setup(count: u64) -> (SwapEngine<InMemoryRegistry>, Vec<(Holder, u64)>) {
    let registry = Arc::new(InMemoryRegistry::new());
    let engine = SwapEngine::new(EngineConfig::default(), Arc::clone(&registry));
    let escrow = engine.identity();

    let calls = (0..count)
        .map(|i| {
            let (r, c) = (holder(2 * i), holder(2 * i + 1));
            let a = registry.mint(r);
            let b = registry.mint(c);
            registry.approve(r, a, Some(escrow)).unwrap();
            registry.approve(c, b, Some(escrow)).unwrap();
            let id = engine.create_trade(r, c, a, b).unwrap();
            (c, id)
        })
        .collect();

    (engine, calls)
}

// ---------------------------------------------------------------------------
// Benchmark: one accept at a time
// ---------------------------------------------------------------------------

fn bench_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("accept_sequential");
    for count in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || setup(count),
                |(engine, calls)| {
                    for (caller, id) in calls {
                        black_box(engine.accept_trade(caller, id).unwrap());
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: rayon batch over disjoint trades
// ---------------------------------------------------------------------------

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("accept_batch");
    for count in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || setup(count),
                |(engine, calls)| black_box(engine.accept_batch(&calls)),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: trade creation
// ---------------------------------------------------------------------------

fn bench_create(c: &mut Criterion) {
    c.bench_function("create_trade", |b| {
        let registry = Arc::new(InMemoryRegistry::new());
        let engine = SwapEngine::new(EngineConfig::default(), Arc::clone(&registry));
        let (r, cp) = (holder(0), holder(1));
        let a = registry.mint(r);
        let bb = registry.mint(cp);
        registry.approve(r, a, Some(engine.identity())).unwrap();

        b.iter(|| black_box(engine.create_trade(r, cp, a, bb).unwrap()));
    });
}

criterion_group!(benches, bench_sequential, bench_batch, bench_create);
criterion_main!(benches);
