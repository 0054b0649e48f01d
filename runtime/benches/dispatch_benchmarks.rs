//! Dispatch benchmarks
//!
//! Measures the cost of the pieces on the dispatch path:
//! - Reducer execution in isolation
//! - `Store::send` with an empty and a populated middleware chain
//! - Subscription notification fan-out
//! - Effect execution overhead
//!
//! Run with: `cargo bench -p statecraft-runtime`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup
#![allow(dead_code)] // Benchmark data structures may have unused fields

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use statecraft_core::middleware::{Middleware, Next, Proceeded};
use statecraft_core::{effect::Effect, effects, reducer::Reducer, Effects};
use statecraft_runtime::Store;
use std::convert::Infallible;
use std::sync::Arc;

#[derive(Clone, Debug)]
struct BenchState {
    counter: i64,
    data: Vec<u8>, // For measuring snapshot copy cost
}

impl Default for BenchState {
    fn default() -> Self {
        Self {
            counter: 0,
            data: vec![0; 1024],
        }
    }
}

#[derive(Clone, Debug)]
enum BenchAction {
    Increment,
    Spawn,
    NoOp,
}

#[derive(Clone)]
struct BenchReducer;

impl Reducer for BenchReducer {
    type State = BenchState;
    type Action = BenchAction;
    type Environment = ();
    type Error = Infallible;

    fn reduce(&self, state: &mut BenchState, action: BenchAction, _env: &()) -> Result<Effects<BenchAction>, Infallible> {
        match action {
            BenchAction::Increment => {
                state.counter += 1;
                Ok(effects![])
            },
            BenchAction::Spawn => Ok(effects![Effect::Future(Box::pin(async { Some(BenchAction::NoOp) }))]),
            BenchAction::NoOp => Ok(effects![]),
        }
    }
}

struct PassThrough;

impl Middleware<BenchReducer> for PassThrough {
    fn handle(&self, state: Arc<BenchState>, action: BenchAction, next: Next<'_, BenchReducer>) -> Proceeded<BenchReducer> {
        next.run(state, action)
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

/// Benchmark reducer execution in isolation (no Store overhead)
fn benchmark_reducer_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("reducer");
    group.throughput(Throughput::Elements(1));

    group.bench_function("increment", |b| {
        let mut state = BenchState::default();
        b.iter(|| {
            let _effects = BenchReducer.reduce(&mut state, black_box(BenchAction::Increment), &());
        });
    });

    group.finish();
}

/// Benchmark Store throughput (actions/sec)
fn benchmark_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("send");
    group.throughput(Throughput::Elements(1));
    let runtime = runtime();

    group.bench_function("no_middleware", |b| {
        let store = runtime
            .block_on(Store::new(BenchState::default(), BenchReducer, ()))
            .expect("store builds");

        b.to_async(&runtime).iter(|| async {
            let _ = store.send(black_box(BenchAction::Increment)).await;
        });
    });

    group.bench_function("three_links", |b| {
        let store = runtime
            .block_on(
                Store::builder(BenchState::default(), BenchReducer, ())
                    .middleware(PassThrough)
                    .middleware(PassThrough)
                    .middleware(PassThrough)
                    .build(),
            )
            .expect("store builds");

        b.to_async(&runtime).iter(|| async {
            let _ = store.send(black_box(BenchAction::Increment)).await;
        });
    });

    group.bench_function("send_and_snapshot", |b| {
        let store = runtime
            .block_on(Store::new(BenchState::default(), BenchReducer, ()))
            .expect("store builds");

        b.to_async(&runtime).iter(|| async {
            let _ = store.send(black_box(BenchAction::Increment)).await;
            black_box(store.state(|s| s.counter));
        });
    });

    group.finish();
}

/// Benchmark notification cost with many live subscriptions
fn benchmark_subscriptions(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscriptions");
    group.throughput(Throughput::Elements(1));
    let runtime = runtime();

    for count in [1_usize, 16, 128] {
        group.bench_function(format!("notify_{count}"), |b| {
            let store = runtime
                .block_on(Store::new(BenchState::default(), BenchReducer, ()))
                .expect("store builds");
            let subs: Vec<_> = (0..count)
                .map(|_| {
                    store.subscribe(
                        |s: &BenchState| s.counter,
                        |value: &i64| {
                            black_box(value);
                        },
                    )
                })
                .collect();

            b.to_async(&runtime).iter(|| async {
                let _ = store.send(black_box(BenchAction::Increment)).await;
            });
            drop(subs);
        });
    }

    group.finish();
}

/// Benchmark effect execution overhead
fn benchmark_effect_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("effect_overhead");
    group.throughput(Throughput::Elements(1));
    let runtime = runtime();

    group.bench_function("effect_future_with_feedback", |b| {
        let store = runtime
            .block_on(Store::new(BenchState::default(), BenchReducer, ()))
            .expect("store builds");

        b.to_async(&runtime).iter(|| async {
            if let Ok(mut handle) = store.send(black_box(BenchAction::Spawn)).await {
                handle.wait().await;
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_reducer_execution,
    benchmark_send,
    benchmark_subscriptions,
    benchmark_effect_overhead
);
criterion_main!(benches);
