//! Context pool benchmarks
//!
//! Compares a checkout/release cycle through the recycling pool with the
//! non-pooling pool that constructs a fresh context every time.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hyper::body::Bytes;
use hyper::Request;
use misugo::http::ResponseWriter;
use misugo::pool::{self, ContextPool, FreshPool, RecyclingPool};
use std::sync::Arc;
use std::thread;

fn bind_and_release(pool: &Arc<dyn ContextPool>, path: &str) {
    let (parts, _) = Request::builder()
        .uri(path)
        .body(())
        .unwrap()
        .into_parts();
    let mut ctx = pool::checkout(pool);
    ctx.bind(parts, Bytes::from_static(b"{}"), ResponseWriter::new());
    black_box(ctx.path());
}

fn benchmark_checkout_cycle(c: &mut Criterion) {
    let recycling: Arc<dyn ContextPool> = Arc::new(RecyclingPool::new(64));
    let fresh: Arc<dyn ContextPool> = Arc::new(FreshPool::new());

    c.bench_function("recycling_checkout_release", |b| {
        b.iter(|| bind_and_release(&recycling, black_box("/items")))
    });

    c.bench_function("fresh_checkout_release", |b| {
        b.iter(|| bind_and_release(&fresh, black_box("/items")))
    });
}

fn benchmark_contended_checkout(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_checkout");

    for threads in [2usize, 4, 8] {
        let recycling: Arc<dyn ContextPool> = Arc::new(RecyclingPool::new(64));
        group.bench_with_input(BenchmarkId::new("recycling", threads), &threads, |b, &n| {
            b.iter(|| {
                let handles: Vec<_> = (0..n)
                    .map(|_| {
                        let pool = Arc::clone(&recycling);
                        thread::spawn(move || {
                            for _ in 0..100 {
                                bind_and_release(&pool, "/items");
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    let _ = handle.join();
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_checkout_cycle, benchmark_contended_checkout);
criterion_main!(benches);
