//! Performance benchmarks for the load tester's hot paths
//!
//! The statistics engine runs once per load test over every outcome, and the
//! dispatcher overhead bounds how much load one process can generate.

use async_trait::async_trait;
use clap::Parser;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use network_load_tester::{
    cli::Cli,
    executor::{render_progress, Dispatcher},
    models::{RequestOutcome, TestConfiguration},
    pool::BufferPool,
    stats::{percentile, StatisticsEngine},
    types::Protocol,
    RequestSender,
};
use std::hint::black_box;
use std::time::Duration;

/// Outcomes with a 10% failure rate and a spread of response times
fn create_sample_outcomes(count: usize) -> Vec<RequestOutcome> {
    (0..count)
        .map(|i| {
            let ms = 5.0 + (i % 250) as f64 * 1.7;
            match i % 10 {
                0 => RequestOutcome::from_http_status(503, "Service Unavailable", ms, 0),
                5 if i % 20 == 5 => RequestOutcome::failed("Connection reset by peer", ms),
                _ => RequestOutcome::success(200, ms, 1024),
            }
        })
        .collect()
}

struct InstantSender;

#[async_trait]
impl RequestSender for InstantSender {
    async fn send(&self, _config: &TestConfiguration) -> RequestOutcome {
        RequestOutcome::success(200, 0.1, 0)
    }
}

fn benchmark_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics");
    let engine = StatisticsEngine::with_defaults();

    for size in [100usize, 10_000, 100_000].iter() {
        let outcomes = create_sample_outcomes(*size);
        group.bench_with_input(BenchmarkId::new("compute", size), size, |b, _| {
            b.iter(|| engine.compute(black_box(&outcomes), Duration::from_secs(10)))
        });
    }

    let mut sorted: Vec<f64> = create_sample_outcomes(10_000)
        .iter()
        .map(|o| o.response_time_ms)
        .collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    group.bench_function("percentile_p99", |b| b.iter(|| percentile(black_box(&sorted), 99.0)));

    group.finish();
}

fn benchmark_dispatch_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.sample_size(10);

    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");

    for concurrency in [1u64, 16, 256].iter() {
        let config = TestConfiguration {
            number_of_requests: 2_000,
            concurrency: *concurrency,
            show_progress: false,
            ..TestConfiguration::new("http://localhost/", Protocol::Http)
        };
        let dispatcher = Dispatcher::new(InstantSender);

        group.bench_with_input(BenchmarkId::new("instant_sender", concurrency), concurrency, |b, _| {
            b.iter(|| runtime.block_on(dispatcher.dispatch(&config)).expect("dispatch"))
        });
    }

    group.finish();
}

fn benchmark_support_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("support");

    let pool = BufferPool::new(8192, 64);
    pool.preallocate(16);
    group.bench_function("buffer_acquire_release", |b| {
        b.iter(|| {
            let buffer = pool.acquire();
            pool.release(black_box(buffer));
        })
    });

    group.bench_function("render_progress", |b| {
        b.iter(|| render_progress(black_box(4_321), 16, 10_000, 40))
    });

    group.bench_function("parse_cli_args", |b| {
        b.iter(|| {
            Cli::parse_from(black_box([
                "nload",
                "http://localhost:8080/",
                "-n",
                "1000",
                "-c",
                "50",
                "-H",
                "X-Trace: bench",
            ]))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_statistics,
    benchmark_dispatch_overhead,
    benchmark_support_paths
);
criterion_main!(benches);
