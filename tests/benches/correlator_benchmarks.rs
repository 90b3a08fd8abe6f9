//! # Correlator Benchmarks
//!
//! | Operation | Target |
//! |-----------|--------|
//! | register + dispatch (resolve) | < 10µs |
//! | dispatch of an unmatched event | < 2µs |
//! | frame parse + dispatch | < 20µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use evented_requests::{Correlator, CorrelatorConfig, FutureOptions, IncomingEvent};
use serde_json::json;
use shared_bus::InMemoryNotificationBus;
use std::sync::Arc;
use std::time::Duration;

fn correlator() -> Correlator {
    Correlator::new(
        CorrelatorConfig::default().with_sequential_ids("bench-"),
        Arc::new(InMemoryNotificationBus::new()),
    )
    .expect("valid config")
}

fn bench_register_and_resolve(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let _guard = runtime.enter();

    let mut group = c.benchmark_group("correlator");
    group.measurement_time(Duration::from_secs(5));

    // Background load: futures that stay pending during the measurement.
    for pending in [0usize, 1_000, 5_000] {
        let correlator = correlator();
        for _ in 0..pending {
            correlator
                .register(FutureOptions::new().success_on("Never"))
                .expect("register");
        }

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("register_resolve", pending),
            &correlator,
            |b, correlator| {
                b.iter(|| {
                    let id = correlator
                        .register(FutureOptions::new().success_on("UserCreated"))
                        .expect("register");
                    black_box(correlator.dispatch(IncomingEvent::correlated(
                        "UserCreated",
                        id,
                        json!({}),
                    )))
                })
            },
        );
    }

    let correlator = correlator();
    group.bench_function("dispatch_unmatched", |b| {
        b.iter(|| {
            black_box(correlator.dispatch(IncomingEvent::correlated(
                "UserCreated",
                "nobody",
                json!({}),
            )))
        })
    });

    let frame = json!({
        "event": "UserCreated",
        "clientMsgId": "nobody",
        "username": "dummyuser",
        "timestamp": "2011-04-01T12:00:00Z"
    })
    .to_string();
    group.bench_function("parse_and_dispatch", |b| {
        b.iter(|| {
            let event = IncomingEvent::from_json(black_box(&frame)).expect("valid frame");
            black_box(correlator.dispatch(event))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_register_and_resolve);
criterion_main!(benches);
