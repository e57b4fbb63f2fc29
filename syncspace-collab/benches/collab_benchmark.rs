use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use syncspace_collab::{events, Envelope, EventRouter, Scope};
use syncspace_core::Identity;

fn content_change(len: usize) -> Envelope {
    let user = Identity::new("u-bench", "Bench");
    Envelope::document_content_change(&user, "doc-1", &"x".repeat(len))
}

fn bench_envelope_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("Envelope");
    for len in [64usize, 4096] {
        let envelope = content_change(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("encode", len), &envelope, |b, env| {
            b.iter(|| black_box(env.encode().unwrap()));
        });

        let text = envelope.encode().unwrap();
        group.bench_with_input(BenchmarkId::new("decode", len), &text, |b, text| {
            b.iter(|| black_box(Envelope::decode(black_box(text)).unwrap()));
        });
    }
    group.finish();
}

fn bench_originator(c: &mut Criterion) {
    let mut envelope = content_change(64);
    envelope.origin = None;
    c.bench_function("originator_from_payload", |b| {
        b.iter(|| black_box(black_box(&envelope).originator()));
    });
}

fn bench_router_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("Router");
    for subscribers in [1usize, 16, 128] {
        let router = EventRouter::new();
        let scope = Scope::Document("doc-1".into());
        let mut subs: Vec<_> = (0..subscribers)
            .map(|_| router.subscribe(scope.clone(), &[events::DOCUMENT_UPDATED]))
            .collect();
        // Unrelated scopes that the lookup has to skip.
        let _noise: Vec<_> = (0..64)
            .map(|i| router.subscribe(Scope::Document(format!("other-{i}")), &[events::DOCUMENT_UPDATED]))
            .collect();

        let envelope = Envelope::new(events::DOCUMENT_UPDATED, scope, None, &serde_json::json!({}));
        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_function(BenchmarkId::new("dispatch_fan_out", subscribers), |b| {
            b.iter(|| {
                black_box(router.dispatch(black_box(&envelope)));
                for sub in subs.iter_mut() {
                    let _ = sub.try_recv();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_envelope_encode, bench_originator, bench_router_dispatch);
criterion_main!(benches);
