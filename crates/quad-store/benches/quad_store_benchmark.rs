//! Insert and lookup benchmarks for the in-memory backend.
//!
//! Run with: cargo bench --bench quad_store_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use quad_model::Value;
use quad_store::{Delta, InMemoryBackend, QuadStore, StoreOptions};

fn quad(i: u64) -> quad_model::Quad {
    quad_model::Quad::new(
        Value::iri(format!("http://example.org/s{}", i % 10_000)),
        Value::iri("http://example.org/knows"),
        Value::iri(format!("http://example.org/o{}", i)),
        None,
    )
}

fn benchmark_apply_deltas(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_deltas");

    for size in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let store = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
                let deltas: Vec<Delta> = (0..size as u64).map(|i| Delta::add(quad(i))).collect();
                store.apply_deltas(&deltas).unwrap();
                black_box(store.horizon())
            });
        });
    }

    group.finish();
}

fn benchmark_quad_iterator(c: &mut Criterion) {
    let mut group = c.benchmark_group("quad_iterator");

    let store = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
    let deltas: Vec<Delta> = (0..10_000u64).map(|i| Delta::add(quad(i))).collect();
    store.apply_deltas(&deltas).unwrap();

    group.bench_function("subject_lookup", |b| {
        let subject = Value::iri("http://example.org/s5000");
        let node = store.value_of(&subject).unwrap().unwrap();
        b.iter(|| {
            let pattern = quad_store::indexes::Pattern {
                subject: Some(node.hash()),
                ..Default::default()
            };
            black_box(store.quad_iterator(pattern).unwrap())
        });
    });

    group.finish();
}

fn benchmark_name_of_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("name_of");

    let store = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
    let subject = Value::iri("http://example.org/cached");
    store.apply_deltas(&[Delta::add(quad_model::Quad::new(subject.clone(), Value::iri("http://example.org/p"), Value::iri("http://example.org/o"), None))]).unwrap();
    let node = store.value_of(&subject).unwrap().unwrap();

    group.bench_function("warm_cache", |b| {
        b.iter(|| black_box(store.name_of(node).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, benchmark_apply_deltas, benchmark_quad_iterator, benchmark_name_of_cache);
criterion_main!(benches);
