//! Benchmarks for ripple-reactive module.
//!
//! Target: refresh of a 1000 item keyed collection after one push < 500μs

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ripple_reactive::{Collection, CollectionBuilder, Observable, Value};

fn make_items(n: i64) -> Vec<Value> {
    (0..n)
        .map(|id| Value::object([("id", Value::Int(id)), ("score", Value::Int(id % 97))]))
        .collect()
}

fn bench_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_refresh");

    for size in [10, 100, 1000] {
        // Keyed filter + map, cached
        group.bench_with_input(BenchmarkId::new("keyed_cached", size), &size, |b, &size| {
            let source = Observable::new(make_items(size));
            let collection = Collection::keyed(&source, "id")
                .filter(|v, _| v.field("score").as_i64().is_some_and(|s| s > 10))
                .map(|v, _| v.field("score"));
            b.iter(|| {
                collection.refresh();
            })
        });

        // Same chain without the per-item cache
        group.bench_with_input(BenchmarkId::new("keyed_uncached", size), &size, |b, &size| {
            let source = Observable::new(make_items(size));
            let collection = CollectionBuilder::new(&source)
                .key("id")
                .cache(false)
                .build()
                .filter(|v, _| v.field("score").as_i64().is_some_and(|s| s > 10))
                .map(|v, _| v.field("score"));
            b.iter(|| {
                collection.refresh();
            })
        });

        // Unkeyed replace
        group.bench_with_input(BenchmarkId::new("unkeyed", size), &size, |b, &size| {
            let source = Observable::new(make_items(size));
            let collection = Collection::new(&source).pluck("score");
            b.iter(|| {
                collection.refresh();
            })
        });
    }

    group.finish();
}

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_push");

    for size in [100, 1000] {
        group.bench_with_input(BenchmarkId::new("push_then_pop", size), &size, |b, &size| {
            let source = Observable::new(make_items(size));
            let collection = Collection::keyed(&source, "id").map(|v, _| v.field("score"));
            b.iter(|| {
                source.push(Value::object([("id", Value::Int(-1)), ("score", Value::Int(0))]));
                source.remove_at(size as usize);
                collection.len()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_refresh, bench_push);
criterion_main!(benches);
