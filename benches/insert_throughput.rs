// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Insert throughput benchmark.
//!
//! Measures bulk `insert` cost for `StaticMap` and `StaticMultiMap` at
//! varying load factors, with the packed (32-bit) and split (64-bit)
//! layouts both represented.

#![allow(clippy::cast_precision_loss)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use static_map::{StaticMap, StaticMultiMap, Stream};
use std::hint::black_box as bb;

fn bench_map_insert_packed(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_insert_packed_i32");
    for load_factor in [10u64, 50, 90] {
        group.bench_with_input(
            BenchmarkId::from_parameter(load_factor),
            &load_factor,
            |b, &load_factor| {
                let capacity = 1_000_000usize;
                let count = (capacity as u64 * load_factor / 100) as i32;
                let items: Vec<(i32, i32)> = (0..count).map(|i| (i, i)).collect();
                b.iter_batched(
                    || Stream::new(),
                    |stream| {
                        let map: StaticMap<i32, i32> = StaticMap::new(capacity, -1, -1, &stream);
                        map.insert(bb(&items), &stream);
                        bb(map.get_size());
                    },
                    criterion::BatchSize::LargeInput,
                );
            },
        );
    }
    group.finish();
}

fn bench_map_insert_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_insert_split_i64");
    let capacity = 500_000usize;
    let items: Vec<(i64, i64)> = (0..250_000i64).map(|i| (i, i)).collect();
    group.bench_function("half_load", |b| {
        b.iter_batched(
            Stream::new,
            |stream| {
                let map: StaticMap<i64, i64> = StaticMap::new(capacity, -1, -1, &stream);
                map.insert(bb(&items), &stream);
                bb(map.get_size());
            },
            criterion::BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn bench_multimap_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("multimap_insert_duplicates");
    let capacity = 1_000_000usize;
    let items: Vec<(i32, i32)> = (0..500_000i32).map(|i| (i % 1000, i)).collect();
    group.bench_function("hot_key_duplicates", |b| {
        b.iter_batched(
            Stream::new,
            |stream| {
                let map: StaticMultiMap<i32, i32> = StaticMultiMap::new(capacity, -1, -1, &stream);
                map.insert(bb(&items), &stream);
                bb(map.get_size());
            },
            criterion::BatchSize::LargeInput,
        );
    });
    group.finish();
}

criterion_group!(
    insert_benches,
    bench_map_insert_packed,
    bench_map_insert_split,
    bench_multimap_insert
);
criterion_main!(insert_benches);
