//! Benchmarks for trie operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use facetrie::{Path, PathBuilder, Trie, Wildcard};
use rand::prelude::*;

const USERS: usize = 64;
const DOMAINS: usize = 8;

fn generate_paths(n: usize, rng: &mut StdRng) -> Vec<Path> {
    (0..n)
        .map(|_| {
            let mut b = PathBuilder::new(3);
            b.add(1, format!("user{}", rng.gen_range(0..USERS)).into_bytes());
            b.add(2, format!("dom{}.example", rng.gen_range(0..DOMAINS)).into_bytes());
            if rng.gen_bool(0.5) {
                b.add(3, format!("tag{}", rng.gen_range(0..4)).into_bytes());
            }
            b.build()
        })
        .collect()
}

fn populated(paths: &[Path]) -> Trie {
    let trie = Trie::new();
    for (i, p) in paths.iter().enumerate() {
        trie.insert(p, i as u64);
    }
    trie
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for size in [1_000, 10_000, 100_000] {
        let mut rng = StdRng::seed_from_u64(42);
        let paths = generate_paths(size, &mut rng);
        group.bench_with_input(BenchmarkId::new("random", size), &paths, |b, paths| {
            b.iter(|| {
                let trie = Trie::new();
                for (i, p) in paths.iter().enumerate() {
                    trie.insert(p, i as u64);
                }
                black_box(trie)
            });
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    for size in [1_000, 10_000, 100_000] {
        let mut rng = StdRng::seed_from_u64(7);
        let paths = generate_paths(size, &mut rng);
        let trie = populated(&paths);
        let queries: Vec<&Path> = paths.iter().step_by(7).collect();

        group.bench_with_input(BenchmarkId::new("strict", size), &queries, |b, queries| {
            b.iter(|| {
                let mut hits = 0u64;
                for q in queries {
                    trie.lookup_strict(q, |_| {
                        hits += 1;
                        true
                    });
                }
                black_box(hits)
            });
        });

        group.bench_with_input(BenchmarkId::new("greedy", size), &queries, |b, queries| {
            b.iter(|| {
                let mut hits = 0u64;
                for q in queries {
                    trie.lookup_greedy(q, |_| {
                        hits += 1;
                        true
                    });
                }
                black_box(hits)
            });
        });
    }
    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let paths = generate_paths(10_000, &mut rng);
    let trie = populated(&paths);
    let wildcard = Wildcard::new([1]);
    let query = Path::from_pairs([(2u32, &b"dom3.example"[..])]);

    c.bench_function("select_greedy/capture_user", |b| {
        b.iter(|| {
            let mut hits = 0u64;
            trie.select_greedy(&query, &wildcard, |wc, _| {
                hits += wc.get(1).map(|v| v.len() as u64).unwrap_or(0);
                true
            });
            black_box(hits)
        });
    });
}

fn bench_path_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_from_pairs");
    for size in [2usize, 8, 32] {
        let mut rng = StdRng::seed_from_u64(3);
        let mut keys: Vec<u32> = (0..size as u32).collect();
        keys.shuffle(&mut rng);
        let pairs: Vec<(u32, Vec<u8>)> = keys
            .into_iter()
            .map(|k| (k, format!("value{k}").into_bytes()))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &pairs, |b, pairs| {
            b.iter(|| black_box(Path::from_pairs(pairs.iter().cloned())));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_lookup,
    bench_select,
    bench_path_build
);
criterion_main!(benches);
