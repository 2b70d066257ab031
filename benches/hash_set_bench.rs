use chain_hashset::HashSet;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn filled(seed: u64, n: usize) -> (HashSet<String>, Vec<String>) {
    let keys: Vec<String> = lcg(seed).take(n).map(key).collect();
    let set = keys.iter().cloned().collect();
    (set, keys)
}

fn bench_insert_fresh_100k(c: &mut Criterion) {
    c.bench_function("hash_set::insert_fresh_100k", |b| {
        b.iter_batched(
            HashSet::<String>::new,
            |mut s| {
                for x in lcg(1).take(100_000) {
                    s.insert(key(x));
                }
                black_box(s)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_reserved_100k(c: &mut Criterion) {
    c.bench_function("hash_set::insert_reserved_100k", |b| {
        b.iter_batched(
            || {
                let mut s = HashSet::<String>::new();
                s.reserve(100_000);
                s
            },
            |mut s| {
                for x in lcg(1).take(100_000) {
                    s.insert(key(x));
                }
                black_box(s)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find_hit(c: &mut Criterion) {
    let (s, keys) = filled(7, 100_000);
    let mut it = keys.iter().cycle();
    c.bench_function("hash_set::find_hit", |b| {
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(s.contains(k.as_str()));
        })
    });
}

fn bench_find_miss(c: &mut Criterion) {
    let (s, _) = filled(11, 100_000);
    let mut miss = lcg(0xdead_beef).map(key);
    c.bench_function("hash_set::find_miss", |b| {
        b.iter(|| {
            let k = miss.next().unwrap();
            black_box(s.contains(k.as_str()));
        })
    });
}

fn bench_erase_10k(c: &mut Criterion) {
    c.bench_function("hash_set::erase_10k_of_100k", |b| {
        b.iter_batched(
            || filled(13, 100_000),
            |(mut s, keys)| {
                for k in keys.iter().step_by(10) {
                    black_box(s.erase(k.as_str()));
                }
                black_box(s)
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_iterate(c: &mut Criterion) {
    let (s, _) = filled(17, 100_000);
    c.bench_function("hash_set::iterate_100k", |b| {
        b.iter(|| black_box(s.iter().map(String::len).sum::<usize>()))
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert_fresh_100k, bench_insert_reserved_100k, bench_find_hit,
        bench_find_miss, bench_erase_10k, bench_iterate
}
criterion_main!(benches);
