use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use incr_hashmap::IncrHashMap;
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

fn bench_insert(c: &mut Criterion) {
    c.bench_function("incr_hashmap_insert_10k", |b| {
        b.iter_batched(
            IncrHashMap::<String, u64>::new,
            |mut m| {
                for (i, x) in lcg(1).take(10_000).enumerate() {
                    m.insert(key(x), i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_prereserved(c: &mut Criterion) {
    c.bench_function("incr_hashmap_insert_10k_reserved", |b| {
        b.iter_batched(
            || {
                let mut m = IncrHashMap::<String, u64>::new();
                m.reserve(10_000);
                m
            },
            |mut m| {
                for (i, x) in lcg(1).take(10_000).enumerate() {
                    m.insert(key(x), i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("incr_hashmap_get_hit", |b| {
        let mut m = IncrHashMap::new();
        let keys: Vec<_> = lcg(7).take(20_000).map(key).collect();
        for (i, k) in keys.iter().cloned().enumerate() {
            m.insert(k, i as u64).unwrap();
        }
        while m.is_rehashing() {
            m.rehash_step(10);
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(m.peek(k.as_str()));
        })
    });
}

fn bench_get_hit_mid_rehash(c: &mut Criterion) {
    c.bench_function("incr_hashmap_get_hit_mid_rehash", |b| {
        let mut m = IncrHashMap::new();
        let keys: Vec<_> = lcg(7).take(20_000).map(key).collect();
        for (i, k) in keys.iter().cloned().enumerate() {
            m.insert(k, i as u64).unwrap();
        }
        while m.is_rehashing() {
            m.rehash_step(10);
        }
        let cap = m.capacity();
        m.reserve(cap * 2);
        // Pause so the probe cost is measured with both generations
        // live, not the cost of advancing the rehash.
        m.pause_rehash();
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(m.peek(k.as_str()));
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("incr_hashmap_get_miss", |b| {
        let mut m = IncrHashMap::new();
        for (i, x) in lcg(11).take(10_000).enumerate() {
            m.insert(key(x), i as u64).unwrap();
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            let k = key(miss.next().unwrap());
            black_box(m.peek(k.as_str()));
        })
    });
}

fn bench_rehash_step(c: &mut Criterion) {
    c.bench_function("incr_hashmap_full_rehash_64k", |b| {
        b.iter_batched(
            || {
                let mut m = IncrHashMap::<u64, u64>::new();
                for x in lcg(13).take(65_536) {
                    let _ = m.insert(x, x);
                }
                while m.is_rehashing() {
                    m.rehash_step(10);
                }
                let cap = m.capacity();
                m.reserve(cap * 2);
                m
            },
            |mut m| {
                while m.is_rehashing() {
                    m.rehash_step(10);
                }
                black_box(m)
            },
            BatchSize::LargeInput,
        )
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
    targets = bench_insert, bench_insert_prereserved, bench_get_hit,
        bench_get_hit_mid_rehash, bench_get_miss, bench_rehash_step
}
criterion_main!(benches);
