#[macro_use]
extern crate criterion;

extern crate rand_chacha;
extern crate warren;

use criterion::{black_box, Bencher, Criterion};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use warren::Warren;

fn string_keys(n: usize) -> Vec<Vec<u8>> {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    (0..n)
        .map(|_| {
            let len = 4 + (rng.next_u64() % 12) as usize;
            (0..len)
                .map(|_| b'a' + (rng.next_u64() % 26) as u8)
                .collect()
        })
        .collect()
}

fn integer_keys(n: usize) -> Vec<Vec<u8>> {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    (0..n)
        .map(|_| {
            let mut key = rng.next_u64().to_be_bytes().to_vec();
            key.extend_from_slice(&rng.next_u64().to_be_bytes());
            key
        })
        .collect()
}

fn bench_insert_strings(b: &mut Bencher) {
    let keys = string_keys(10_000);
    b.iter(|| {
        let mut map = Warren::open(24, 0);
        for (i, key) in keys.iter().enumerate() {
            let cell = map.cell(key).unwrap();
            map.set(cell, i as u64 + 1);
        }
        black_box(&map);
    });
}

fn bench_lookup_strings(b: &mut Bencher) {
    let keys = string_keys(10_000);
    let mut map = Warren::open(24, 0);
    for (i, key) in keys.iter().enumerate() {
        let cell = map.cell(key).unwrap();
        map.set(cell, i as u64 + 1);
    }
    let mut probe = keys.iter().cycle();
    b.iter(|| {
        let cell = map.slot(probe.next().unwrap()).unwrap();
        black_box(map.get(cell));
    });
}

fn bench_lookup_integers(b: &mut Bencher) {
    let keys = integer_keys(10_000);
    let mut map = Warren::open(0, 2);
    for (i, key) in keys.iter().enumerate() {
        let cell = map.cell(key).unwrap();
        map.set(cell, i as u64 + 1);
    }
    let mut probe = keys.iter().cycle();
    b.iter(|| {
        let cell = map.slot(probe.next().unwrap()).unwrap();
        black_box(map.get(cell));
    });
}

fn bench_iterate_strings(b: &mut Bencher) {
    let keys = string_keys(10_000);
    let mut map = Warren::open(24, 0);
    for (i, key) in keys.iter().enumerate() {
        let cell = map.cell(key).unwrap();
        map.set(cell, i as u64 + 1);
    }
    b.iter(|| {
        let mut n = 0_u64;
        let mut cur = map.first();
        while let Some(cell) = cur {
            n = n.wrapping_add(map.get(cell));
            cur = map.nxt();
        }
        black_box(n);
    });
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("insert_strings", bench_insert_strings);
    c.bench_function("lookup_strings", bench_lookup_strings);
    c.bench_function("lookup_integers", bench_lookup_integers);
    c.bench_function("iterate_strings", bench_iterate_strings);
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        // Do not use p = 0.05, we are not doing social studies here. I want to
        // actually be sure, and not be wrong 1 in 20 times, because I will run
        // the benchmark more than 20 times for sure.
        .significance_level(0.001)
        .confidence_level(0.99);
    targets = criterion_benchmark
}

criterion_main!(benches);
