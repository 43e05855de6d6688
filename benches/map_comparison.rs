use std::hint::black_box;

use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use probe_hash::ProbeMap;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Distribution;
use rand_distr::Zipf;

const TABLE_SIZE: usize = 1 << 16;
const OPS: usize = 10_000;

fn keys(count: usize) -> Vec<Vec<u8>> {
    (0..count).map(|i| format!("key{i:08}").into_bytes()).collect()
}

fn populated_probe(keys: &[Vec<u8>]) -> ProbeMap<u64> {
    let mut map = ProbeMap::new(keys.len());
    for (i, key) in keys.iter().enumerate() {
        map.insert(key, i as u64).unwrap();
    }
    map
}

fn populated_hashbrown(keys: &[Vec<u8>]) -> hashbrown::HashMap<Vec<u8>, u64> {
    let mut map = hashbrown::HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        map.insert(key.clone(), i as u64);
    }
    map
}

fn bench_insert(c: &mut Criterion) {
    let keys = keys(TABLE_SIZE);

    let mut group = c.benchmark_group("insert_grow_from_empty");
    group.bench_function("probe_hash", |b| {
        b.iter(|| {
            let mut map = ProbeMap::new(16);
            for (i, key) in keys.iter().enumerate() {
                map.insert(black_box(key), i as u64).unwrap();
            }
            black_box(map.len())
        });
    });
    group.bench_function("hashbrown", |b| {
        b.iter(|| {
            let mut map = hashbrown::HashMap::new();
            for (i, key) in keys.iter().enumerate() {
                map.insert(black_box(key.clone()), i as u64);
            }
            black_box(map.len())
        });
    });
    group.finish();
}

fn bench_lookup_uniform(c: &mut Criterion) {
    let keys = keys(TABLE_SIZE);
    let probe = populated_probe(&keys);
    let brown = populated_hashbrown(&keys);

    let mut rng = SmallRng::from_os_rng();
    let lookups: Vec<&Vec<u8>> = (0..OPS)
        .map(|_| &keys[rng.random_range(0..keys.len())])
        .collect();

    let mut group = c.benchmark_group("lookup_uniform");
    group.bench_function("probe_hash", |b| {
        b.iter(|| {
            let mut hits = 0u64;
            for key in &lookups {
                if probe.get(black_box(key)).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        });
    });
    group.bench_function("hashbrown", |b| {
        b.iter(|| {
            let mut hits = 0u64;
            for key in &lookups {
                if brown.get(black_box(key.as_slice())).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        });
    });
    group.finish();
}

fn bench_lookup_zipf(c: &mut Criterion) {
    let keys = keys(TABLE_SIZE);
    let probe = populated_probe(&keys);
    let brown = populated_hashbrown(&keys);

    let mut rng = SmallRng::from_os_rng();
    let zipf = Zipf::new(TABLE_SIZE as f32, 1.0).unwrap();
    let lookups: Vec<&Vec<u8>> = (0..OPS)
        .map(|_| &keys[zipf.sample(&mut rng) as usize - 1])
        .collect();

    let mut group = c.benchmark_group("lookup_zipf");
    group.bench_function("probe_hash", |b| {
        b.iter(|| {
            let mut hits = 0u64;
            for key in &lookups {
                if probe.get(black_box(key)).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        });
    });
    group.bench_function("hashbrown", |b| {
        b.iter(|| {
            let mut hits = 0u64;
            for key in &lookups {
                if brown.get(black_box(key.as_slice())).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        });
    });
    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let keys = keys(TABLE_SIZE);
    let mut rng = SmallRng::from_os_rng();
    let mut order: Vec<usize> = (0..TABLE_SIZE).collect();
    order.shuffle(&mut rng);

    let mut group = c.benchmark_group("remove_then_reinsert");
    group.bench_function("probe_hash", |b| {
        b.iter_batched(
            || populated_probe(&keys),
            |mut map| {
                for &i in order.iter().take(OPS) {
                    map.remove(black_box(&keys[i]));
                    map.insert(black_box(&keys[i]), i as u64).unwrap();
                }
                black_box(map.len())
            },
            criterion::BatchSize::LargeInput,
        );
    });
    group.bench_function("hashbrown", |b| {
        b.iter_batched(
            || populated_hashbrown(&keys),
            |mut map| {
                for &i in order.iter().take(OPS) {
                    map.remove(black_box(keys[i].as_slice()));
                    map.insert(black_box(keys[i].clone()), i as u64);
                }
                black_box(map.len())
            },
            criterion::BatchSize::LargeInput,
        );
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_lookup_uniform,
    bench_lookup_zipf,
    bench_churn
);
criterion_main!(benches);
