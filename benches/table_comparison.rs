use core::hint::black_box;

use criterion::BatchSize;
use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use oa_hash::Config;
use oa_hash::HashTable;
use oa_hash::hashers;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

const SIZES: &[usize] = &[(1 << 10), (1 << 12), (1 << 14), (1 << 16)];

fn make_keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("key_{i:016X}")).collect()
}

fn new_table(initial_size: usize) -> HashTable<u64> {
    HashTable::new(Config {
        initial_size,
        secondary_hash: Some(hashers::secondary),
        ..Config::new(hashers::primary)
    })
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for &size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        let keys = make_keys(size);

        group.bench_function(format!("oa_hash/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut table = new_table(11);
                    for key in &keys {
                        table.insert(key, black_box(1u64)).unwrap();
                    }
                    table
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut map = hashbrown::HashMap::new();
                    for key in keys {
                        map.insert(key, black_box(1u64));
                    }
                    map
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("find");
    for &size in SIZES {
        group.throughput(Throughput::Elements(size as u64));

        let mut lookup = make_keys(size);
        let mut rng = SmallRng::seed_from_u64(0xBE7C_A5E5);
        lookup.shuffle(&mut rng);

        let mut table = new_table(size);
        let mut map = hashbrown::HashMap::new();
        for (i, key) in make_keys(size).into_iter().enumerate() {
            table.insert(&key, i as u64).unwrap();
            map.insert(key, i as u64);
        }

        group.bench_function(format!("oa_hash/{size}"), |b| {
            b.iter(|| {
                let mut hits = 0u64;
                for key in &lookup {
                    if table.find(key).is_ok() {
                        hits += 1;
                    }
                }
                black_box(hits)
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                let mut hits = 0u64;
                for key in &lookup {
                    if map.contains_key(key) {
                        hits += 1;
                    }
                }
                black_box(hits)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_find);
criterion_main!(benches);
