use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quorum_types::Seed;

fn sortition_index_bench(c: &mut Criterion) {
    let seed = Seed::new([42u8; 32]);

    c.bench_function("sortition_index_1k_validators", |b| {
        b.iter(|| quorum_crypto::sortition_index(black_box(&seed), 1_000, 1, 7, 1_000))
    });
}

fn committee_draws_bench(c: &mut Criterion) {
    let seed = Seed::new([7u8; 32]);

    c.bench_function("sortition_300_draws", |b| {
        b.iter(|| {
            (0..300u32)
                .filter_map(|i| quorum_crypto::sortition_index(&seed, 12, 2, black_box(i), 5_000))
                .sum::<usize>()
        })
    });
}

fn blake2b_256_bench(c: &mut Criterion) {
    let data = [0xABu8; 256];

    c.bench_function("blake2b_256_256B", |b| {
        b.iter(|| quorum_crypto::blake2b_256(black_box(&data)))
    });
}

criterion_group!(
    benches,
    sortition_index_bench,
    committee_draws_bench,
    blake2b_256_bench
);
criterion_main!(benches);
