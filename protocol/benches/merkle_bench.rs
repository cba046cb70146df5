// Merkle hash builder benchmarks.
//
// Covers root computation at typical block transaction counts and the
// full-tree variant used by merkle proof serving.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use meridian_protocol::crypto::{sha3_256, MerkleHashBuilder};
use meridian_protocol::model::types::Hash256;

fn leaves(count: usize) -> Vec<Hash256> {
    (0..count)
        .map(|index| sha3_256(&(index as u64).to_le_bytes()))
        .collect()
}

fn bench_merkle_root(c: &mut Criterion) {
    let mut group = c.benchmark_group("merkle/root");
    for count in [10usize, 100, 1_000, 10_000] {
        let hashes = leaves(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &hashes, |b, hashes| {
            b.iter(|| {
                let mut builder = MerkleHashBuilder::with_capacity(hashes.len());
                for hash in hashes {
                    builder.update(*hash);
                }
                builder.finalize()
            });
        });
    }
    group.finish();
}

fn bench_merkle_tree(c: &mut Criterion) {
    let hashes = leaves(1_000);

    c.bench_function("merkle/full_tree_1000", |b| {
        b.iter(|| {
            let mut builder = MerkleHashBuilder::with_capacity(hashes.len());
            for hash in &hashes {
                builder.update(*hash);
            }
            builder.finalize_tree()
        });
    });
}

fn bench_sha3_leaf(c: &mut Criterion) {
    let data = vec![0xA5u8; 256];

    c.bench_function("sha3/hash_256_bytes", |b| {
        b.iter(|| sha3_256(&data));
    });
}

criterion_group!(benches, bench_merkle_root, bench_merkle_tree, bench_sha3_leaf);
criterion_main!(benches);
