//! Benchmarks for veilfs-crypto's block seal/open path — the hot loop of
//! the upload/download pipeline (C5) runs through this every 64 KiB block.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use veilfs_crypto::hashing::keccak256;
use veilfs_crypto::symmetric::{open, seal, KEY_SIZE};

fn sample_key() -> [u8; KEY_SIZE] {
    [0x11u8; KEY_SIZE]
}

fn bench_seal_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("symmetric");
    let key = sample_key();

    for size in [1024, 64 * 1024, 1024 * 1024].iter() {
        let data = vec![0u8; *size];
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("seal", size), &data, |b, data| {
            b.iter(|| seal(data, &key).unwrap())
        });

        let sealed = seal(&data, &key).unwrap();
        group.bench_with_input(BenchmarkId::new("open", size), &sealed, |b, sealed| {
            b.iter(|| open(sealed, &key).unwrap())
        });
    }

    group.finish();
}

fn bench_keccak(c: &mut Criterion) {
    let mut group = c.benchmark_group("hashing");

    for size in [64, 1024, 64 * 1024].iter() {
        let data = vec![0u8; *size];
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("keccak256", size), &data, |b, data| {
            b.iter(|| keccak256(data))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_seal_open, bench_keccak);
criterion_main!(benches);
