//! Benchmarks for the header codec and digest tables

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use firmseal_header::prelude::*;
use std::hint::black_box;

fn bench_codec(c: &mut Criterion) {
    let mut header = FirmwareHeader::new(FirmwareVersion::new(1, 0, 0, 0));
    header.timestamp = 1_700_000_000;
    header.firmware_size = 65536;
    header.signature_size = 256;
    let packed = header.pack();

    c.bench_function("header_pack", |b| b.iter(|| black_box(&header).pack()));
    c.bench_function("header_unpack", |b| {
        b.iter(|| FirmwareHeader::unpack(black_box(&packed)))
    });
}

fn bench_digests(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest");

    for size in [1024usize, 65536, 1 << 20] {
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        group.throughput(Throughput::Bytes(size as u64));
        for alg in [HashAlgorithm::Sha256, HashAlgorithm::Sha512] {
            group.bench_with_input(BenchmarkId::new(alg.name(), size), &data, |b, data| {
                b.iter(|| alg.digest(data));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_codec, bench_digests);
criterion_main!(benches);
