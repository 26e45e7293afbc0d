use blocksync_core::{chunk_reader, hash_list};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn bench_chunk_and_hash(c: &mut Criterion) {
    let data: Vec<u8> = (0..4 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();

    let mut group = c.benchmark_group("chunk_and_hash");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for block_size in [4 * 1024, 64 * 1024, 1024 * 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, &block_size| {
                b.iter(|| {
                    let blocks = chunk_reader(&data[..], block_size).unwrap();
                    black_box(hash_list(&blocks))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_chunk_and_hash);
criterion_main!(benches);
