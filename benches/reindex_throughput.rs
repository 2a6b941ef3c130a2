use std::io::Cursor;

use c10_index::{reindex, CopyMode};
use c10_limits::IndexLimits;
use c10_packet::{encode_packet, PacketFields, ReaderOptions};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn sample_stream() -> Vec<u8> {
    let mut stream = Vec::new();
    for index in 0..8_000_u64 {
        let data_type = if index % 50 == 49 { 0x11 } else { 0x19 };
        let fields = PacketFields {
            channel_id: 1 + (index % 20) as u16,
            data_type,
            rtc: index * 1_000,
            ..PacketFields::default()
        };
        stream.extend(encode_packet(&fields, &[0xA5; 100]).expect("encode"));
    }
    stream
}

fn bench_reindex(criterion: &mut Criterion) {
    let source = sample_stream();
    let mut group = criterion.benchmark_group("reindex");
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("rebuild", |bench| {
        bench.iter(|| {
            let (output, _) = reindex(
                Cursor::new(black_box(&source)),
                Vec::with_capacity(source.len() + 64 * 1024),
                CopyMode::Rebuild,
                ReaderOptions::default(),
                IndexLimits::default(),
            )
            .expect("rebuild");
            black_box(output);
        });
    });

    group.bench_function("strip_only", |bench| {
        bench.iter(|| {
            let (output, _) = reindex(
                Cursor::new(black_box(&source)),
                Vec::with_capacity(source.len()),
                CopyMode::StripOnly,
                ReaderOptions::default(),
                IndexLimits::default(),
            )
            .expect("strip");
            black_box(output);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_reindex);
criterion_main!(benches);
