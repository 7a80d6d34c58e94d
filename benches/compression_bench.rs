use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use lzkit::{get_codec, CodecId, CompressionMethod, Level, ZipArchive, ZipWriter};

fn text_corpus(len: usize) -> Vec<u8> {
    let words = [&b"lorem "[..], b"ipsum ", b"dolor ", b"sit ", b"amet, ", b"consectetur\n"];
    words.iter().cycle().flat_map(|w| w.iter().copied()).take(len).collect()
}

fn bench_compression(c: &mut Criterion) {
    let data = text_corpus(1024 * 1024);
    let mut group = c.benchmark_group("compress_1mb_text");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for id in CodecId::ALL {
        let codec = get_codec(id);
        group.bench_function(id.name(), |b| b.iter(|| codec.compress(black_box(&data), Level::DEFAULT)));
    }
    group.finish();
}

fn bench_decompression(c: &mut Criterion) {
    let data = text_corpus(1024 * 1024);
    let mut group = c.benchmark_group("decompress_1mb_text");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for id in CodecId::ALL {
        let codec = get_codec(id);
        let packed = codec.compress(&data, Level::DEFAULT).unwrap();
        group.bench_function(id.name(), |b| b.iter(|| codec.decompress(black_box(&packed))));
    }
    group.finish();
}

fn bench_levels(c: &mut Criterion) {
    let data = text_corpus(256 * 1024);
    let codec = get_codec(CodecId::Deflate);

    for level in [1u32, 6, 9] {
        c.bench_function(&format!("deflate_level_{level}_256kb"), |b| {
            b.iter(|| codec.compress(black_box(&data), Level::new(level)))
        });
    }
}

fn bench_zip(c: &mut Criterion) {
    let data = text_corpus(64 * 1024);

    c.bench_function("zip_write_16x64kb", |b| {
        b.iter(|| {
            let mut w = ZipWriter::new();
            for i in 0..16 {
                w.add_file(&format!("file_{i}.txt"), black_box(&data), CompressionMethod::Deflate).unwrap();
            }
            w.finish(b"").unwrap()
        })
    });

    let mut w = ZipWriter::new();
    for i in 0..16 {
        w.add_file(&format!("file_{i}.txt"), &data, CompressionMethod::Deflate).unwrap();
    }
    let archive_bytes = w.finish(b"").unwrap();

    c.bench_function("zip_open_extract_16x64kb", |b| {
        b.iter(|| {
            let archive = ZipArchive::open(black_box(&archive_bytes)).unwrap();
            for entry in archive.entries() {
                archive.extract(entry, &archive_bytes).unwrap();
            }
        })
    });
}

criterion_group!(benches, bench_compression, bench_decompression, bench_levels, bench_zip);
criterion_main!(benches);
