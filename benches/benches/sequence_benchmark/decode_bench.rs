//! Бенчмарки загрузки, распаковки форм и материализации блоков.
//!
//! Запуск: cargo bench --package pulseq-benchmark

use std::{fmt::Write, hint::black_box, io::Cursor, sync::Arc};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pulseq_core::{CompressedShapeExt, ExternalSequence, NullSink, SequenceLoader};
use pulseq_types::CompressedShape;

/// Трапецеидальная огибающая: подъём, плато, спад. Сжимается в 9 значений.
fn trapezoid_shape(len: usize) -> CompressedShape {
    let ramp = len / 4;
    let flat = len - 2 * ramp;
    let step = 1.0 / ramp as f32;

    let packed = vec![
        step,
        step,
        (ramp - 2) as f32,
        0.0,
        0.0,
        (flat - 2) as f32,
        -step,
        -step,
        (ramp - 2) as f32,
    ];
    CompressedShape::new(packed, len)
}

/// Синтетический файл версии 1.2.0 с `num_blocks` блоками.
fn synthetic_sequence(num_blocks: usize) -> String {
    let mut s = String::from("[VERSION]\nmajor 1\nminor 2\nrevision 0\n\n");

    let _ = writeln!(s, "[DEFINITIONS]\nScan_ID 1\nNum_Blocks {num_blocks}\n");

    s.push_str("[BLOCKS]\n");
    for i in 0..num_blocks {
        let line = match i % 3 {
            0 => "0 1 0 0 1 0 0",
            1 => "0 0 2 1 0 1 0",
            _ => "1 0 0 0 0 0 0",
        };
        let _ = writeln!(s, "{} {line}", i + 1);
    }

    s.push_str("\n[RF]\n1 2500 1 0 0 0 0\n");
    s.push_str("\n[GRADIENTS]\n2 0.5 2 0\n");
    s.push_str("\n[TRAP]\n1 20000 100 3000 100 0\n");
    s.push_str("\n[ADC]\n1 256 10000 20 0 0\n");
    s.push_str("\n[DELAYS]\n1 1000\n");

    s.push_str("\n[SHAPES]\n");
    for id in 1..=2 {
        let shape = trapezoid_shape(1000);
        let _ = writeln!(s, "\nshape {id}\nnum_samples {}", shape.num_samples);
        for v in &shape.packed {
            let _ = writeln!(s, "{v}");
        }
    }

    s
}

fn load(text: &str) -> ExternalSequence {
    SequenceLoader::default()
        .with_sink(Arc::new(NullSink))
        .load_reader(Cursor::new(text.as_bytes()))
        .unwrap()
}

fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("shape_decompress");

    for len in [256usize, 4_096, 65_536] {
        let shape = trapezoid_shape(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &shape, |b, shape| {
            b.iter(|| black_box(shape.decompress(1).unwrap()));
        });
    }

    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");

    for n in [100usize, 10_000] {
        let text = synthetic_sequence(n);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &text, |b, text| {
            b.iter(|| black_box(load(text)));
        });
    }

    group.finish();
}

fn bench_materialize(c: &mut Criterion) {
    let seq = load(&synthetic_sequence(3_000));
    let n = seq.num_blocks();

    let mut group = c.benchmark_group("blocks");
    group.throughput(Throughput::Elements(n as u64));

    group.bench_function("materialize_all", |b| {
        b.iter(|| {
            for i in 0..n {
                black_box(seq.materialize(i).unwrap());
            }
        });
    });

    group.bench_function("decode_all", |b| {
        b.iter(|| {
            for i in 0..n {
                black_box(seq.decoded_block(i).unwrap());
            }
        });
    });

    group.bench_function("total_duration", |b| {
        b.iter(|| black_box(seq.total_duration().unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_decompress, bench_load, bench_materialize);
criterion_main!(benches);
