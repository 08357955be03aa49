//! Benchmarks for record parsing and bucketed aggregation
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sensorvis::aggregate::{bucket_width_for, compute_summary, ViewFingerprint};
use sensorvis::histogram::{compute_histogram, HistogramFingerprint};
use sensorvis::parser::{parse_record, ParseOutcome};
use sensorvis::resolve::{TimeMode, TimeResolver};
use sensorvis::types::Sample;

const LINE: &[u8] = b"\"2021-03-07 09:05\",\"17.5000\",\"45.2000\"\n";

fn minute_series(count: usize) -> Vec<Sample> {
    (0..count)
        .map(|i| Sample {
            time: i as i64 * 60,
            temperature: 15.0 + 10.0 * (i as f64 / 720.0).sin(),
        })
        .collect()
}

fn bench_parse_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_record");
    group.throughput(Throughput::Bytes(LINE.len() as u64));
    group.bench_function("single_line", |b| {
        b.iter(|| match parse_record(black_box(LINE)) {
            ParseOutcome::Complete { value, .. } => value,
            _ => unreachable!(),
        })
    });

    let mut chunk = Vec::new();
    for _ in 0..1000 {
        chunk.extend_from_slice(LINE);
    }
    group.throughput(Throughput::Bytes(chunk.len() as u64));
    group.bench_function("thousand_lines", |b| {
        b.iter(|| {
            let mut pos = 0;
            let mut records = 0u32;
            while let ParseOutcome::Complete { consumed, .. } =
                parse_record(black_box(&chunk[pos..]))
            {
                pos += consumed;
                records += 1;
            }
            records
        })
    });
    group.finish();
}

fn bench_compute_summary(c: &mut Criterion) {
    let samples = minute_series(100_000);
    let resolver = TimeResolver::new(TimeMode::Utc, 65);
    let span = (samples.len() as f64 - 1.0) * 60.0;
    let view = ViewFingerprint {
        use_celsius: true,
        window_lo: 0.0,
        window_hi: span,
        pixel_width: 800.0,
        bucket_width: bucket_width_for(span, 800.0, 1.0),
    };

    let mut group = c.benchmark_group("compute_summary");
    group.throughput(Throughput::Elements(samples.len() as u64));
    group.bench_function("100k_samples_full_window", |b| {
        b.iter(|| compute_summary(black_box(&samples), &view, 0, &resolver))
    });

    let narrow = ViewFingerprint {
        window_lo: span * 0.5,
        window_hi: span * 0.5 + 3600.0,
        bucket_width: 60.0,
        ..view
    };
    group.bench_function("100k_samples_narrow_window", |b| {
        b.iter(|| compute_summary(black_box(&samples), &narrow, 0, &resolver))
    });
    group.finish();
}

fn bench_compute_histogram(c: &mut Criterion) {
    let samples = minute_series(100_000);
    let fp = HistogramFingerprint {
        time_range: [i64::MIN, i64::MAX],
        day_offset: 0,
        bins_x: 96,
        bins_y: 32,
    };

    let mut group = c.benchmark_group("compute_histogram");
    group.throughput(Throughput::Elements(samples.len() as u64));
    group.bench_function("100k_samples", |b| {
        b.iter(|| compute_histogram(black_box(&samples), &fp))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_parse_record,
    bench_compute_summary,
    bench_compute_histogram
);
criterion_main!(benches);
