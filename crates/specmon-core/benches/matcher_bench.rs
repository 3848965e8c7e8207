//! Benchmarks for license matching and band analysis
//!
//! Run with: cargo bench -p specmon-core --bench matcher_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use specmon_core::analysis::{OccupancyAnalyzer, ThresholdMode};
use specmon_core::license::{LicenseMatcher, LicenseRecord, RegistrySnapshot};
use specmon_core::sweep::{Band, Channel};

fn registry(size: usize) -> Vec<LicenseRecord> {
    (0..size)
        .map(|i| {
            // Scatter across 87-108 MHz without sorting
            let slot = (i * 7919) % size;
            let freq = 87.0 + 21.0 * slot as f64 / size as f64;
            LicenseRecord::new(format!("LIC{:06}", i), freq)
                .with_status(if i % 3 == 0 { "ACTIVE" } else { "EXPIRED" })
        })
        .collect()
}

fn band(channels: usize) -> Band {
    let step = 21.0 / channels as f64;
    let chans = (0..channels)
        .map(|i| {
            let level = if i % 11 == 0 { 62.0 } else { 24.0 + (i % 5) as f64 };
            Channel::new(i as u32 + 1, 87.0 + i as f64 * step, level, level + 4.0)
        })
        .collect();
    Band::new(1, 87.0, 108.0, None, chans).expect("valid band")
}

// ============================================================================
// Matcher Benchmarks
// ============================================================================

fn bench_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("license_matching");
    let frequencies: Vec<f64> = (0..1000).map(|i| 87.0 + i as f64 * 0.021).collect();
    group.throughput(Throughput::Elements(frequencies.len() as u64));

    for size in [1_000, 10_000, 100_000].iter() {
        let raw = registry(*size);
        let snapshot = RegistrySnapshot::new(raw.clone());

        group.bench_with_input(BenchmarkId::new("sorted_snapshot", size), size, |b, _| {
            let matcher = LicenseMatcher::new(&snapshot, 0.0125);
            b.iter(|| {
                frequencies
                    .iter()
                    .filter(|f| matcher.match_frequency(black_box(**f)).is_some())
                    .count()
            })
        });

        if *size <= 10_000 {
            group.bench_with_input(BenchmarkId::new("linear_scan", size), size, |b, _| {
                let matcher = LicenseMatcher::new(&raw[..], 0.0125);
                b.iter(|| {
                    frequencies
                        .iter()
                        .filter(|f| matcher.match_frequency(black_box(**f)).is_some())
                        .count()
                })
            });
        }
    }

    group.finish();
}

fn bench_snapshot_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_build");
    for size in [10_000, 100_000].iter() {
        let raw = registry(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| RegistrySnapshot::new(black_box(raw.clone())))
        });
    }
    group.finish();
}

// ============================================================================
// Pipeline Benchmarks
// ============================================================================

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("band_analysis");
    let snapshot = RegistrySnapshot::new(registry(20_000));
    let analyzer = OccupancyAnalyzer::default();

    for channels in [420, 4_200].iter() {
        let band = band(*channels);
        group.throughput(Throughput::Elements(*channels as u64));
        group.bench_with_input(BenchmarkId::new("auto_threshold", channels), channels, |b, _| {
            b.iter(|| {
                analyzer
                    .analyze(black_box(&band), ThresholdMode::Auto { margin_db: 10.0 }, &snapshot)
                    .map(|r| r.occupied_channels)
            })
        });
    }

    group.finish();
}

criterion_group!(
    name = matcher_benches;
    config = Criterion::default();
    targets = bench_matching, bench_snapshot_build
);

criterion_group!(
    name = pipeline_benches;
    config = Criterion::default();
    targets = bench_analyze
);

criterion_main!(matcher_benches, pipeline_benches);
