use std::time::Duration;

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use devaintart::bench_support::QuotaBenchFixture;
use devaintart_gallery::quota::pacific;

const MB: u64 = 1024 * 1024;

fn bench_quota_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("quota_reads");
    group
        .sample_size(500)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(3));

    let fixture = QuotaBenchFixture::with_usage(45 * MB, "artist-bench", 40 * MB);
    group.bench_function(BenchmarkId::new("get_quota_info", "seeded"), |b| {
        b.iter(|| {
            let info = fixture
                .tracker
                .get_quota_info(black_box("artist-bench"))
                .expect("quota info");
            black_box(info)
        })
    });

    group.finish();
}

fn bench_check_and_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("quota_check_and_record");
    group
        .sample_size(200)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(3));

    for size in [1024u64, 500 * 1024] {
        // Large enough that every iteration commits.
        let fixture = QuotaBenchFixture::new(u64::MAX / 2);
        group.bench_with_input(BenchmarkId::new("accepted", size), &size, |b, &size| {
            b.iter(|| {
                fixture
                    .tracker
                    .check_and_record_upload("artist-bench", black_box(size))
                    .expect("recorded")
            })
        });
    }

    let exhausted = QuotaBenchFixture::with_usage(45 * MB, "artist-bench", 45 * MB);
    group.bench_function(BenchmarkId::new("rejected", "exhausted"), |b| {
        b.iter(|| {
            let result = exhausted
                .tracker
                .check_and_record_upload("artist-bench", black_box(MB));
            black_box(result.is_err())
        })
    });

    group.finish();
}

fn bench_pacific_boundary(c: &mut Criterion) {
    let instant = Utc.with_ymd_and_hms(2026, 3, 8, 9, 30, 0).unwrap();
    c.bench_function("pacific_next_reset", |b| {
        b.iter(|| black_box(pacific::next_reset(black_box(instant))))
    });
}

criterion_group!(
    quota_latency,
    bench_quota_reads,
    bench_check_and_record,
    bench_pacific_boundary
);
criterion_main!(quota_latency);
