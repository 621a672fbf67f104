//! Request signing benchmarks
//!
//! Every upstream call computes a timestamp and its HMAC, so both sit on the
//! hot path of the request scheduler.
//!
//! Run with: `cargo bench --bench signing_bench -p storefront-common
//! --features foundation`

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use storefront_common::crypto::hmac_sha256_base64;
use storefront_common::time::{parse_timezone, request_timestamp};

fn bench_timestamp(c: &mut Criterion) {
    let tz = match parse_timezone("Asia/Jakarta") {
        Ok(tz) => tz,
        Err(err) => panic!("benchmark timezone must parse: {err}"),
    };
    let instant = Utc.with_ymd_and_hms(2024, 1, 15, 3, 4, 5).single();

    c.bench_function("request_timestamp", |b| {
        b.iter(|| {
            if let Some(instant) = instant {
                black_box(request_timestamp(black_box(instant), tz));
            }
        });
    });
}

fn bench_signature(c: &mut Criterion) {
    let mut group = c.benchmark_group("hmac_sha256_base64");

    for key_len in [16usize, 64, 256] {
        let key = vec![b'k'; key_len];
        group.bench_with_input(BenchmarkId::from_parameter(key_len), &key, |b, key| {
            b.iter(|| {
                let signature = hmac_sha256_base64(black_box(key), black_box("15/01/2024 10:04:05"));
                black_box(signature.ok());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_timestamp, bench_signature);
criterion_main!(benches);
