use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use geopulse::{points_near, Dataset, PointIndex, PointSource, Statistics, SyntheticSource};

fn sample_dataset() -> Dataset {
    let date = NaiveDate::from_ymd_opt(2024, 7, 1).expect("valid date");
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let raw = runtime
        .block_on(SyntheticSource::new().fetch_points(date))
        .expect("synthetic fetch");
    Dataset::from_raw(date, raw)
}

fn bench_geopulse(c: &mut Criterion) {
    let dataset = sample_dataset();

    c.bench_function("aggregate", |b| {
        b.iter(|| Statistics::aggregate(black_box(&dataset.points)))
    });

    c.bench_function("points_near", |b| {
        b.iter(|| points_near(black_box(&dataset), -12.9, -38.5, 500.0))
    });

    let index = PointIndex::build(&dataset);
    c.bench_function("nearest", |b| {
        b.iter(|| index.nearest(black_box(-12.9), black_box(-38.5), 5, 5000.0))
    });
}

criterion_group!(benches, bench_geopulse);
criterion_main!(benches);
