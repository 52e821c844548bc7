//! Criterion benchmarks over the laboratory catalog.
//!
//! Run with: `cargo bench --bench engine_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use labsql::catalog::lab;
use labsql::{Engine, EngineConfig, ExecuteOptions};

fn lab_engine(samples: usize) -> Engine {
    let engine = Engine::with_config(EngineConfig::default());
    lab::install(engine.catalog(), samples).unwrap();
    engine
}

fn bench_scan_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_filter");
    let options = ExecuteOptions::default();

    for size in [1_000, 10_000].iter() {
        let engine = lab_engine(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                engine
                    .execute(
                        black_box("SELECT id, sample_id, value FROM results WHERE value > 25 AND test_code LIKE 'G%'"),
                        &options,
                    )
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_group_aggregate(c: &mut Criterion) {
    let engine = lab_engine(10_000);
    let options = ExecuteOptions::default();

    c.bench_function("group_aggregate", |b| {
        b.iter(|| {
            engine
                .execute(
                    black_box(
                        "SELECT test_code, COUNT(*), AVG(value), MIN(value), MAX(value) \
                         FROM results GROUP BY test_code HAVING COUNT(value) > 10 ORDER BY test_code",
                    ),
                    &options,
                )
                .unwrap()
        });
    });
}

fn bench_join(c: &mut Criterion) {
    let engine = lab_engine(2_000);
    let options = ExecuteOptions::default();

    c.bench_function("join", |b| {
        b.iter(|| {
            engine
                .execute(
                    black_box(
                        "SELECT s.sample_type, t.name, r.value FROM samples s \
                         JOIN results r ON r.sample_id = s.id \
                         LEFT JOIN tests t ON t.code = r.test_code \
                         WHERE s.sample_type = 'serum' ORDER BY r.value DESC LIMIT 50",
                    ),
                    &options,
                )
                .unwrap()
        });
    });
}

fn bench_completion(c: &mut Criterion) {
    let engine = lab_engine(100);
    let sql = "SELECT s.id, r. FROM samples s JOIN results r ON r.sample_id = s.id WHERE s.";

    c.bench_function("completion_qualifier", |b| {
        b.iter(|| engine.suggest(black_box(sql), black_box(15)));
    });
    c.bench_function("completion_columns", |b| {
        b.iter(|| engine.suggest(black_box(sql), black_box(sql.len())));
    });
}

criterion_group!(benches, bench_scan_filter, bench_group_aggregate, bench_join, bench_completion);
criterion_main!(benches);
