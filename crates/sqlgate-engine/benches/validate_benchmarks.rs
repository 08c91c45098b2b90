//! Benchmarks for end-to-end validation
//!
//! Measures parse, extraction, and rule evaluation together, for flat
//! statements and for statements with deeply nested subqueries.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sqlgate_core::Policy;
use sqlgate_engine::Validator;

/// SELECT wrapped in `depth` derived tables
fn generate_nested_select(depth: usize) -> String {
    let mut sql = "SELECT id, name FROM app_tab WHERE id > 10 LIMIT 10".to_string();
    for i in 0..depth {
        sql = format!("SELECT * FROM ({}) AS t{} LIMIT 10", sql, i);
    }
    sql
}

/// UPDATE whose WHERE chains `count` IN-subqueries
fn generate_update_with_subqueries(count: usize) -> String {
    let conditions: Vec<String> = (0..count)
        .map(|i| format!("k{i} IN (SELECT k{i} FROM log_{i} WHERE id > {i} LIMIT 5)"))
        .collect();
    format!("UPDATE log SET k1 = 2 WHERE {}", conditions.join(" AND "))
}

fn bench_simple_statements(c: &mut Criterion) {
    let read = Validator::new(Policy::read());
    let write = Validator::new(Policy::write());

    c.bench_function("validate_simple_select", |b| {
        b.iter(|| read.validate(black_box("SELECT * FROM app_tab LIMIT 10")));
    });

    c.bench_function("validate_rejected_select", |b| {
        b.iter(|| read.validate(black_box("SELECT * FROM app_tab ORDER BY name")));
    });

    c.bench_function("validate_update", |b| {
        b.iter(|| write.validate(black_box("UPDATE log SET k1 = 1 WHERE id = 1")));
    });
}

fn bench_nested_selects(c: &mut Criterion) {
    let validator = Validator::new(Policy::read());
    let mut group = c.benchmark_group("nested_selects");

    for depth in [1, 8, 32] {
        let sql = generate_nested_select(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &sql, |b, sql| {
            b.iter(|| validator.validate(black_box(sql)));
        });
    }

    group.finish();
}

fn bench_update_subqueries(c: &mut Criterion) {
    let validator = Validator::new(Policy::write());
    let mut group = c.benchmark_group("update_subqueries");

    for count in [1, 10, 50] {
        let sql = generate_update_with_subqueries(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &sql, |b, sql| {
            b.iter(|| validator.validate(black_box(sql)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_simple_statements,
    bench_nested_selects,
    bench_update_subqueries
);

criterion_main!(benches);
