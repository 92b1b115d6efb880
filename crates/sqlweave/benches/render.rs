use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlweave::prelude::*;

/// Builder with `n` columns and `n` equality filters:
/// SELECT [t0].[col0], ... FROM [dbo].[T] AS [t0] WHERE ([t0].[col0]=@p0) AND ...
fn build_select(n: usize) -> SelectBuilder {
    let columns: Vec<String> = (0..n).map(|i| format!("col{i}")).collect();
    select_from("dbo.T")
        .and_then(|qb| qb.select_columns(&columns))
        .and_then(|qb| {
            qb.where_all(|w| {
                for (i, col) in columns.iter().enumerate() {
                    w.eq(col, i as i64);
                }
            })
        })
        .unwrap()
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/select");

    for n in [1, 5, 10, 50, 100] {
        let qb = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &qb, |b, qb| {
            b.iter(|| black_box(qb.render().unwrap()));
        });
    }

    group.finish();
}

fn bench_build_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/build_and_render");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_select(n).render().unwrap()));
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/in_list");

    for n in [5, 20, 100, 500] {
        let values: Vec<i32> = (0..n).collect();
        let parameterized = select_from("dbo.T")
            .and_then(|qb| {
                qb.where_all(|w| {
                    w.in_list("id", values.iter().copied());
                })
            })
            .unwrap();
        let literal = select_from("dbo.T")
            .and_then(|qb| {
                qb.where_all(|w| {
                    w.in_literal_numbers("id", values.iter().copied());
                })
            })
            .unwrap();

        group.bench_with_input(BenchmarkId::new("params", n), &parameterized, |b, qb| {
            b.iter(|| black_box(qb.render().unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("literal", n), &literal, |b, qb| {
            b.iter(|| black_box(qb.render().unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_render, bench_build_and_render, bench_in_list);
criterion_main!(benches);
