//! Command derivation and binding benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rowsync_bench::{added_rows, columns};
use rowsync_core::{CommandBuilder, SqlServerDialect, SqliteDialect, TableSchema};

/// Benchmark deriving all four commands.
fn bench_derive(c: &mut Criterion) {
    let schema = TableSchema::new("Employee", columns()).unwrap();

    c.bench_function("derive_sqlite", |b| {
        b.iter(|| black_box(CommandBuilder::new(&schema, &SqliteDialect).derive_all().unwrap()));
    });
    c.bench_function("derive_sqlserver", |b| {
        b.iter(|| {
            black_box(CommandBuilder::new(&schema, &SqlServerDialect).derive_all().unwrap())
        });
    });
}

/// Benchmark building and accepting a snapshot.
fn bench_snapshot(c: &mut Criterion) {
    c.bench_function("snapshot_add_accept_1000", |b| {
        b.iter(|| {
            let mut snapshot = added_rows("s", 1000);
            snapshot.accept_changes();
            black_box(snapshot.len())
        });
    });
}

criterion_group!(benches, bench_derive, bench_snapshot);
criterion_main!(benches);
