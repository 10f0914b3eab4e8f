//! Benchmarks for loading, row-mapping composition and view reads.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

use datatable_core::{LoadOptions, RowMapping, Slice, Value};

const SMALL_ROWS: usize = 4 * 1024;
const MEDIUM_ROWS: usize = 256 * 1024;
const LARGE_ROWS: usize = 4 * 1024 * 1024;

fn setup_column(path: &Path, nrows: usize) -> std::io::Result<()> {
    let mut file = File::create(path)?;

    // Write data in chunks to avoid excessive memory usage
    let chunk_rows = 8 * 1024;
    let mut row = 0;
    while row < nrows {
        let end = (row + chunk_rows).min(nrows);
        let buffer = (row..end)
            .flat_map(|i| ((i * 31) as i64).to_ne_bytes())
            .collect::<Vec<u8>>();
        file.write_all(&buffer)?;
        row = end;
    }

    file.sync_all()
}

fn setup_table(dir: &Path, ncols: usize, nrows: usize) -> Vec<PathBuf> {
    (0..ncols)
        .map(|col| {
            let path = dir.join(format!("c{col}.int64"));
            setup_column(&path, nrows).unwrap();
            path
        })
        .collect()
}

fn bench_load(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let mut group = c.benchmark_group("Load (8 columns)");

    for &nrows in &[SMALL_ROWS, MEDIUM_ROWS, LARGE_ROWS] {
        let table_dir = dir.path().join(format!("{nrows}"));
        std::fs::create_dir_all(&table_dir).unwrap();
        let paths = setup_table(&table_dir, 8, nrows);

        group.bench_with_input(BenchmarkId::new("serial", nrows), &paths, |b, paths| {
            let options = LoadOptions::new().parallel(false);
            b.iter(|| black_box(options.load(paths).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("parallel", nrows), &paths, |b, paths| {
            let options = LoadOptions::new();
            b.iter(|| black_box(options.load(paths).unwrap()));
        });
    }

    group.finish();
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("Compose RowMapping");
    let nrows = MEDIUM_ROWS;

    let outer_slice = RowMapping::from_slice(1, nrows / 2, 2, nrows).unwrap();
    let outer_slicelist = RowMapping::from_slicelist(
        (0..nrows / 64).map(|k| Slice::new(k * 64, 32, 1)).collect(),
        nrows,
    )
    .unwrap();
    let outer_array = RowMapping::from_array((0..nrows).rev().step_by(2).collect(), nrows).unwrap();

    for (name, outer) in [
        ("slice", &outer_slice),
        ("slicelist", &outer_slicelist),
        ("array", &outer_array),
    ] {
        let half = outer.len();
        let inner_slice = RowMapping::from_slice(0, half / 3, 3, half).unwrap();
        let inner_array = RowMapping::from_array((0..half).step_by(3).collect(), half).unwrap();

        group.bench_function(BenchmarkId::new(name, "slice"), |b| {
            b.iter(|| black_box(RowMapping::compose(outer, &inner_slice).unwrap()));
        });
        group.bench_function(BenchmarkId::new(name, "array"), |b| {
            b.iter(|| black_box(RowMapping::compose(outer, &inner_array).unwrap()));
        });
    }

    group.finish();
}

fn bench_view_reads(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let mut group = c.benchmark_group("Read through view");
    let nrows = MEDIUM_ROWS;

    let paths = setup_table(dir.path(), 1, nrows);
    let table = Arc::new(LoadOptions::new().load(&paths).unwrap());

    let views = [
        ("identity", RowMapping::from_slice(0, nrows, 1, nrows).unwrap()),
        ("slice", RowMapping::from_slice(0, nrows / 2, 2, nrows).unwrap()),
        (
            "array",
            RowMapping::from_array((0..nrows).rev().step_by(2).collect(), nrows).unwrap(),
        ),
    ];

    for (name, rowmapping) in views {
        let view = table.select_rows(rowmapping).unwrap();

        group.bench_function(name, |b| {
            b.iter(|| {
                let mut sum = 0i64;
                for row in 0..view.nrows() {
                    if let Ok(Value::Int(v)) = view.value(row, 0) {
                        sum = sum.wrapping_add(v);
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_load, bench_compose, bench_view_reads);
criterion_main!(benches);
