use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use datatable_core::{
    load_mapped, Advice, ColMapping, Error, LoadOptions, MemoryKind, RowMapping, StorageType, Value,
};
use tempfile::TempDir;
use test_log::test;

fn write_column(dir: &TempDir, file_name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(file_name);
    fs::write(&path, bytes).unwrap();
    path
}

fn int64_bytes(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn f64_bytes(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

/// Number of mappings of files under `dir` held by this process.
#[cfg(target_os = "linux")]
fn mappings_under(dir: &Path) -> usize {
    let maps = fs::read_to_string("/proc/self/maps").unwrap();
    let dir = dir.to_string_lossy();
    maps.lines().filter(|line| line.contains(&*dir)).count()
}

#[cfg(not(target_os = "linux"))]
fn mappings_under(_dir: &Path) -> usize {
    0
}

#[test]
fn round_trip_every_type() {
    let dir = tempfile::tempdir().unwrap();
    let mut int32 = Vec::new();
    let mut float = Vec::new();
    for i in 0..6 {
        int32.extend_from_slice(&(i as i32 * 7).to_ne_bytes());
        float.extend_from_slice(&(i as f32 / 4.0).to_ne_bytes());
    }
    let contents = [
        ("flag.bool", vec![1, 0, 1, 1, 0, 0x80]),
        ("count.int32", int32),
        ("id.int64", int64_bytes(&[1, -2, 3, i64::MIN, 5, 6])),
        ("ratio.float", float),
        ("price.double", f64_bytes(&[0.5, 1.5, f64::NAN, 3.5, 4.5, 5.5])),
    ];
    let paths = contents
        .iter()
        .map(|(name, bytes)| write_column(&dir, name, bytes))
        .collect::<Vec<_>>();

    let table = load_mapped(&paths).unwrap();
    assert!(!table.is_view());
    assert_eq!(table.nrows(), 6);
    assert_eq!(table.names(), &["flag", "count", "id", "ratio", "price"]);

    for (col, (_, bytes)) in contents.iter().enumerate() {
        let column = table.column(col).unwrap();
        assert_eq!(column.memory_kind(), MemoryKind::MemoryMapped);
        assert_eq!(column.nrows(), 6);
        assert_eq!(column.as_bytes(), &bytes[..]);
    }

    assert_eq!(table.column_stype(1).unwrap(), StorageType::IntegerI4);
    assert_eq!(table.value(0, 0).unwrap(), Value::Bool(true));
    assert_eq!(table.value(5, 0).unwrap(), Value::Na);
    assert_eq!(table.value(3, 1).unwrap(), Value::Int(21));
    assert_eq!(table.value(1, 2).unwrap(), Value::Int(-2));
    assert_eq!(table.value(3, 2).unwrap(), Value::Na);
    assert_eq!(table.value(2, 3).unwrap(), Value::Real(0.5));
    assert_eq!(table.value(2, 4).unwrap(), Value::Na);
}

#[test]
fn row_count_mismatch_releases_every_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_column(&dir, "a.int64", &int64_bytes(&[0; 10]));
    let b = write_column(&dir, "b.int64", &int64_bytes(&[0; 11]));
    let c = write_column(&dir, "c.bool", &[0; 10]);

    for options in [LoadOptions::new(), LoadOptions::new().parallel(false)] {
        let err = options.load(&[&a, &b, &c]).unwrap_err();
        assert!(matches!(
            err,
            Error::RowCountMismatch { ref column, actual: 11, expected: 10, ref reference }
                if column == "b" && reference == "column `a`"
        ));
        assert_eq!(mappings_under(dir.path()), 0);
    }
}

#[test]
fn empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_column(&dir, "good.double", &f64_bytes(&[1.0]));
    let empty = write_column(&dir, "empty.double", &[]);

    let err = load_mapped(&[&good, &empty]).unwrap_err();
    assert!(matches!(err, Error::EmptyFile { ref path } if *path == empty));
    assert_eq!(mappings_under(dir.path()), 0);
}

#[test]
fn unknown_type_is_reported_before_opening_files() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.int64");
    let odd = write_column(&dir, "odd.decimal", &[0; 8]);

    let err = load_mapped(&[&missing, &odd]).unwrap_err();
    assert!(matches!(err, Error::UnknownType { ref token, .. } if token == "decimal"));
    assert!(err.to_string().contains("odd.decimal"));
}

#[test]
fn missing_suffix_and_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let bare = write_column(&dir, "bare", &[0; 8]);
    assert!(matches!(
        load_mapped(&[&bare]),
        Err(Error::MissingTypeSuffix { .. })
    ));

    let missing = dir.path().join("missing.int64");
    let err = load_mapped(&[&missing]).unwrap_err();
    assert!(matches!(err, Error::Io { ref path, .. } if *path == missing));
}

#[test]
fn partial_trailing_element() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = int64_bytes(&[7, 8]);
    bytes.extend_from_slice(&[1, 2, 3, 4]);
    let path = write_column(&dir, "x.int64", &bytes);

    assert!(matches!(
        load_mapped(&[&path]),
        Err(Error::SizeMismatch { elemsize: 8, byte_length: 20, .. })
    ));
    assert_eq!(mappings_under(dir.path()), 0);

    let table = LoadOptions::new()
        .allow_trailing_bytes(true)
        .load(&[&path])
        .unwrap();
    assert_eq!(table.nrows(), 2);
    assert_eq!(table.column(0).unwrap().alloc_size(), 16);
    assert_eq!(table.value(1, 0).unwrap(), Value::Int(8));
}

#[test]
fn parallel_and_serial_loads_agree() {
    let dir = tempfile::tempdir().unwrap();
    let paths = (0..8)
        .map(|i| {
            let values = (0..100).map(|row| row * 10 + i).collect::<Vec<i64>>();
            write_column(&dir, &format!("c{i}.int64"), &int64_bytes(&values))
        })
        .collect::<Vec<_>>();

    let parallel = LoadOptions::new().advice(Advice::Sequential).load(&paths).unwrap();
    let serial = LoadOptions::new().parallel(false).load(&paths).unwrap();

    assert_eq!(parallel.names(), serial.names());
    for col in 0..8 {
        assert_eq!(
            parallel.column(col).unwrap().as_bytes(),
            serial.column(col).unwrap().as_bytes()
        );
    }
    assert_eq!(parallel.value(42, 3).unwrap(), Value::Int(423));
}

#[test]
fn dropping_the_last_view_unmaps_the_files() {
    let dir = tempfile::tempdir().unwrap();
    let id = write_column(&dir, "id.int64", &int64_bytes(&[10, 11, 12, 13, 14]));
    let flag = write_column(&dir, "flag.bool", &[1, 0, 0, 1, 1]);

    let table = Arc::new(load_mapped(&[&id, &flag]).unwrap());
    if cfg!(target_os = "linux") {
        assert_eq!(mappings_under(dir.path()), 2);
    }

    let flags = Arc::new(
        table
            .select_columns(ColMapping::from_array(vec![1], 2).unwrap())
            .unwrap(),
    );
    let filter = RowMapping::from_boolean_table(&flags).unwrap();
    let filtered = table.select_rows(filter).unwrap();
    drop(flags);
    drop(table);

    assert_eq!(filtered.nrows(), 3);
    assert_eq!(filtered.value(0, 0).unwrap(), Value::Int(10));
    assert_eq!(filtered.value(2, 0).unwrap(), Value::Int(14));
    if cfg!(target_os = "linux") {
        assert_eq!(mappings_under(dir.path()), 2);
    }

    drop(filtered);
    assert_eq!(mappings_under(dir.path()), 0);
}

#[test]
fn wide_parallel_load_keeps_column_order() {
    let dir = tempfile::tempdir().unwrap();
    let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
    let ncols = 4 * workers + 3;
    let paths = (0..ncols)
        .map(|i| write_column(&dir, &format!("c{i}.int64"), &int64_bytes(&[i as i64])))
        .collect::<Vec<_>>();

    let table = LoadOptions::new().load(&paths).unwrap();
    assert_eq!(table.ncols(), ncols);
    assert_eq!(table.nrows(), 1);
    for col in 0..ncols {
        assert_eq!(table.names()[col], format!("c{col}"));
        assert_eq!(table.value(0, col).unwrap(), Value::Int(col as i64));
    }
    drop(table);
    assert_eq!(mappings_under(dir.path()), 0);

    fs::write(&paths[ncols - 1], int64_bytes(&[1, 2])).unwrap();
    assert!(matches!(
        LoadOptions::new().load(&paths),
        Err(Error::RowCountMismatch { actual: 2, expected: 1, .. })
    ));
    assert_eq!(mappings_under(dir.path()), 0);
}

#[test]
fn populated_load() {
    let dir = tempfile::tempdir().unwrap();
    let values = (0..10_000).collect::<Vec<i64>>();
    let a = write_column(&dir, "a.int64", &int64_bytes(&values));
    let b = write_column(&dir, "b.double", &f64_bytes(&vec![0.25; 10_000]));

    let table = LoadOptions::new()
        .populate(true)
        .advice(Advice::WillNeed)
        .load(&[&a, &b])
        .unwrap();
    assert_eq!(table.nrows(), 10_000);
    assert_eq!(table.value(9_999, 0).unwrap(), Value::Int(9_999));
    assert_eq!(table.value(5_000, 1).unwrap(), Value::Real(0.25));
}
