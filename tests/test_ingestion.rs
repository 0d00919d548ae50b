//! Integration test: CSV ingestion

mod common;

use polars::prelude::*;
use superstore_ml::data::schema::{ORDER_DATE, SHIP_DATE};
use superstore_ml::data::{read_superstore, ColumnRole};
use superstore_ml::DataWarning;

#[test]
fn test_load_synthetic_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_csv(dir.path(), common::HEADER, &common::records(20, 10));

    let dataset = read_superstore(&path).unwrap();
    assert_eq!(dataset.height(), 20);
    assert_eq!(dataset.width(), 18);
    assert!(dataset.warnings().is_empty());
    assert_eq!(dataset.frame().column(ORDER_DATE).unwrap().dtype(), &DataType::Date);
    assert_eq!(dataset.schema().role(SHIP_DATE), Some(ColumnRole::Temporal));
    assert_eq!(dataset.schema().role("Region"), Some(ColumnRole::Categorical));
}

#[test]
fn test_duplicates_removed_first_kept() {
    let dir = tempfile::tempdir().unwrap();
    let r: Vec<String> = (0..3).map(|i| common::record(i, 1.0)).collect();
    let lines = vec![r[0].clone(), r[1].clone(), r[0].clone(), r[2].clone(), r[1].clone()];
    let path = common::write_csv(dir.path(), common::HEADER, &lines);

    let dataset = read_superstore(&path).unwrap();
    assert_eq!(dataset.height(), 3);

    let ids: Vec<Option<&str>> = dataset
        .frame()
        .column("Order ID")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(
        ids,
        vec![Some("CA-2014-000000"), Some("CA-2015-000001"), Some("CA-2016-000002")]
    );
}

#[test]
fn test_whitespace_only_difference_is_a_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let line = common::record(4, 2.0);
    let padded = line.replacen("Standard Class", "  Standard Class ", 1);
    let path = common::write_csv(dir.path(), common::HEADER, &[line, padded]);

    let dataset = read_superstore(&path).unwrap();
    assert_eq!(dataset.height(), 1);
    let mode = dataset.frame().column("Ship Mode").unwrap().str().unwrap().get(0);
    assert_eq!(mode, Some("Standard Class"));
}

#[test]
fn test_unparseable_date_is_missing_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut lines = common::records(3, 3);
    lines[1] = lines[1].replacen("2/2/2015", "sometime in feb", 1);
    let path = common::write_csv(dir.path(), common::HEADER, &lines);

    let dataset = read_superstore(&path).unwrap();
    assert_eq!(dataset.height(), 3);
    assert_eq!(dataset.frame().column(ORDER_DATE).unwrap().null_count(), 1);
    assert_eq!(dataset.frame().column(SHIP_DATE).unwrap().null_count(), 0);
    assert!(dataset.warnings().iter().any(|w| matches!(
        w,
        DataWarning::UnparseableDate { column, value, .. }
            if column == ORDER_DATE && value == "sometime in feb"
    )));
}

#[test]
fn test_lenient_date_formats() {
    let dir = tempfile::tempdir().unwrap();
    let mut lines = common::records(2, 2);
    lines[0] = lines[0].replacen("1/1/2014", "2014-01-01", 1);
    let path = common::write_csv(dir.path(), common::HEADER, &lines);

    let dataset = read_superstore(&path).unwrap();
    assert_eq!(dataset.frame().column(ORDER_DATE).unwrap().null_count(), 0);
    assert!(dataset.warnings().is_empty());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_superstore(dir.path().join("absent.csv")).is_err());
}
