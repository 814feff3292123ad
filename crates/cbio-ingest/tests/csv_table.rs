use std::fs;

use cbio_ingest::{load_source, read_table};
use cbio_model::{CellValue, ImportError, TableSource};

#[test]
fn reads_tab_separated_table_with_missing_cells() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("patients.tsv");
    fs::write(&path, "ID\tAGE\tSEX\nP1\t30\tF\nP2\t\tM\nP3\t41\n").expect("write file");

    let table = read_table(&path, b'\t').expect("read table");
    assert_eq!(table.columns(), ["ID", "AGE", "SEX"]);
    assert_eq!(table.height(), 3);
    assert_eq!(table.rows()[1][1], CellValue::Missing);
    assert_eq!(table.rows()[2][2], CellValue::Missing);
    assert_eq!(table.rows()[2][1], CellValue::text("41"));
}

#[test]
fn honours_custom_delimiter() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("samples.csv"), "SID,PID\nS1,P1\n").expect("write file");

    let source = TableSource::Path("samples.csv".to_string());
    let table = load_source(&source, dir.path(), b',').expect("load table");
    assert_eq!(table.columns(), ["SID", "PID"]);
    assert_eq!(table.rows()[0], vec![CellValue::text("S1"), CellValue::text("P1")]);
}

#[test]
fn missing_file_is_input_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let source = TableSource::Path("absent.tsv".to_string());
    let err = load_source(&source, dir.path(), b'\t').unwrap_err();
    assert!(matches!(err, ImportError::Input(_)));
}

#[test]
fn overlong_record_is_input_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("bad.tsv");
    fs::write(&path, "ID\nP1\textra\n").expect("write file");
    assert!(matches!(read_table(&path, b'\t'), Err(ImportError::Input(_))));
}
