use std::fs::File;
use std::io::Write;

use rstest::rstest;
use tempfile::tempdir;
use winder_config::{LayerRow, load_layers_csv};

fn write_csv(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("layers.csv");
    let mut f = File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    (dir, path)
}

#[rstest]
fn loads_rows_in_order() {
    let (_dir, path) = write_csv(
        "length,angle,offset,stepover,dwell\n200,45,10,4,30\n150, 60, 20, 3.5, 0\n",
    );
    let rows = load_layers_csv(&path).unwrap();
    assert_eq!(
        rows,
        vec![
            LayerRow {
                length: 200.0,
                angle: 45.0,
                offset: 10.0,
                stepover: 4.0,
                dwell: 30.0,
            },
            LayerRow {
                length: 150.0,
                angle: 60.0,
                offset: 20.0,
                stepover: 3.5,
                dwell: 0.0,
            },
        ]
    );
}

#[rstest]
#[case("angle,length,offset,stepover,dwell\n45,200,10,4,30\n")]
#[case("length,angle,offset,stepover\n200,45,10,4\n")]
#[case("len,angle,offset,stepover,dwell\n200,45,10,4,30\n")]
fn rejects_wrong_headers(#[case] csv: &str) {
    let (_dir, path) = write_csv(csv);
    let err = load_layers_csv(&path).unwrap_err();
    assert!(err.to_string().contains("must have headers"), "got: {err}");
}

#[rstest]
fn reports_row_number_of_bad_value() {
    let (_dir, path) =
        write_csv("length,angle,offset,stepover,dwell\n200,45,10,4,30\n200,steep,10,4,30\n");
    let err = load_layers_csv(&path).unwrap_err();
    assert!(err.to_string().contains("row 3"), "got: {err}");
}

#[rstest]
fn rejects_empty_table() {
    let (_dir, path) = write_csv("length,angle,offset,stepover,dwell\n");
    let err = load_layers_csv(&path).unwrap_err();
    assert!(err.to_string().contains("no layers"));
}

#[rstest]
fn applies_range_checks() {
    let (_dir, path) = write_csv("length,angle,offset,stepover,dwell\n200,95,10,4,30\n");
    let err = load_layers_csv(&path).unwrap_err();
    assert!(err.to_string().contains("angle must be in (0, 90)"));
}

#[rstest]
fn missing_file_is_reported() {
    let dir = tempdir().unwrap();
    let err = load_layers_csv(&dir.path().join("nope.csv")).unwrap_err();
    assert!(err.to_string().contains("open layer CSV"));
}
