//! Read, write, read again.

use std::io::Cursor;

use crate::{rewrite, snapshot, Fixture};
use lightxl_core::{CachedValue, CellError, CellRange, CellValue, Workbook};
use lightxl_xlsx::{Compression, WriteOptions, XlsxReader, XlsxWriter};
use pretty_assertions::assert_eq;

fn sample_workbook() -> Workbook {
    let mut wb = Workbook::new();
    let mut ws = wb.add_sheet("Data").unwrap();
    ws.set_address("A1", "Name").unwrap();
    ws.set_address("B1", "Score").unwrap();
    ws.set_address("A2", "alice").unwrap();
    ws.set_address("B2", 91.5).unwrap();
    ws.set_address("A3", "bob").unwrap();
    ws.set_address("B3", -3.0).unwrap();
    ws.set_address("C3", true).unwrap();
    ws.set_address("D3", CellError::Na).unwrap();
    ws.set_address("B4", CellValue::formula("SUM(B2:B3)", CachedValue::Number(88.5)))
        .unwrap();
    ws.set_address("E5", 1e-9).unwrap();
    ws.set_address("A6", "merged").unwrap();
    ws.add_merge(CellRange::parse("A6:C7").unwrap()).unwrap();

    let mut notes = wb.add_sheet("Notes").unwrap();
    notes.set_address("A1", "  leading and trailing  ").unwrap();
    notes.set_address("A2", "line\r\nbreak").unwrap();
    notes.set_address("A3", "_x0041_ literal").unwrap();
    notes.set_address("A4", "<tag> & \"quotes\"").unwrap();
    notes.set_address("A5", "alice").unwrap();
    wb
}

fn write_read(wb: &Workbook, options: &WriteOptions) -> Workbook {
    let mut cursor = Cursor::new(Vec::new());
    XlsxWriter::write_with(wb, &mut cursor, options).unwrap();
    XlsxReader::read(Cursor::new(cursor.into_inner())).unwrap()
}

#[test]
fn test_fresh_write_round_trip() {
    let wb = sample_workbook();
    let read = write_read(&wb, &WriteOptions::default());
    assert_eq!(snapshot(&read), snapshot(&wb));
}

#[test]
fn test_stored_compression_round_trip() {
    let wb = sample_workbook();
    let options = WriteOptions {
        compression: Compression::Stored,
    };
    assert_eq!(snapshot(&write_read(&wb, &options)), snapshot(&wb));
}

#[test]
fn test_merged_values_after_round_trip() {
    let read = write_read(&sample_workbook(), &WriteOptions::default());
    let ws = read.sheet("Data").unwrap();
    for label in ["A6", "B6", "C6", "A7", "B7", "C7"] {
        assert_eq!(ws.address(label).unwrap(), &CellValue::text("merged"), "{}", label);
    }
}

#[test]
fn test_error_cells_round_trip_as_errors() {
    let read = write_read(&sample_workbook(), &WriteOptions::default());
    let value = read.sheet("Data").unwrap().address("D3").unwrap().clone();
    assert_eq!(value, CellValue::Error(CellError::Na));
    assert!(value.is_error());
}

#[test]
fn test_unmodified_document_round_trip() {
    let fixture = Fixture::standard(&[
        (
            "First",
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>x</t></is></c><c r="B1"><f>A1</f></c></row><row r="2"><c r="A2" t="e"><v>#REF!</v></c></row>"#,
        ),
        ("Second", r#"<row r="4"><c r="D4" t="b"><v>1</v></c></row>"#),
    ]);
    let doc = fixture.document().unwrap();
    let again = rewrite(&doc);
    assert_eq!(snapshot(again.workbook()), snapshot(doc.workbook()));

    // And once more, from our own output
    let third = rewrite(&again);
    assert_eq!(snapshot(third.workbook()), snapshot(doc.workbook()));
}

#[test]
fn test_write_file_replaces_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    std::fs::write(&path, b"not a workbook").unwrap();

    let wb = sample_workbook();
    XlsxWriter::write_file(&wb, &path).unwrap();
    let read = XlsxReader::read_file(&path).unwrap();
    assert_eq!(snapshot(&read), snapshot(&wb));
}

#[test]
fn test_empty_workbook_round_trip() {
    let read = write_read(&Workbook::new(), &WriteOptions::default());
    assert_eq!(read.sheet_names(), ["Sheet1"]);
    assert!(read.sheet("Sheet1").unwrap().is_empty());
}
