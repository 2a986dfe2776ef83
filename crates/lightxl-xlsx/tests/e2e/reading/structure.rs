//! Workbook structure: part discovery, sheet order, options, failures.

use crate::{relationships, root_rels, sheet, workbook, Fixture, WORKSHEET_REL};
use lightxl_core::{CellValue, Error};
use lightxl_xlsx::{ReadOptions, XlsxError};
use pretty_assertions::assert_eq;

#[test]
fn test_read_empty_xlsx() {
    let wb = Fixture::standard(&[("Sheet1", "")]).read().unwrap();
    assert_eq!(wb.len(), 1);
    assert_eq!(wb.sheet_names(), ["Sheet1"]);
    assert!(wb.sheet("Sheet1").unwrap().is_empty());
}

#[test]
fn test_sheets_follow_declared_order() {
    let bodies: Vec<String> = (1..=10)
        .map(|n| format!(r#"<row r="1"><c r="A1"><v>{}</v></c></row>"#, n))
        .collect();
    let names: Vec<String> = (1..=10).map(|n| format!("S{}", n)).collect();
    let sheets: Vec<(&str, &str)> = names
        .iter()
        .map(String::as_str)
        .zip(bodies.iter().map(String::as_str))
        .collect();

    let wb = Fixture::standard(&sheets).read().unwrap();
    assert_eq!(wb.sheet_names(), names.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(
        wb.sheet("S10").unwrap().address("A1").unwrap(),
        &CellValue::Number(10.0)
    );
    assert_eq!(
        wb.sheet("S2").unwrap().address("A1").unwrap(),
        &CellValue::Number(2.0)
    );
}

#[test]
fn test_sheet_parts_resolved_through_relationships() {
    // Declared order differs from part numbering
    let wb = Fixture::new()
        .part("[Content_Types].xml", "<Types/>")
        .part("_rels/.rels", &root_rels("/xl/workbook.xml"))
        .part(
            "xl/workbook.xml",
            &workbook(
                r#"<sheet name="Second" sheetId="2" r:id="rId2"/><sheet name="First" sheetId="1" r:id="rId1"/>"#,
            ),
        )
        .part(
            "xl/_rels/workbook.xml.rels",
            &relationships(&format!(
                r#"<Relationship Id="rId1" Type="{0}" Target="worksheets/a.xml"/><Relationship Id="rId2" Type="{0}" Target="/xl/worksheets/b.xml"/>"#,
                WORKSHEET_REL
            )),
        )
        .part("xl/worksheets/a.xml", &sheet(r#"<row r="1"><c r="A1"><v>1</v></c></row>"#))
        .part("xl/worksheets/b.xml", &sheet(r#"<row r="1"><c r="A1"><v>2</v></c></row>"#))
        .read()
        .unwrap();

    assert_eq!(wb.sheet_names(), ["Second", "First"]);
    assert_eq!(
        wb.sheet("Second").unwrap().address("A1").unwrap(),
        &CellValue::Number(2.0)
    );
}

#[test]
fn test_missing_workbook_rels_falls_back_to_sheet_id() {
    let wb = Fixture::new()
        .part("[Content_Types].xml", "<Types/>")
        .part(
            "xl/workbook.xml",
            &workbook(r#"<sheet name="Only" sheetId="3" r:id="rId9"/>"#),
        )
        .part("xl/worksheets/sheet3.xml", &sheet(r#"<row r="2"><c r="B2"><v>7</v></c></row>"#))
        .read()
        .unwrap();
    assert_eq!(
        wb.sheet("Only").unwrap().address("B2").unwrap(),
        &CellValue::Number(7.0)
    );
}

#[test]
fn test_missing_workbook_part() {
    let err = Fixture::standard(&[("Sheet1", "")])
        .without("xl/workbook.xml")
        .read()
        .unwrap_err();
    assert!(matches!(err, XlsxError::MissingRequiredPart(ref p) if p == "xl/workbook.xml"), "{:?}", err);
}

#[test]
fn test_missing_sheet_part() {
    let err = Fixture::standard(&[("Sheet1", ""), ("Sheet2", "")])
        .without("xl/worksheets/sheet2.xml")
        .read()
        .unwrap_err();
    assert!(
        matches!(err, XlsxError::MissingRequiredPart(ref p) if p == "xl/worksheets/sheet2.xml"),
        "{:?}",
        err
    );
}

#[test]
fn test_binary_workbook_is_unsupported() {
    let err = Fixture::standard(&[("Sheet1", "")])
        .part("_rels/.rels", &root_rels("xl/workbook.bin"))
        .part("xl/workbook.bin", "\u{0}\u{1}")
        .read()
        .unwrap_err();
    assert!(matches!(err, XlsxError::UnsupportedFormatVersion(_)), "{:?}", err);
}

#[test]
fn test_foreign_namespace_is_unsupported() {
    let err = Fixture::standard(&[("Sheet1", "")])
        .part(
            "xl/workbook.xml",
            r#"<workbook xmlns="urn:example:not-spreadsheetml"><sheets/></workbook>"#,
        )
        .read()
        .unwrap_err();
    assert!(matches!(err, XlsxError::UnsupportedFormatVersion(_)), "{:?}", err);
}

#[test]
fn test_not_a_zip() {
    let err = lightxl_xlsx::XlsxReader::read(std::io::Cursor::new(b"plain text".to_vec()))
        .unwrap_err();
    assert!(matches!(err, XlsxError::Zip(_)), "{:?}", err);
}

#[test]
fn test_read_options_select_sheets() {
    let fixture = Fixture::standard(&[
        ("A", r#"<row r="1"><c r="A1"><v>1</v></c></row>"#),
        ("B", r#"<row r="1"><c r="A1"><v>2</v></c></row>"#),
        ("C", r#"<row r="1"><c r="A1"><v>3</v></c></row>"#),
    ]);

    let doc = fixture.document_with(&ReadOptions::sheets(["C", "A"])).unwrap();
    assert_eq!(doc.workbook().sheet_names(), ["A", "C"]);
    assert_eq!(doc.layout().skipped.len(), 1);
    assert_eq!(doc.layout().skipped[0].name, "B");

    let err = fixture
        .document_with(&ReadOptions::sheets(["Nope"]))
        .unwrap_err();
    assert!(
        matches!(err, XlsxError::Core(Error::SheetNotFound(ref s)) if s == "Nope"),
        "{:?}",
        err
    );
}

#[test]
fn test_layout_records_source_parts() {
    let doc = Fixture::standard(&[("One", ""), ("Two", "")]).document().unwrap();
    let layout = doc.layout();
    assert_eq!(layout.workbook_part, "xl/workbook.xml");
    let two = doc.workbook().sheet("Two").unwrap();
    let source = layout.sheet(two.key()).unwrap();
    assert_eq!(source.part, "xl/worksheets/sheet2.xml");
    assert_eq!(source.sheet_id, 2);
    assert_eq!(source.rel_id.as_deref(), Some("rId2"));
}

#[test]
fn test_nonconforming_sheet_names_read_as_declared() {
    let long = "Quarterly revenue by region and product line";
    assert!(long.len() > 31);
    let fixture = Fixture::standard(&[
        (long, r#"<row r="1"><c r="A1"><v>1</v></c></row>"#),
        ("Q1/Q2", r#"<row r="1"><c r="A1"><v>2</v></c></row>"#),
    ]);

    let doc = fixture.document().unwrap();
    let wb = doc.workbook();
    assert_eq!(wb.sheet_names(), [long, "Q1/Q2"]);
    assert_eq!(
        wb.sheet(long).unwrap().address("A1").unwrap(),
        &CellValue::Number(1.0)
    );
    assert_eq!(
        wb.sheet("Q1/Q2").unwrap().address("A1").unwrap(),
        &CellValue::Number(2.0)
    );

    let again = crate::rewrite(&doc);
    assert_eq!(again.workbook().sheet_names(), [long, "Q1/Q2"]);
}
