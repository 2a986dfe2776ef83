//! Cell records: types, formulas, strings, merges.

use crate::{shared_strings, Fixture};
use lightxl_core::{CachedValue, CellError, CellValue};
use lightxl_xlsx::XlsxError;
use pretty_assertions::assert_eq;

#[test]
fn test_formula_cell_is_one_record() {
    let wb = Fixture::standard(&[(
        "Sheet1",
        r#"<row r="1"><c r="A1"><v>1</v></c></row><row r="2"><c r="A2"><v>2</v></c></row><row r="3"><c r="C3"><f>SUM(A1:A2)</f><v>3</v></c></row>"#,
    )])
    .read()
    .unwrap();

    let ws = wb.sheet("Sheet1").unwrap();
    assert_eq!(ws.cell_count(), 3);
    assert_eq!(
        ws.address("C3").unwrap(),
        &CellValue::formula("SUM(A1:A2)", CachedValue::Number(3.0))
    );
    assert_eq!(ws.size(), (3, 3));
}

#[test]
fn test_shared_strings_runs_and_whitespace() {
    let wb = Fixture::standard(&[(
        "Sheet1",
        r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c><c r="D1" t="s"><v>3</v></c><c r="E1" t="s"><v>4</v></c></row>"#,
    )])
    .part(
        "xl/sharedStrings.xml",
        &shared_strings(concat!(
            r#"<si><r><rPr><b/></rPr><t>Hello</t></r><r><t xml:space="preserve"> World</t></r></si>"#,
            r#"<si><t xml:space="preserve">  padded  </t></si>"#,
            r#"<si><t>  trimmed  </t></si>"#,
            r#"<si><t>漢字</t><rPh sb="0" eb="2"><t>かんじ</t></rPh></si>"#,
            r#"<si><t>line_x000D_break</t></si>"#,
        )),
    )
    .read()
    .unwrap();

    let row: Vec<_> = wb.sheet("Sheet1").unwrap().row(1).to_vec();
    assert_eq!(
        row,
        vec![
            CellValue::text("Hello World"),
            CellValue::text("  padded  "),
            CellValue::text("trimmed"),
            CellValue::text("漢字"),
            CellValue::text("line\rbreak"),
        ]
    );
}

#[test]
fn test_typed_cells() {
    let wb = Fixture::standard(&[(
        "Sheet1",
        r#"<row r="1">
            <c r="A1"><v>1.5</v></c>
            <c r="B1" t="b"><v>0</v></c>
            <c r="C1" t="e"><v>#N/A</v></c>
            <c r="D1" t="e"><v>#DIV/0!</v></c>
            <c r="E1" t="inlineStr"><is><t>inline</t></is></c>
            <c r="F1" t="str"><f>A1&amp;"x"</f><v>1.5x</v></c>
            <c r="G1" t="e"><f>1/0</f><v>#DIV/0!</v></c>
        </row>"#,
    )])
    .read()
    .unwrap();
    let ws = wb.sheet("Sheet1").unwrap();

    assert_eq!(ws.address("A1").unwrap(), &CellValue::Number(1.5));
    assert_eq!(ws.address("B1").unwrap(), &CellValue::Boolean(false));
    assert_eq!(ws.address("C1").unwrap(), &CellValue::Error(CellError::Na));
    assert_eq!(ws.address("D1").unwrap(), &CellValue::Error(CellError::Div0));
    assert_ne!(ws.address("C1").unwrap(), &CellValue::text("#N/A"));
    assert_eq!(ws.address("E1").unwrap(), &CellValue::text("inline"));
    assert_eq!(
        ws.address("F1").unwrap(),
        &CellValue::formula("A1&\"x\"", CachedValue::Text("1.5x".into()))
    );
    assert_eq!(
        ws.address("G1").unwrap().cached_value(),
        Some(&CachedValue::Error(CellError::Div0))
    );
}

#[test]
fn test_missing_cell_references_are_inferred() {
    let wb = Fixture::standard(&[(
        "Sheet1",
        r#"<row><c><v>1</v></c><c><v>2</v></c></row><row><c/><c><v>4</v></c></row><row r="5"><c r="C5"><v>5</v></c><c><v>6</v></c></row>"#,
    )])
    .read()
    .unwrap();
    let ws = wb.sheet("Sheet1").unwrap();

    assert_eq!(ws.address("A1").unwrap(), &CellValue::Number(1.0));
    assert_eq!(ws.address("B1").unwrap(), &CellValue::Number(2.0));
    assert_eq!(ws.address("A2").unwrap(), &CellValue::Empty);
    assert_eq!(ws.address("B2").unwrap(), &CellValue::Number(4.0));
    assert_eq!(ws.address("D5").unwrap(), &CellValue::Number(6.0));
}

#[test]
fn test_merged_range_values_propagate() {
    let sheet = r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>X</t></is></c></row><row r="3"><c r="D3"><v>9</v></c></row></sheetData><mergeCells count="2"><mergeCell ref="A1:B2"/><mergeCell ref="D3:D4"/></mergeCells></worksheet>"#;
    let wb = Fixture::standard(&[("Sheet1", "")])
        .part("xl/worksheets/sheet1.xml", sheet)
        .read()
        .unwrap();
    let ws = wb.sheet("Sheet1").unwrap();

    for label in ["A1", "A2", "B1", "B2"] {
        assert_eq!(ws.address(label).unwrap(), &CellValue::text("X"), "{}", label);
    }
    assert_eq!(ws.address("D4").unwrap(), &CellValue::Number(9.0));
    assert_eq!(ws.size(), (4, 4));
    assert_eq!(ws.merged_ranges().len(), 2);
}

#[test]
fn test_nested_cell_is_malformed() {
    let err = Fixture::standard(&[(
        "Sheet1",
        r#"<row r="1"><c r="A1"><c r="B1"><v>1</v></c></c></row>"#,
    )])
    .read()
    .unwrap_err();
    match err {
        XlsxError::MalformedPart { part, .. } => assert_eq!(part, "xl/worksheets/sheet1.xml"),
        other => panic!("expected MalformedPart, got {:?}", other),
    }
}

#[test]
fn test_shared_string_out_of_range_is_malformed() {
    let err = Fixture::standard(&[("Sheet1", r#"<row r="1"><c r="A1" t="s"><v>3</v></c></row>"#)])
        .part("xl/sharedStrings.xml", &shared_strings("<si><t>only</t></si>"))
        .read()
        .unwrap_err();
    assert!(matches!(err, XlsxError::MalformedPart { .. }), "{:?}", err);
}

#[test]
fn test_shared_formula_group() {
    let wb = Fixture::standard(&[(
        "Sheet1",
        r#"<row r="1"><c r="A1"><v>1</v></c><c r="B1"><f t="shared" ref="B1:B2" si="0">A1+$A$1</f><v>2</v></c></row><row r="2"><c r="A2"><v>2</v></c><c r="B2"><f t="shared" si="0"/><v>3</v></c></row>"#,
    )])
    .read()
    .unwrap();
    let ws = wb.sheet("Sheet1").unwrap();
    assert_eq!(ws.address("B2").unwrap().formula_text(), Some("A2+$A$1"));
}
