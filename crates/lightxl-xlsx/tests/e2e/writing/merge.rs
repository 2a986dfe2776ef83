//! Writing back into the archive a document was read from.

use lightxl_core::{CellValue, Workbook};
use lightxl_xlsx::{Package, ReadOptions, XlsxDocument, XlsxWriter};
use pretty_assertions::assert_eq;

use crate::{
    part_text, relationships, rewrite, rewrite_package, Fixture, MAIN_NS, REL_NS, WORKSHEET_CT,
    WORKSHEET_REL,
};

const THEME: &str = r#"<?xml version="1.0"?><a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office"/>"#;

/// Two sheets, a theme, document properties, a calculation chain, and a
/// first sheet with content this crate does not model
fn rich_fixture() -> Fixture {
    let first = format!(
        r#"<?xml version="1.0"?><worksheet xmlns="{}" xmlns:r="{}"><dimension ref="A1:B2"/><sheetViews><sheetView workbookViewId="0"/></sheetViews><cols><col min="1" max="1" width="30" customWidth="1"/></cols><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1"><f>1+1</f><v>2</v></c></row></sheetData><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#,
        MAIN_NS, REL_NS
    );
    let types = format!(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="{0}"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="{0}"/><Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/><Override PartName="/xl/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/></Types>"#,
        WORKSHEET_CT
    );
    let rels = relationships(&format!(
        concat!(
            r#"<Relationship Id="rId1" Type="{0}" Target="worksheets/sheet1.xml"/>"#,
            r#"<Relationship Id="rId2" Type="{0}" Target="worksheets/sheet2.xml"/>"#,
            r#"<Relationship Id="rId3" Type="{1}/theme" Target="theme/theme1.xml"/>"#,
            r#"<Relationship Id="rId4" Type="{1}/sharedStrings" Target="sharedStrings.xml"/>"#,
            r#"<Relationship Id="rId5" Type="{1}/calcChain" Target="calcChain.xml"/>"#,
        ),
        WORKSHEET_REL, REL_NS
    ));

    Fixture::standard(&[("First", ""), ("Second", r#"<row r="1"><c r="A1"><v>5</v></c></row>"#)])
        .part("[Content_Types].xml", &types)
        .part("xl/_rels/workbook.xml.rels", &rels)
        .part("xl/worksheets/sheet1.xml", &first)
        .part(
            "xl/sharedStrings.xml",
            &crate::shared_strings("<si><t>header</t></si>"),
        )
        .part("xl/theme/theme1.xml", THEME)
        .part("xl/calcChain.xml", r#"<calcChain xmlns="x"><c r="B1" i="1"/></calcChain>"#)
        .part("docProps/core.xml", "<coreProperties/>")
}

fn edited(fixture: &Fixture) -> (XlsxDocument, Package) {
    let mut doc = fixture.document().unwrap();
    doc.workbook_mut()
        .update_address("First", "A2", "added")
        .unwrap();
    let out = rewrite_package(&doc);
    (doc, out)
}

#[test]
fn test_untouched_parts_are_copied() {
    let fixture = rich_fixture();
    let (doc, out) = edited(&fixture);
    for part in ["xl/theme/theme1.xml", "docProps/core.xml"] {
        assert_eq!(out.get(part), doc.package().get(part), "{}", part);
    }
    let rels = part_text(&out, "xl/_rels/workbook.xml.rels");
    assert!(rels.contains(r#"Id="rId3""#) && rels.contains("theme/theme1.xml"));
}

#[test]
fn test_sheet_part_keeps_unmodelled_content() {
    let (_, out) = edited(&rich_fixture());
    let sheet = part_text(&out, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(r#"<cols><col min="1" max="1" width="30" customWidth="1"/></cols>"#));
    assert!(sheet.contains(r#"<sheetViews><sheetView workbookViewId="0"/></sheetViews>"#));
    assert!(sheet.contains("<pageMargins "));
    assert!(sheet.contains(r#"<dimension ref="A1:B2"/>"#));
    assert!(sheet.contains(r#"<c r="A2" t="s">"#));
    assert!(sheet.find("<sheetData>") < sheet.find("<pageMargins"));
}

#[test]
fn test_calc_chain_is_dropped() {
    let (_, out) = edited(&rich_fixture());
    assert!(!out.contains("xl/calcChain.xml"));
    assert!(!part_text(&out, "xl/_rels/workbook.xml.rels").contains("calcChain"));
    assert!(!part_text(&out, "[Content_Types].xml").contains("calcChain"));
}

#[test]
fn test_edit_survives_rewrite() {
    let (doc, _) = edited(&rich_fixture());
    let again = rewrite(&doc);
    let first = again.workbook().sheet("First").unwrap();
    assert_eq!(first.address("A1").unwrap(), &CellValue::text("header"));
    assert_eq!(first.address("A2").unwrap(), &CellValue::text("added"));
    assert_eq!(first.address("B1").unwrap().formula_text(), Some("1+1"));
    assert_eq!(
        again.workbook().sheet("Second").unwrap().address("A1").unwrap(),
        &CellValue::Number(5.0)
    );
}

#[test]
fn test_rename_keeps_part_and_ids() {
    let mut doc = rich_fixture().document().unwrap();
    doc.workbook_mut().rename_sheet("First", "Renamed").unwrap();
    doc.workbook_mut().move_sheet("Renamed", 1).unwrap();
    let out = rewrite_package(&doc);

    let workbook = part_text(&out, "xl/workbook.xml");
    assert!(workbook.contains(
        r#"<sheets><sheet name="Second" sheetId="2" r:id="rId2"/><sheet name="Renamed" sheetId="1" r:id="rId1"/></sheets>"#
    ), "{}", workbook);
    assert!(part_text(&out, "xl/worksheets/sheet1.xml").contains("<cols>"));
}

#[test]
fn test_removed_sheet_parts_are_dropped() {
    let mut doc = rich_fixture().document().unwrap();
    doc.workbook_mut().remove_sheet("Second").unwrap();
    doc.workbook_mut().add_sheet("Third").unwrap().set_address("C3", 3.0).unwrap();
    let out = rewrite_package(&doc);

    assert!(!out.contains("xl/worksheets/sheet2.xml"));
    let types = part_text(&out, "[Content_Types].xml");
    assert!(!types.contains("/xl/worksheets/sheet2.xml"));
    assert!(types.contains("/xl/worksheets/sheet3.xml"));
    let workbook = part_text(&out, "xl/workbook.xml");
    assert!(workbook.contains(r#"<sheet name="Third" sheetId="3" r:id="rId6"/>"#), "{}", workbook);

    let again = XlsxDocument::from_package(out, &ReadOptions::default()).unwrap();
    assert_eq!(again.workbook().sheet_names(), ["First", "Third"]);
}

#[test]
fn test_write_merged_matches_foreign_workbook_by_name() {
    let doc = rich_fixture().document().unwrap();
    let mut wb = Workbook::new();
    wb.add_sheet("Second").unwrap().set_address("A1", 50.0).unwrap();

    let mut out = Package::new();
    XlsxWriter::write_merged(&wb, &doc, &mut out).unwrap();

    assert!(!out.contains("xl/worksheets/sheet1.xml"));
    assert!(part_text(&out, "xl/workbook.xml").contains(r#"<sheet name="Second" sheetId="2" r:id="rId2"/>"#));
    let again = XlsxDocument::from_package(out, &ReadOptions::default()).unwrap();
    assert_eq!(
        again.workbook().sheet("Second").unwrap().address("A1").unwrap(),
        &CellValue::Number(50.0)
    );
}

#[test]
fn test_unread_sheets_are_carried_over() {
    let fixture = rich_fixture();
    let mut doc = fixture
        .document_with(&ReadOptions::sheets(["Second"]))
        .unwrap();
    doc.workbook_mut()
        .update_address("Second", "B1", 6.0)
        .unwrap();
    let out = rewrite_package(&doc);

    assert_eq!(
        out.get("xl/worksheets/sheet1.xml"),
        doc.package().get("xl/worksheets/sheet1.xml")
    );
    let again = XlsxDocument::from_package(out, &ReadOptions::default()).unwrap();
    assert_eq!(again.workbook().sheet_names(), ["First", "Second"]);
    assert_eq!(
        again.workbook().sheet("First").unwrap().address("A1").unwrap(),
        &CellValue::text("header")
    );
    assert_eq!(
        again.workbook().sheet("Second").unwrap().address("B1").unwrap(),
        &CellValue::Number(6.0)
    );
}

/// A chartsheet declared before a worksheet
fn chart_first_fixture() -> Fixture {
    let chartsheet = r#"<?xml version="1.0"?><chartsheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetViews><sheetView workbookViewId="0"/></sheetViews></chartsheet>"#;
    let rels = relationships(&format!(
        concat!(
            r#"<Relationship Id="rId1" Type="{0}/chartsheet" Target="chartsheets/sheet1.xml"/>"#,
            r#"<Relationship Id="rId2" Type="{1}" Target="worksheets/sheet2.xml"/>"#,
        ),
        REL_NS, WORKSHEET_REL
    ));
    let types = format!(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/chartsheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.chartsheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="{}"/></Types>"#,
        WORKSHEET_CT
    );

    Fixture::standard(&[("Chart1", ""), ("Data", r#"<row r="1"><c r="A1"><v>1</v></c></row>"#)])
        .without("xl/worksheets/sheet1.xml")
        .part("xl/chartsheets/sheet1.xml", chartsheet)
        .part("xl/_rels/workbook.xml.rels", &rels)
        .part("[Content_Types].xml", &types)
}

#[test]
fn test_chartsheet_keeps_its_tab_position() {
    let doc = chart_first_fixture().document().unwrap();
    assert_eq!(doc.workbook().sheet_names(), ["Data"]);
    assert_eq!(doc.layout().skipped[0].name, "Chart1");

    let out = rewrite_package(&doc);
    let workbook = part_text(&out, "xl/workbook.xml");
    assert!(
        workbook.contains(concat!(
            r#"<sheets><sheet name="Chart1" sheetId="1" r:id="rId1"/>"#,
            r#"<sheet name="Data" sheetId="2" r:id="rId2"/></sheets>"#
        )),
        "{}",
        workbook
    );
    assert_eq!(
        out.get("xl/chartsheets/sheet1.xml"),
        doc.package().get("xl/chartsheets/sheet1.xml")
    );
    let rels = part_text(&out, "xl/_rels/workbook.xml.rels");
    assert!(rels.contains(r#"Target="chartsheets/sheet1.xml""#), "{}", rels);
    let types = part_text(&out, "[Content_Types].xml");
    assert!(types.contains("chartsheet+xml"), "{}", types);

    // Writing twice changes nothing further
    let again = XlsxDocument::from_package(out.clone(), &ReadOptions::default()).unwrap();
    assert_eq!(rewrite_package(&again).get("xl/workbook.xml"), out.get("xl/workbook.xml"));
}

#[test]
fn test_unread_sheet_follows_its_declared_neighbour() {
    let fixture = Fixture::standard(&[("One", ""), ("Two", ""), ("Three", "")]);
    let mut doc = fixture
        .document_with(&ReadOptions::sheets(["One", "Three"]))
        .unwrap();
    let wb = doc.workbook_mut();
    wb.move_sheet("Three", 0).unwrap();
    wb.add_sheet("Four").unwrap();

    let out = rewrite_package(&doc);
    let again = XlsxDocument::from_package(out, &ReadOptions::default()).unwrap();
    assert_eq!(again.workbook().sheet_names(), ["Three", "One", "Two", "Four"]);

    let ids: Vec<(&str, u32)> = again
        .layout()
        .sheets
        .iter()
        .map(|s| (s.name.as_str(), s.sheet_id))
        .collect();
    assert_eq!(ids, [("Three", 3), ("One", 1), ("Two", 2), ("Four", 4)]);
}
