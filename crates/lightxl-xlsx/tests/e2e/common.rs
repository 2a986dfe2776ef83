//! Common utilities for E2E tests.

use std::io::{Cursor, Write};

use lightxl_core::{CellAddress, CellRange, CellValue, Workbook};
use lightxl_xlsx::{Package, ReadOptions, XlsxDocument, XlsxReader, XlsxResult};

pub const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const WORKSHEET_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
pub const WORKSHEET_CT: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

/// An archive under construction, part by part
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    parts: Vec<(String, Vec<u8>)>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A complete archive with one worksheet part per `(name, sheetData body)`
    ///
    /// Sheet `i` (0-based) has `sheetId` and `rId` `i + 1` and lives in
    /// `xl/worksheets/sheet{i + 1}.xml`.
    pub fn standard(sheets: &[(&str, &str)]) -> Self {
        let mut types = String::from(
            r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        let mut decls = String::new();
        let mut rels = String::new();
        let mut fixture = Fixture::new();
        for (i, (name, body)) in sheets.iter().enumerate() {
            let n = i + 1;
            types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="{}"/>"#,
                n, WORKSHEET_CT
            ));
            decls.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                name, n, n
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{}" Target="worksheets/sheet{}.xml"/>"#,
                n, WORKSHEET_REL, n
            ));
            fixture = fixture.part(&format!("xl/worksheets/sheet{}.xml", n), &sheet(body));
        }
        types.push_str("</Types>");

        Fixture::new()
            .part("[Content_Types].xml", &types)
            .part("_rels/.rels", &root_rels("xl/workbook.xml"))
            .part("xl/workbook.xml", &workbook(&decls))
            .part("xl/_rels/workbook.xml.rels", &relationships(&rels))
            .merge(fixture)
    }

    /// Add or replace a part
    pub fn part(mut self, name: &str, data: &str) -> Self {
        self.parts.retain(|(n, _)| n != name);
        self.parts.push((name.to_string(), data.as_bytes().to_vec()));
        self
    }

    /// Remove a part
    pub fn without(mut self, name: &str) -> Self {
        self.parts.retain(|(n, _)| n != name);
        self
    }

    fn merge(mut self, other: Fixture) -> Self {
        self.parts.extend(other.parts);
        self
    }

    /// Zip the parts, in the order they were added
    pub fn to_zip(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let cursor = Cursor::new(&mut buf);
            let mut zip = zip::ZipWriter::new(cursor);
            let options = zip::write::SimpleFileOptions::default();
            for (name, data) in &self.parts {
                zip.start_file(name.as_str(), options).unwrap();
                zip.write_all(data).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    pub fn read(&self) -> XlsxResult<Workbook> {
        XlsxReader::read(Cursor::new(self.to_zip()))
    }

    pub fn document(&self) -> XlsxResult<XlsxDocument> {
        XlsxDocument::read(Cursor::new(self.to_zip()))
    }

    pub fn document_with(&self, options: &ReadOptions) -> XlsxResult<XlsxDocument> {
        XlsxDocument::read_with(Cursor::new(self.to_zip()), options)
    }
}

pub fn sheet(body: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><worksheet xmlns="{}" xmlns:r="{}"><sheetData>{}</sheetData></worksheet>"#,
        MAIN_NS, REL_NS, body
    )
}

pub fn workbook(sheet_decls: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><workbook xmlns="{}" xmlns:r="{}"><sheets>{}</sheets></workbook>"#,
        MAIN_NS, REL_NS, sheet_decls
    )
}

pub fn relationships(body: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><Relationships xmlns="{}">{}</Relationships>"#,
        PACKAGE_REL_NS, body
    )
}

pub fn root_rels(workbook_target: &str) -> String {
    relationships(&format!(
        r#"<Relationship Id="rId1" Type="{}/officeDocument" Target="{}"/>"#,
        REL_NS, workbook_target
    ))
}

pub fn shared_strings(items: &str) -> String {
    format!(r#"<?xml version="1.0"?><sst xmlns="{}">{}</sst>"#, MAIN_NS, items)
}

/// Write a document to bytes and read them back
pub fn rewrite(doc: &XlsxDocument) -> XlsxDocument {
    let cursor = doc
        .write(Cursor::new(Vec::new()), &Default::default())
        .unwrap();
    XlsxDocument::read(Cursor::new(cursor.into_inner())).unwrap()
}

/// Write a document into a package without zipping it
pub fn rewrite_package(doc: &XlsxDocument) -> Package {
    doc.to_package().unwrap()
}

pub fn part_text(package: &Package, name: &str) -> String {
    String::from_utf8(package.get(name).unwrap().to_vec()).unwrap()
}

/// Everything a reader can observe about a workbook
pub fn snapshot(wb: &Workbook) -> Vec<(String, Vec<(CellAddress, CellValue)>, Vec<CellRange>)> {
    wb.sheets()
        .map(|ws| {
            (
                ws.name().to_string(),
                ws.iter_cells().map(|(a, v)| (a, v.clone())).collect(),
                ws.merged_ranges().to_vec(),
            )
        })
        .collect()
}
