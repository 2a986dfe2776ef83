//! XLSX writer
//!
//! There is one write path. A fresh file is a merge into a minimal skeleton
//! package; saving a document is a merge into the package it was read from.
//! The merge regenerates the sheet data, the shared strings, the `<sheets>`
//! list and the entries of the relationship and content-type parts that point
//! at them. Every other part is copied as it was.

use std::collections::HashSet;
use std::io::{Seek, Write};
use std::path::Path;

use lightxl_core::{
    CachedValue, CellAddress, CellValue, SharedStringTable, Workbook, Worksheet,
};

use crate::archive::{FileSink, Package, PartSink, WriteOptions, ZipSink};
use crate::document::{SourceLayout, SourceSheet, XlsxDocument};
use crate::error::{XlsxError, XlsxResult};
use crate::escape::{encode_excel_escapes, escape_xml};
use crate::paths::{relative_target, rels_path_for, resolve_target};
use crate::reader::{conventional_sheet_part, shared_strings_part};
use crate::tokenizer::{
    root_layout, tokenize_content_types, tokenize_relationships, tokenize_shared_strings,
    tokenize_sheet, ContentType, Relationship, SheetRecord,
};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const WORKBOOK_PART: &str = "xl/workbook.xml";

const CT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_SHARED_STRINGS: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";

/// Children of `<worksheet>` that the schema places after `<mergeCells>`
const AFTER_MERGE_CELLS: &[&str] = &[
    "phoneticPr",
    "conditionalFormatting",
    "dataValidations",
    "hyperlinks",
    "printOptions",
    "pageMargins",
    "pageSetup",
    "headerFooter",
    "rowBreaks",
    "colBreaks",
    "customProperties",
    "cellWatches",
    "ignoredErrors",
    "smartTags",
    "drawing",
    "legacyDrawing",
    "legacyDrawingHF",
    "picture",
    "oleObjects",
    "controls",
    "webPublishItems",
    "tableParts",
    "extLst",
];

/// How worksheets are matched to the sheets of a source archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetMatch {
    /// By [`lightxl_core::SheetKey`]; for the workbook the source was read into
    Key,
    /// By sheet name; for any other workbook
    Name,
}

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a file path
    ///
    /// The file is replaced only once the archive is complete.
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        Self::write_file_with(workbook, path, &WriteOptions::default())
    }

    /// Write a workbook to a file path with options
    pub fn write_file_with<P: AsRef<Path>>(
        workbook: &Workbook,
        path: P,
        options: &WriteOptions,
    ) -> XlsxResult<()> {
        Self::write_to(workbook, FileSink::create(path, options)?)
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        Self::write_with(workbook, writer, &WriteOptions::default())
    }

    /// Write a workbook to a writer with options
    pub fn write_with<W: Write + Seek>(
        workbook: &Workbook,
        writer: W,
        options: &WriteOptions,
    ) -> XlsxResult<()> {
        Self::write_to(workbook, ZipSink::new(writer, options))
    }

    /// Write a fresh workbook into any sink and finalize it
    pub fn write_to<S: PartSink>(workbook: &Workbook, sink: S) -> XlsxResult<()> {
        Self::to_package(workbook)?.write_to(sink)
    }

    /// Parts of a fresh workbook
    pub fn to_package(workbook: &Workbook) -> XlsxResult<Package> {
        let (package, layout) = skeleton();
        merge(workbook, &package, &layout, SheetMatch::Name)
    }

    /// Write `workbook` into the archive `source` was read from
    ///
    /// Sheets are matched to the source by name; unmatched sheets get new
    /// parts and source sheets with no match are dropped.
    pub fn write_merged<S: PartSink>(
        workbook: &Workbook,
        source: &XlsxDocument,
        sink: S,
    ) -> XlsxResult<()> {
        Self::merged_package(workbook, source, SheetMatch::Name)?.write_to(sink)
    }

    /// Parts of `workbook` merged into the archive of `source`
    pub fn merged_package(
        workbook: &Workbook,
        source: &XlsxDocument,
        matching: SheetMatch,
    ) -> XlsxResult<Package> {
        merge(workbook, source.package(), source.layout(), matching)
    }
}

// ==================== Skeleton ====================

const SKELETON_STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts>
    <fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
    <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
    <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
    <cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
    <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#;

/// Smallest package a workbook can be merged into
fn skeleton() -> (Package, SourceLayout) {
    let mut package = Package::new();
    package.insert(
        CONTENT_TYPES_PART,
        render_content_types(&[
            ContentType::Default {
                extension: "rels".into(),
                content_type: "application/vnd.openxmlformats-package.relationships+xml".into(),
            },
            ContentType::Default {
                extension: "xml".into(),
                content_type: "application/xml".into(),
            },
            ContentType::Override {
                part_name: format!("/{}", WORKBOOK_PART),
                content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml".into(),
            },
            ContentType::Override {
                part_name: "/xl/styles.xml".into(),
                content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml".into(),
            },
        ]),
    );
    package.insert(
        "_rels/.rels",
        render_relationships(&[Relationship {
            id: "rId1".into(),
            rel_type: format!("{}/officeDocument", REL_NS),
            target: WORKBOOK_PART.into(),
            external: false,
        }]),
    );
    package.insert(
        WORKBOOK_PART,
        format!(
            "{}\n<workbook xmlns=\"{}\" xmlns:r=\"{}\"><sheets/></workbook>",
            XML_DECL, MAIN_NS, REL_NS
        ),
    );
    package.insert(
        rels_path_for(WORKBOOK_PART),
        render_relationships(&[Relationship {
            id: "rId1".into(),
            rel_type: format!("{}/styles", REL_NS),
            target: "styles.xml".into(),
            external: false,
        }]),
    );
    package.insert("xl/styles.xml", format!("{}\n{}", XML_DECL, SKELETON_STYLES));
    (package, SourceLayout::new(WORKBOOK_PART))
}

// ==================== Merge ====================

/// Where one sheet of the output goes
struct SheetPlan<'a> {
    /// Worksheet to render; `None` for a source sheet carried over unread
    sheet: Option<&'a Worksheet>,
    name: String,
    part: String,
    sheet_id: u32,
    rel_id: String,
    /// The part exists in the source and is spliced rather than replaced
    from_source: bool,
    /// The workbook relationship for this sheet is (re)generated
    owns_rel: bool,
}

/// Hands out identifiers not used by the source
struct Allocator {
    next_sheet_id: u32,
    rel_ids: HashSet<String>,
    parts: HashSet<String>,
}

impl Allocator {
    fn sheet_id(&mut self) -> u32 {
        let id = self.next_sheet_id;
        self.next_sheet_id += 1;
        id
    }

    fn rel_id(&mut self) -> String {
        let mut n = 1;
        loop {
            let id = format!("rId{}", n);
            if self.rel_ids.insert(id.clone()) {
                return id;
            }
            n += 1;
        }
    }

    fn part(&mut self, workbook_part: &str) -> String {
        let mut n = 1;
        loop {
            let part = conventional_sheet_part(workbook_part, n);
            if self.parts.insert(part.clone()) {
                return part;
            }
            n += 1;
        }
    }
}

fn merge(
    workbook: &Workbook,
    source: &Package,
    layout: &SourceLayout,
    matching: SheetMatch,
) -> XlsxResult<Package> {
    let mut out = source.clone();
    let workbook_part = layout.workbook_part.as_str();
    let rels_part = rels_path_for(workbook_part);
    let rels = match out.get(&rels_part) {
        Some(bytes) => tokenize_relationships(&rels_part, bytes)?,
        None => Vec::new(),
    };
    let sst_part = shared_strings_part(workbook_part, Some(&rels));

    let placeholder;
    let sheets: Vec<&Worksheet> = if workbook.is_empty() {
        log::debug!("workbook has no sheets, writing an empty Sheet1");
        placeholder = Worksheet::new("Sheet1");
        vec![&placeholder]
    } else {
        workbook.sheets().collect()
    };

    let mut alloc = Allocator {
        next_sheet_id: layout
            .sheets
            .iter()
            .chain(&layout.skipped)
            .map(|s| s.sheet_id)
            .max()
            .unwrap_or(0)
            + 1,
        rel_ids: rels
            .iter()
            .map(|r| r.id.clone())
            .chain(layout.sheets.iter().chain(&layout.skipped).filter_map(|s| s.rel_id.clone()))
            .collect(),
        parts: out.names().map(str::to_string).collect(),
    };

    let (plans, dropped) = plan_sheets(&sheets, layout, matching, &mut alloc, workbook_part);

    // Parts of sheets that are gone, and the calculation chain
    let mut removed: HashSet<String> = HashSet::new();
    for sheet in &dropped {
        log::debug!("dropping sheet {:?} ({})", sheet.name, sheet.part);
        removed.insert(sheet.part.clone());
        removed.insert(rels_path_for(&sheet.part));
    }
    for rel in rels.iter().filter(|r| r.is_kind("calcChain") && !r.external) {
        removed.insert(resolve_target(workbook_part, &rel.target));
    }
    for part in &removed {
        if out.remove(part).is_some() {
            log::debug!("removed part {}", part);
        }
    }

    // Sheet parts and shared strings. Sheets carried over unread still point
    // into the source table, so it is kept as the prefix of the new one.
    let mut strings = StringPool::default();
    if plans.iter().any(|p| p.sheet.is_none()) {
        if let Some(bytes) = source.get(&sst_part) {
            strings.table = tokenize_shared_strings(&sst_part, bytes)?;
        }
        for plan in plans.iter().filter(|p| p.sheet.is_none()) {
            if let Some(bytes) = out.get(&plan.part) {
                strings.count += count_shared_refs(&plan.part, bytes);
            }
        }
    }
    for plan in &plans {
        let Some(sheet) = plan.sheet else { continue };
        let xml = render_sheet(sheet, &mut strings);
        let bytes = match out.get(&plan.part) {
            Some(original) if plan.from_source => splice_sheet(&plan.part, original, &xml)?,
            _ => xml.into_part(),
        };
        out.insert(plan.part.clone(), bytes);
    }
    let unique_strings = strings.table.len();
    out.insert(sst_part.clone(), strings.into_part());

    // Workbook relationships
    let mut sst_rel_id = None;
    let dropped_rel_ids: HashSet<&str> = dropped.iter().filter_map(|s| s.rel_id.as_deref()).collect();
    let owned_rel_ids: HashSet<&str> = plans
        .iter()
        .filter(|p| p.owns_rel)
        .map(|p| p.rel_id.as_str())
        .collect();
    let plan_parts: HashSet<&str> = plans.iter().map(|p| p.part.as_str()).collect();
    let mut new_rels: Vec<Relationship> = Vec::with_capacity(rels.len() + plans.len() + 1);
    for rel in &rels {
        if rel.is_kind("sharedStrings") {
            sst_rel_id.get_or_insert_with(|| rel.id.clone());
            continue;
        }
        if rel.is_kind("calcChain")
            || dropped_rel_ids.contains(rel.id.as_str())
            || owned_rel_ids.contains(rel.id.as_str())
        {
            continue;
        }
        if rel.is_kind("worksheet") && !rel.external {
            let target = resolve_target(workbook_part, &rel.target);
            if removed.contains(&target) || plan_parts.contains(target.as_str()) {
                continue;
            }
        }
        new_rels.push(rel.clone());
    }
    // Strict documents use a different relationship namespace
    let rel_ns = rels
        .iter()
        .filter(|r| ["worksheet", "styles", "sharedStrings", "theme"].iter().any(|k| r.is_kind(k)))
        .find_map(|r| r.rel_type.rsplit_once('/').map(|(ns, _)| ns.to_string()))
        .unwrap_or_else(|| REL_NS.to_string());
    for plan in plans.iter().filter(|p| p.owns_rel) {
        new_rels.push(Relationship {
            id: plan.rel_id.clone(),
            rel_type: format!("{}/worksheet", rel_ns),
            target: relative_target(workbook_part, &plan.part),
            external: false,
        });
    }
    new_rels.push(Relationship {
        id: sst_rel_id.unwrap_or_else(|| alloc.rel_id()),
        rel_type: format!("{}/sharedStrings", rel_ns),
        target: relative_target(workbook_part, &sst_part),
        external: false,
    });
    out.insert(rels_part, render_relationships(&new_rels));

    // Content types
    let content_types = out
        .get(CONTENT_TYPES_PART)
        .ok_or_else(|| XlsxError::MissingRequiredPart(CONTENT_TYPES_PART.to_string()))?;
    let mut entries: Vec<ContentType> = tokenize_content_types(CONTENT_TYPES_PART, content_types)?
        .into_iter()
        .filter(|entry| match entry {
            ContentType::Default { .. } => true,
            ContentType::Override {
                part_name,
                content_type,
            } => {
                !removed.contains(part_name.trim_start_matches('/'))
                    && !content_type.ends_with("calcChain+xml")
            }
        })
        .collect();
    let needed = plans
        .iter()
        .filter(|p| p.sheet.is_some())
        .map(|p| (p.part.as_str(), CT_WORKSHEET))
        .chain(std::iter::once((sst_part.as_str(), CT_SHARED_STRINGS)));
    for (part, content_type) in needed {
        let covered = entries.iter().any(|entry| {
            matches!(entry, ContentType::Override { part_name, .. }
                if part_name.trim_start_matches('/') == part)
        });
        if !covered {
            entries.push(ContentType::Override {
                part_name: format!("/{}", part),
                content_type: content_type.to_string(),
            });
        }
    }
    out.insert(CONTENT_TYPES_PART, render_content_types(&entries));

    // Sheet list of the workbook part
    let workbook_xml = out
        .get(workbook_part)
        .ok_or_else(|| XlsxError::MissingRequiredPart(workbook_part.to_string()))?;
    let spliced = splice_sheet_list(workbook_part, workbook_xml, &plans)?;
    out.insert(workbook_part, spliced);

    log::debug!(
        "wrote {} sheet(s), {} shared string(s)",
        plans.len(),
        unique_strings
    );
    Ok(out)
}

/// Shared-string references in a part that is copied unread
fn count_shared_refs(part: &str, bytes: &[u8]) -> usize {
    match tokenize_sheet(part, bytes) {
        Ok(records) => records
            .iter()
            .filter(|r| matches!(r, SheetRecord::Cell(c) if c.type_attr.as_deref() == Some("s")))
            .count(),
        Err(e) => {
            log::warn!("cannot count shared strings used by {}: {}", part, e);
            0
        }
    }
}

/// Decide part, `sheetId` and `rId` of every output sheet
///
/// Returns the plans in output order and the source sheets that are dropped.
/// Current sheets keep workbook order. A sheet that was not loaded goes back
/// right after the current sheet declared closest before it in the source
/// (or first, if none was), so an unedited workbook keeps its tab order.
fn plan_sheets<'a>(
    sheets: &[&'a Worksheet],
    layout: &SourceLayout,
    matching: SheetMatch,
    alloc: &mut Allocator,
    workbook_part: &str,
) -> (Vec<SheetPlan<'a>>, Vec<SourceSheet>) {
    let mut claimed = vec![false; layout.sheets.len()];
    // Each current sheet with the source position it was matched to
    let mut current: Vec<(SheetPlan<'a>, Option<usize>)> = Vec::with_capacity(sheets.len());

    for sheet in sheets {
        let found = layout.sheets.iter().enumerate().position(|(i, source)| {
            !claimed[i]
                && match matching {
                    SheetMatch::Key => source.key == sheet.key(),
                    SheetMatch::Name => source.name == sheet.name(),
                }
        });
        let entry = match found {
            Some(i) => {
                claimed[i] = true;
                let source = &layout.sheets[i];
                let plan = SheetPlan {
                    sheet: Some(*sheet),
                    name: sheet.name().to_string(),
                    part: source.part.clone(),
                    sheet_id: source.sheet_id,
                    rel_id: source.rel_id.clone().unwrap_or_else(|| alloc.rel_id()),
                    from_source: true,
                    owns_rel: true,
                };
                (plan, Some(source.position))
            }
            None => {
                let plan = SheetPlan {
                    sheet: Some(*sheet),
                    name: sheet.name().to_string(),
                    part: alloc.part(workbook_part),
                    sheet_id: alloc.sheet_id(),
                    rel_id: alloc.rel_id(),
                    from_source: false,
                    owns_rel: true,
                };
                (plan, None)
            }
        };
        current.push(entry);
    }

    let mut dropped: Vec<SourceSheet> = layout
        .sheets
        .iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(source, _)| source.clone())
        .collect();

    // slots[0] goes before every current sheet, slots[i + 1] right after current[i]
    let mut slots: Vec<Vec<SheetPlan<'a>>> = (0..=current.len()).map(|_| Vec::new()).collect();
    let mut skipped: Vec<&SourceSheet> = layout.skipped.iter().collect();
    skipped.sort_by_key(|s| s.position);

    for skipped in skipped {
        if sheets.iter().any(|s| s.name() == skipped.name) {
            log::warn!(
                "sheet {:?} was not loaded and is replaced by a sheet of the same name",
                skipped.name
            );
            dropped.push(skipped.clone());
            continue;
        }
        let (rel_id, owns_rel) = match &skipped.rel_id {
            Some(id) => (id.clone(), false),
            None => (alloc.rel_id(), true),
        };
        let slot = current
            .iter()
            .enumerate()
            .filter_map(|(i, (_, position))| match position {
                Some(p) if *p < skipped.position => Some((*p, i + 1)),
                _ => None,
            })
            .max()
            .map_or(0, |(_, slot)| slot);
        slots[slot].push(SheetPlan {
            sheet: None,
            name: skipped.name.clone(),
            part: skipped.part.clone(),
            sheet_id: skipped.sheet_id,
            rel_id,
            from_source: true,
            owns_rel,
        });
    }

    let mut slots = slots.into_iter();
    let mut plans: Vec<SheetPlan<'a>> = slots.next().unwrap_or_default();
    for ((plan, _), carried) in current.into_iter().zip(slots) {
        plans.push(plan);
        plans.extend(carried);
    }

    (plans, dropped)
}

/// Replace the `<sheets>` element of the workbook part
fn splice_sheet_list(part: &str, bytes: &[u8], plans: &[SheetPlan<'_>]) -> XlsxResult<Vec<u8>> {
    let layout = root_layout(part, bytes)?;
    let span = layout
        .child("sheets")
        .ok_or_else(|| XlsxError::malformed(part, "no <sheets> element"))?;
    let (prefix, declaration) = match layout.prefix_for("relationships") {
        Some(prefix) => (prefix.to_string(), String::new()),
        None => ("r".to_string(), format!(" xmlns:r=\"{}\"", REL_NS)),
    };

    let mut xml = String::from("<sheets>");
    for plan in plans {
        xml.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{}\"{} {}:id=\"{}\"/>",
            escape_xml(&plan.name),
            plan.sheet_id,
            declaration,
            prefix,
            escape_xml(&plan.rel_id)
        ));
    }
    xml.push_str("</sheets>");

    splice(part, bytes, vec![(span.start, span.end, xml)])
}

// ==================== Sheet rendering ====================

/// Regenerated elements of one sheet part
struct SheetXml {
    dimension: String,
    sheet_data: String,
    merge_cells: String,
}

impl SheetXml {
    /// A complete sheet part around the regenerated elements
    fn into_part(self) -> Vec<u8> {
        format!(
            "{}\n<worksheet xmlns=\"{}\" xmlns:r=\"{}\">{}{}{}</worksheet>",
            XML_DECL, MAIN_NS, REL_NS, self.dimension, self.sheet_data, self.merge_cells
        )
        .into_bytes()
    }
}

/// Shared strings collected while rendering sheets
#[derive(Default)]
struct StringPool {
    table: SharedStringTable,
    /// References made, duplicates included
    count: usize,
}

impl StringPool {
    fn index(&mut self, s: &str) -> usize {
        self.count += 1;
        self.table.intern(s)
    }

    fn into_part(self) -> Vec<u8> {
        let mut xml = format!(
            "{}\n<sst xmlns=\"{}\" count=\"{}\" uniqueCount=\"{}\">",
            XML_DECL,
            MAIN_NS,
            self.count,
            self.table.len()
        );
        for s in self.table.iter() {
            let preserve = s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace);
            xml.push_str(if preserve {
                "<si><t xml:space=\"preserve\">"
            } else {
                "<si><t>"
            });
            xml.push_str(&escape_xml(&encode_excel_escapes(s)));
            xml.push_str("</t></si>");
        }
        xml.push_str("</sst>");
        xml.into_bytes()
    }
}

fn render_sheet(sheet: &Worksheet, strings: &mut StringPool) -> SheetXml {
    let dimension = format!(
        "<dimension ref=\"{}\"/>",
        sheet
            .used_range()
            .map_or_else(|| "A1".to_string(), |r| r.to_string())
    );

    let merged = sheet.merged_ranges();
    let mut data = String::new();
    let mut current_row = 0;
    for (addr, value) in sheet.iter_cells() {
        // Only the top-left cell of a merged region carries its value
        if merged.iter().any(|m| m.contains(&addr) && m.start != addr) {
            continue;
        }
        if addr.row != current_row {
            if current_row != 0 {
                data.push_str("</row>");
            }
            data.push_str(&format!("<row r=\"{}\">", addr.row));
            current_row = addr.row;
        }
        push_cell(&mut data, addr, value, strings);
    }
    let sheet_data = if current_row == 0 {
        "<sheetData/>".to_string()
    } else {
        format!("<sheetData>{}</row></sheetData>", data)
    };

    let merge_cells = if merged.is_empty() {
        String::new()
    } else {
        let mut xml = format!("<mergeCells count=\"{}\">", merged.len());
        for range in merged {
            xml.push_str(&format!("<mergeCell ref=\"{}\"/>", range));
        }
        xml.push_str("</mergeCells>");
        xml
    };

    SheetXml {
        dimension,
        sheet_data,
        merge_cells,
    }
}

fn push_cell(out: &mut String, addr: CellAddress, value: &CellValue, strings: &mut StringPool) {
    match value {
        CellValue::Empty => {}
        CellValue::Number(n) if n.is_finite() => {
            out.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", addr, format_number(*n)));
        }
        CellValue::Number(n) => {
            log::warn!("{} holds {}, writing #NUM!", addr, n);
            out.push_str(&format!("<c r=\"{}\" t=\"e\"><v>#NUM!</v></c>", addr));
        }
        CellValue::Text(s) => {
            out.push_str(&format!("<c r=\"{}\" t=\"s\"><v>{}</v></c>", addr, strings.index(s)));
        }
        CellValue::Boolean(b) => {
            out.push_str(&format!("<c r=\"{}\" t=\"b\"><v>{}</v></c>", addr, u8::from(*b)));
        }
        CellValue::Error(e) => {
            out.push_str(&format!(
                "<c r=\"{}\" t=\"e\"><v>{}</v></c>",
                addr,
                escape_xml(e.as_str())
            ));
        }
        CellValue::Formula { formula, cached } => {
            let (t, v) = match cached {
                CachedValue::Text(s) => (" t=\"str\"", escape_xml(&encode_excel_escapes(s))),
                CachedValue::Number(n) if n.is_finite() => ("", format_number(*n)),
                CachedValue::Number(_) => (" t=\"e\"", "#NUM!".to_string()),
                CachedValue::Boolean(b) => (" t=\"b\"", u8::from(*b).to_string()),
                CachedValue::Error(e) => (" t=\"e\"", escape_xml(e.as_str())),
            };
            out.push_str(&format!(
                "<c r=\"{}\"{}><f>{}</f><v>{}</v></c>",
                addr,
                t,
                escape_xml(formula),
                v
            ));
        }
    }
}

/// Shortest text that reads back as the same `f64`
fn format_number(n: f64) -> String {
    let abs = n.abs();
    if abs != 0.0 && !(1e-5..1e15).contains(&abs) {
        format!("{:e}", n)
    } else {
        format!("{}", n)
    }
}

/// Splice regenerated elements into an existing sheet part
fn splice_sheet(part: &str, bytes: &[u8], xml: &SheetXml) -> XlsxResult<Vec<u8>> {
    let layout = root_layout(part, bytes)?;
    let sheet_data = layout
        .child("sheetData")
        .ok_or_else(|| XlsxError::malformed(part, "no <sheetData> element"))?;

    let mut edits = vec![(sheet_data.start, sheet_data.end, xml.sheet_data.clone())];
    if let Some(dimension) = layout.child("dimension") {
        edits.push((dimension.start, dimension.end, xml.dimension.clone()));
    }
    match layout.child("mergeCells") {
        Some(merges) => edits.push((merges.start, merges.end, xml.merge_cells.clone())),
        None if !xml.merge_cells.is_empty() => {
            let at = layout
                .children
                .iter()
                .filter(|c| c.start > sheet_data.start)
                .find(|c| AFTER_MERGE_CELLS.contains(&c.name.as_str()))
                .map(|c| c.start)
                .or(layout.close_start)
                .unwrap_or(sheet_data.end);
            edits.push((at, at, xml.merge_cells.clone()));
        }
        None => {}
    }
    splice(part, bytes, edits)
}

/// Replace byte ranges of a part; ranges must not overlap
fn splice(part: &str, bytes: &[u8], mut edits: Vec<(usize, usize, String)>) -> XlsxResult<Vec<u8>> {
    edits.sort_by_key(|&(start, end, _)| (start, end));
    let mut out = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    for (start, end, text) in edits {
        if start < pos || end > bytes.len() {
            return Err(XlsxError::malformed(part, "overlapping elements"));
        }
        out.extend_from_slice(&bytes[pos..start]);
        out.extend_from_slice(text.as_bytes());
        pos = end;
    }
    out.extend_from_slice(&bytes[pos..]);
    Ok(out)
}

// ==================== Package metadata ====================

fn render_relationships(rels: &[Relationship]) -> Vec<u8> {
    let mut xml = format!("{}\n<Relationships xmlns=\"{}\">", XML_DECL, PACKAGE_REL_NS);
    for rel in rels {
        xml.push_str(&format!(
            "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"{}/>",
            escape_xml(&rel.id),
            escape_xml(&rel.rel_type),
            escape_xml(&rel.target),
            if rel.external {
                " TargetMode=\"External\""
            } else {
                ""
            }
        ));
    }
    xml.push_str("</Relationships>");
    xml.into_bytes()
}

fn render_content_types(entries: &[ContentType]) -> Vec<u8> {
    let mut xml = format!("{}\n<Types xmlns=\"{}\">", XML_DECL, CONTENT_TYPES_NS);
    for entry in entries {
        match entry {
            ContentType::Default {
                extension,
                content_type,
            } => xml.push_str(&format!(
                "<Default Extension=\"{}\" ContentType=\"{}\"/>",
                escape_xml(extension),
                escape_xml(content_type)
            )),
            ContentType::Override {
                part_name,
                content_type,
            } => xml.push_str(&format!(
                "<Override PartName=\"{}\" ContentType=\"{}\"/>",
                escape_xml(part_name),
                escape_xml(content_type)
            )),
        }
    }
    xml.push_str("</Types>");
    xml.into_bytes()
}
