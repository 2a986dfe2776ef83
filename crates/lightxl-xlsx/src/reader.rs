//! XLSX reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use lightxl_core::{
    CachedValue, CellAddress, CellValue, Error as CoreError, SharedStringTable, SheetKey,
    TypeHint, Workbook, Worksheet,
};

use crate::archive::Package;
use crate::document::{SourceLayout, SourceSheet, XlsxDocument};
use crate::error::{XlsxError, XlsxResult};
use crate::formula::translate_shared_formula;
use crate::paths::{parent_dir, rels_path_for, resolve_target};
use crate::tokenizer::{
    tokenize_relationships, tokenize_shared_strings, tokenize_sheet, tokenize_workbook,
    CellRecord, Relationship, SheetDecl, SheetRecord,
};

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

/// Options for reading a workbook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Only load these sheets (empty = every sheet)
    ///
    /// Sheets are still loaded in workbook order, not in the order given here.
    pub sheets: Vec<String>,
}

impl ReadOptions {
    /// Options restricted to the given sheet names
    pub fn sheets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sheets: names.into_iter().map(Into::into).collect(),
        }
    }
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(file)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        Ok(Self::read_document(reader, &ReadOptions::default())?.into_workbook())
    }

    /// Read a workbook together with everything needed to write it back
    pub fn read_document<R: Read + Seek>(
        reader: R,
        options: &ReadOptions,
    ) -> XlsxResult<XlsxDocument> {
        // The archive is closed before any part is parsed
        let package = Package::from_zip(reader)?;
        Self::read_package(package, options)
    }

    /// Read a workbook out of parts already in memory
    pub fn read_package(package: Package, options: &ReadOptions) -> XlsxResult<XlsxDocument> {
        let workbook_part = Self::locate_workbook(&package)?;
        let workbook_bytes = package
            .get(&workbook_part)
            .ok_or_else(|| XlsxError::MissingRequiredPart(workbook_part.clone()))?;
        let decls = tokenize_workbook(&workbook_part, workbook_bytes)?;

        let rels = Self::read_rels(&package, &workbook_part)?;
        let strings = Self::read_shared_strings(&package, &workbook_part, rels.as_deref())?;
        let wanted = Self::select_sheets(&decls, options)?;

        let mut workbook = Workbook::new();
        let mut layout = SourceLayout::new(workbook_part.clone());

        for (position, decl) in decls.into_iter().enumerate() {
            let (part, is_worksheet) =
                Self::sheet_part(&workbook_part, &decl, rels.as_deref());
            let sheet = SourceSheet {
                key: SheetKey::UNASSIGNED,
                name: decl.name.clone(),
                part,
                sheet_id: decl.sheet_id,
                rel_id: decl.rel_id.clone(),
                position,
            };

            if !wanted(&decl.name) {
                log::debug!("sheet {:?} not requested, carrying it over unread", decl.name);
                layout.skipped.push(sheet);
                continue;
            }
            if !is_worksheet {
                log::warn!("sheet {:?} is not a worksheet, carrying it over unread", decl.name);
                layout.skipped.push(sheet);
                continue;
            }

            let bytes = package
                .get(&sheet.part)
                .ok_or_else(|| XlsxError::MissingRequiredPart(sheet.part.clone()))?;
            let worksheet = Self::read_worksheet(&sheet.part, bytes, &decl.name, &strings)?;
            let key = workbook
                .add_sheet_as_declared(worksheet)
                .map_err(|e| XlsxError::malformed(&workbook_part, e))?
                .key();
            layout.sheets.push(SourceSheet { key, ..sheet });
        }

        log::debug!(
            "read {} sheet(s) from {} ({} carried over)",
            layout.sheets.len(),
            workbook_part,
            layout.skipped.len()
        );
        Ok(XlsxDocument::from_parts(workbook, package, layout))
    }

    /// Find the workbook part through the package relationships
    fn locate_workbook(package: &Package) -> XlsxResult<String> {
        let part = match package.get("_rels/.rels") {
            Some(bytes) => tokenize_relationships("_rels/.rels", bytes)?
                .into_iter()
                .find(|rel| rel.is_kind("officeDocument") && !rel.external)
                .map(|rel| resolve_target("", &rel.target))
                .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string()),
            None => DEFAULT_WORKBOOK_PART.to_string(),
        };

        if part.to_ascii_lowercase().ends_with(".bin") {
            return Err(XlsxError::UnsupportedFormatVersion(format!(
                "binary workbook part {}",
                part
            )));
        }
        if !package.contains(&part) {
            return Err(XlsxError::MissingRequiredPart(part));
        }
        Ok(part)
    }

    /// Relationships of the workbook part; `None` when the part is absent
    fn read_rels(package: &Package, workbook_part: &str) -> XlsxResult<Option<Vec<Relationship>>> {
        let rels_part = rels_path_for(workbook_part);
        match package.get(&rels_part) {
            Some(bytes) => Ok(Some(tokenize_relationships(&rels_part, bytes)?)),
            None => {
                log::debug!("{} is absent, using conventional part names", rels_part);
                Ok(None)
            }
        }
    }

    fn read_shared_strings(
        package: &Package,
        workbook_part: &str,
        rels: Option<&[Relationship]>,
    ) -> XlsxResult<SharedStringTable> {
        let part = shared_strings_part(workbook_part, rels);
        match package.get(&part) {
            Some(bytes) => tokenize_shared_strings(&part, bytes),
            None => {
                log::debug!("no shared string table at {}", part);
                Ok(SharedStringTable::new())
            }
        }
    }

    /// Build the sheet filter, checking every requested name is declared
    fn select_sheets<'a>(
        decls: &[SheetDecl],
        options: &'a ReadOptions,
    ) -> XlsxResult<impl Fn(&str) -> bool + 'a> {
        if let Some(missing) = options
            .sheets
            .iter()
            .find(|name| !decls.iter().any(|d| &d.name == *name))
        {
            return Err(CoreError::SheetNotFound(missing.clone()).into());
        }
        Ok(move |name: &str| options.sheets.is_empty() || options.sheets.iter().any(|s| s == name))
    }

    /// Part path of a declared sheet, and whether it is a worksheet
    ///
    /// Without a usable relationship the conventional
    /// `worksheets/sheet{sheetId}.xml` next to the workbook part is assumed.
    fn sheet_part(
        workbook_part: &str,
        decl: &SheetDecl,
        rels: Option<&[Relationship]>,
    ) -> (String, bool) {
        let rel = rels.and_then(|rels| {
            decl.rel_id
                .as_deref()
                .and_then(|id| rels.iter().find(|rel| rel.id == id))
        });
        match rel {
            Some(rel) => (
                resolve_target(workbook_part, &rel.target),
                rel.is_kind("worksheet"),
            ),
            None => {
                if rels.is_some() {
                    log::warn!(
                        "sheet {:?} has no relationship {:?}, assuming sheet{}.xml",
                        decl.name,
                        decl.rel_id,
                        decl.sheet_id
                    );
                }
                (conventional_sheet_part(workbook_part, decl.sheet_id), true)
            }
        }
    }

    /// Tokenize one sheet part into a worksheet
    fn read_worksheet(
        part: &str,
        bytes: &[u8],
        name: &str,
        strings: &SharedStringTable,
    ) -> XlsxResult<Worksheet> {
        let mut worksheet = Worksheet::new(name);
        let mut merges = Vec::new();
        let mut cells = Vec::new();
        let mut shared = SharedFormulas::default();

        for record in tokenize_sheet(part, bytes)? {
            match record {
                SheetRecord::Cell(cell) => {
                    let address = cell.address;
                    if let Some(value) = cell_value(part, cell, strings, &mut shared)? {
                        cells.push((address, value));
                    }
                }
                SheetRecord::Merge(range) => merges.push(range),
            }
        }

        worksheet
            .load(cells)
            .map_err(|e| XlsxError::malformed(part, e))?;
        for range in merges {
            worksheet
                .add_merge(range)
                .map_err(|e| XlsxError::malformed(part, e))?;
        }
        Ok(worksheet)
    }
}

/// Shared-string part named by the workbook relationships, or the conventional one
pub(crate) fn shared_strings_part(workbook_part: &str, rels: Option<&[Relationship]>) -> String {
    rels.and_then(|rels| {
        rels.iter()
            .find(|rel| rel.is_kind("sharedStrings") && !rel.external)
            .map(|rel| resolve_target(workbook_part, &rel.target))
    })
    .unwrap_or_else(|| join_part(parent_dir(workbook_part), "sharedStrings.xml"))
}

pub(crate) fn conventional_sheet_part(workbook_part: &str, n: u32) -> String {
    join_part(
        parent_dir(workbook_part),
        &format!("worksheets/sheet{}.xml", n),
    )
}

fn join_part(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Master formulas of shared groups seen so far, by `si`
#[derive(Default)]
struct SharedFormulas {
    masters: HashMap<u32, (String, CellAddress)>,
}

impl SharedFormulas {
    /// Formula text for a cell of a shared group
    fn resolve(&mut self, index: u32, text: String, at: CellAddress) -> Option<String> {
        if !text.is_empty() {
            self.masters.insert(index, (text.clone(), at));
            return Some(text);
        }
        let (master, origin) = self.masters.get(&index)?;
        Some(translate_shared_formula(
            master,
            at.row as i64 - origin.row as i64,
            at.col as i64 - origin.col as i64,
        ))
    }
}

/// Turn a cell record into a value; `None` for a cell that holds nothing
fn cell_value(
    part: &str,
    record: CellRecord,
    strings: &SharedStringTable,
    shared: &mut SharedFormulas,
) -> XlsxResult<Option<CellValue>> {
    let CellRecord {
        address,
        type_attr,
        value,
        inline,
        formula,
    } = record;

    let plain = if type_attr.as_deref() == Some("inlineStr") {
        inline.or(value).map(CellValue::Text)
    } else {
        match value {
            Some(raw) => Some(
                CellValue::from_token(TypeHint::from_attr(type_attr.as_deref()), &raw, strings)
                    .map_err(|e| XlsxError::malformed(part, format!("cell {}: {}", address, e)))?,
            ),
            None => None,
        }
    };

    let text = match formula {
        Some(f) if f.is_shared() => {
            let index = f.shared_index.unwrap_or_default();
            let resolved = shared.resolve(index, f.text, address);
            if resolved.is_none() {
                log::warn!(
                    "{}: cell {} refers to unknown shared formula {}",
                    part,
                    address,
                    index
                );
            }
            resolved
        }
        Some(f) if !f.text.is_empty() => Some(f.text),
        _ => None,
    };

    let value = match text {
        Some(text) => Some(CellValue::formula(
            text,
            plain.map(CachedValue::from_value).unwrap_or_default(),
        )),
        None => plain,
    };
    Ok(value.filter(|v| !v.is_empty()))
}
