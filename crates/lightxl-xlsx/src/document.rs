//! A workbook together with the archive it was read from

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use lightxl_core::{SheetKey, Workbook};

use crate::archive::{FileSink, Package, PartSink, WriteOptions};
use crate::error::XlsxResult;
use crate::reader::{ReadOptions, XlsxReader};
use crate::writer::{SheetMatch, XlsxWriter};

/// Where one sheet of the source archive lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSheet {
    /// Key of the worksheet in the document's workbook
    /// ([`SheetKey::UNASSIGNED`] for sheets that were not loaded)
    pub key: SheetKey,
    /// Name the sheet had in the source
    pub name: String,
    /// Part holding the sheet
    pub part: String,
    /// `sheetId` in the workbook part
    pub sheet_id: u32,
    /// Relationship id in the workbook part
    pub rel_id: Option<String>,
    /// 0-based position of the sheet among all sheets the workbook part declares
    pub position: usize,
}

/// How the sheets of a source archive map to parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    /// Part holding the workbook metadata
    pub workbook_part: String,
    /// Sheets that were loaded, in declared order
    pub sheets: Vec<SourceSheet>,
    /// Declared sheets that were not loaded (filtered out, or not worksheets)
    pub skipped: Vec<SourceSheet>,
}

impl SourceLayout {
    pub(crate) fn new<S: Into<String>>(workbook_part: S) -> Self {
        Self {
            workbook_part: workbook_part.into(),
            sheets: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Source entry of a loaded sheet
    pub fn sheet(&self, key: SheetKey) -> Option<&SourceSheet> {
        self.sheets.iter().find(|s| s.key == key)
    }
}

/// A workbook read from an archive, ready to be written back
///
/// Writing a document merges the current workbook into the source archive:
/// parts this crate does not model are copied unchanged.
///
/// ```no_run
/// use lightxl_xlsx::XlsxDocument;
///
/// let mut doc = XlsxDocument::open("report.xlsx").unwrap();
/// doc.workbook_mut()
///     .update_address("Sheet1", "B2", 42.0)
///     .unwrap();
/// doc.save("report.xlsx").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct XlsxDocument {
    workbook: Workbook,
    package: Package,
    layout: SourceLayout,
}

impl XlsxDocument {
    pub(crate) fn from_parts(workbook: Workbook, package: Package, layout: SourceLayout) -> Self {
        Self {
            workbook,
            package,
            layout,
        }
    }

    /// Read a document from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Self> {
        XlsxReader::read_document(reader, &ReadOptions::default())
    }

    /// Read a document with options
    pub fn read_with<R: Read + Seek>(reader: R, options: &ReadOptions) -> XlsxResult<Self> {
        XlsxReader::read_document(reader, options)
    }

    /// Read a document from parts already in memory
    pub fn from_package(package: Package, options: &ReadOptions) -> XlsxResult<Self> {
        XlsxReader::read_package(package, options)
    }

    /// Read a document from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        Self::open_with(path, &ReadOptions::default())
    }

    /// Read a document from a file path with options
    pub fn open_with<P: AsRef<Path>>(path: P, options: &ReadOptions) -> XlsxResult<Self> {
        let file = File::open(path)?;
        XlsxReader::read_document(file, options)
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    pub fn into_workbook(self) -> Workbook {
        self.workbook
    }

    /// Every part of the source archive, as read
    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// Parts this document would write
    pub fn to_package(&self) -> XlsxResult<Package> {
        XlsxWriter::merged_package(&self.workbook, self, SheetMatch::Key)
    }

    /// Write the document's workbook into a sink and finalize it
    pub fn write_to<S: PartSink>(&self, sink: S) -> XlsxResult<()> {
        self.to_package()?.write_to(sink)
    }

    /// Write the document as a zip archive
    pub fn write<W: Write + Seek>(&self, writer: W, options: &WriteOptions) -> XlsxResult<W> {
        self.to_package()?.write_zip(writer, options)
    }

    /// Write the document to a file path, replacing it atomically
    pub fn save<P: AsRef<Path>>(&self, path: P) -> XlsxResult<()> {
        self.save_with(path, &WriteOptions::default())
    }

    /// Write the document to a file path with options
    pub fn save_with<P: AsRef<Path>>(&self, path: P, options: &WriteOptions) -> XlsxResult<()> {
        let package = self.to_package()?;
        package.write_to(FileSink::create(path, options)?)
    }
}
