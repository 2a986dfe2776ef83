//! # lightxl
//!
//! A light Rust library for reading, modifying and writing Excel workbooks.
//!
//! ## Features
//!
//! - Read and write XLSX/XLSM files (Office Open XML)
//! - Sparse worksheets addressed by label (`"B3"`) or by row and column
//! - Formulas kept with their cached results (never recalculated)
//! - Key-based row/column lookup and keyed tables
//! - Saving into an existing file keeps every part this library does not model
//!
//! ## Example
//!
//! ```rust
//! use lightxl::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let mut sheet = workbook.add_sheet("Sheet1").unwrap();
//!
//! sheet.set_address("A1", "Name").unwrap();
//! sheet.set_address("B1", "Age").unwrap();
//! sheet.set_address("A2", "alice").unwrap();
//! sheet.set_index(2, 2, 31.0).unwrap();
//!
//! let ages: Vec<_> = sheet.key_col("Age").unwrap().collect();
//! assert_eq!(ages[1], &CellValue::Number(31.0));
//!
//! // workbook.save("people.xlsx").unwrap();
//! ```

pub mod error;
pub mod prelude;

pub use error::{FileError, FileResult};

// Re-export core types
pub use lightxl_core::{
    address_to_label,
    find_tables,
    keyed_table,
    label_to_address,
    // Cell types
    CachedValue,
    CellAddress,
    CellError,
    CellRange,
    CellValue,
    // Error types
    Error,
    // Semi-structured access
    KeyedTable,
    Line,
    Orientation,
    Result,
    SharedStringTable,
    SheetKey,
    SheetMut,
    StructuredOptions,
    TableBlock,
    // Main types
    Workbook,
    Worksheet,
    // Constants
    MAX_COLS,
    MAX_ROWS,
    MAX_SHEET_NAME_LEN,
};

// Re-export I/O types
pub use lightxl_xlsx::{
    Compression, FileSink, Package, ReadOptions, WriteOptions, XlsxDocument, XlsxError, XlsxReader,
    XlsxWriter,
};

/// A workbook together with the file it was read from
pub type Document = XlsxDocument;

use std::path::Path;

/// Extension trait for Workbook to add file I/O
pub trait WorkbookExt: Sized {
    /// Open a workbook from a file
    fn open<P: AsRef<Path>>(path: P) -> FileResult<Self>;

    /// Open a workbook from a file, reading only what `options` asks for
    fn open_with<P: AsRef<Path>>(path: P, options: &ReadOptions) -> FileResult<Self>;

    /// Save the workbook to a file
    ///
    /// If the file already exists the workbook is merged into it: sheets are
    /// matched by name and every part this library does not model is kept.
    fn save<P: AsRef<Path>>(&self, path: P) -> FileResult<()>;
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> FileResult<Workbook> {
        Self::open_with(path, &ReadOptions::default())
    }

    fn open_with<P: AsRef<Path>>(path: P, options: &ReadOptions) -> FileResult<Workbook> {
        let path = path.as_ref();
        check_path(path, true)?;
        Ok(XlsxDocument::open_with(path, options)?.into_workbook())
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> FileResult<()> {
        let path = path.as_ref();
        check_path(path, false)?;

        if path.is_file() {
            log::debug!("merging into existing {}", path.display());
            let source = XlsxDocument::open(path)?;
            let sink = FileSink::create(path, &WriteOptions::default())?;
            XlsxWriter::write_merged(self, &source, sink)?;
        } else {
            XlsxWriter::write_file(self, path)?;
        }
        Ok(())
    }
}

/// Check a path names an Excel workbook, and that it exists when reading
pub fn check_path(path: &Path, must_exist: bool) -> FileResult<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => {}
        _ => return Err(FileError::UnsupportedFormat(path.to_path_buf())),
    }
    if must_exist && !path.is_file() {
        return Err(FileError::NotFound(path.to_path_buf()));
    }
    Ok(())
}
