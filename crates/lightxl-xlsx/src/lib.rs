//! # lightxl-xlsx
//!
//! XLSX (Office Open XML) reader and writer for lightxl.
//!
//! Reading snapshots every part of the archive into a [`Package`], then
//! tokenizes the workbook, shared-string and sheet parts into a
//! [`lightxl_core::Workbook`]. Writing merges a workbook back into a package:
//! into the one it was read from ([`XlsxDocument`]), or into a minimal
//! skeleton for a new file ([`XlsxWriter`]).
//!
//! ```
//! use std::io::Cursor;
//! use lightxl_core::{CellValue, Workbook};
//! use lightxl_xlsx::{XlsxReader, XlsxWriter};
//!
//! let mut wb = Workbook::new();
//! wb.add_sheet("Sheet1").unwrap().set_address("A1", 42.0).unwrap();
//!
//! let mut buf = Cursor::new(Vec::new());
//! XlsxWriter::write(&wb, &mut buf).unwrap();
//!
//! let read = XlsxReader::read(Cursor::new(buf.into_inner())).unwrap();
//! assert_eq!(read.sheet("Sheet1").unwrap().address("A1").unwrap(), &CellValue::Number(42.0));
//! ```

pub mod archive;
pub mod document;
pub mod error;
pub mod escape;
pub mod formula;
pub mod paths;
pub mod reader;
pub mod tokenizer;
pub mod writer;

pub use archive::{Compression, FileSink, Package, PartSink, PartSource, WriteOptions, ZipSink, ZipSource};
pub use document::{SourceLayout, SourceSheet, XlsxDocument};
pub use error::{XlsxError, XlsxResult};
pub use reader::{ReadOptions, XlsxReader};
pub use writer::{SheetMatch, XlsxWriter};
