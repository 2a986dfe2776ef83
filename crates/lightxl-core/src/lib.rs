//! # lightxl-core
//!
//! Core data structures for the lightxl spreadsheet library.
//!
//! This crate provides the in-memory model, with no I/O:
//! - [`CellValue`] - Represents cell values (text, numbers, booleans, errors, formulas)
//! - [`CellAddress`] and [`CellRange`] - 1-based cell addressing and ranges
//! - [`Worksheet`] - A sparse grid of cells with tracked bounds and merged regions
//! - [`Workbook`] - The ordered collection of worksheets
//! - [`structured`] - Key-based views over a worksheet
//!
//! ## Example
//!
//! ```rust
//! use lightxl_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! workbook.add_sheet("Sheet1").unwrap();
//!
//! // Using labels
//! workbook.update_address("Sheet1", "A1", "Hello").unwrap();
//! workbook.update_address("Sheet1", "B1", 42.0).unwrap();
//!
//! // Or using row/column numbers (1-based)
//! workbook.update_index("Sheet1", 2, 1, CellValue::text("World")).unwrap();
//!
//! let sheet = workbook.sheet("Sheet1").unwrap();
//! assert_eq!(sheet.size(), (2, 2));
//! assert_eq!(sheet.index(2, 1).unwrap().as_text(), Some("World"));
//! ```

pub mod cell;
pub mod error;
pub mod structured;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use cell::{
    address_to_label, label_to_address, CachedValue, CellAddress, CellError, CellRange,
    CellValue, SharedStringTable, TypeHint,
};
pub use error::{Error, Result};
pub use structured::{find_tables, keyed_table, KeyedTable, Orientation, StructuredOptions, TableBlock};
pub use workbook::{validate_sheet_name, SheetKey, SheetMut, Workbook};
pub use worksheet::{Line, Worksheet};

/// Maximum number of rows in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
