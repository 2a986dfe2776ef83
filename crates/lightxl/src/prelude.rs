//! Prelude module - common imports for lightxl users
//!
//! ```rust
//! use lightxl::prelude::*;
//! ```

pub use crate::{
    // Cell types
    CachedValue,
    CellAddress,
    CellError,
    CellRange,
    CellValue,
    Document,
    // Error types
    Error,
    FileError,
    // Semi-structured access
    KeyedTable,
    Orientation,
    ReadOptions,
    Result,
    StructuredOptions,
    // Main types
    Workbook,
    // Extension traits
    WorkbookExt,
    Worksheet,
    WriteOptions,
    // I/O types
    XlsxReader,
    XlsxWriter,
};
