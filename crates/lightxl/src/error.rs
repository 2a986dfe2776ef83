//! Errors of the file-level API

use std::path::PathBuf;

use thiserror::Error;

/// Result type for opening and saving workbooks
pub type FileResult<T> = std::result::Result<T, FileError>;

/// Errors that can occur while opening or saving a workbook file
#[derive(Debug, Error)]
pub enum FileError {
    /// The path does not name an `.xlsx` or `.xlsm` file
    #[error("Unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The file to open does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Reading or writing the archive failed
    #[error(transparent)]
    Xlsx(#[from] lightxl_xlsx::XlsxError),

    /// Core error
    #[error(transparent)]
    Core(#[from] lightxl_core::Error),
}
