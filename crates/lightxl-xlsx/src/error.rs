//! XLSX error types

use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur during XLSX reading/writing
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A required part could not be tokenized
    #[error("Malformed part {part}: {reason}")]
    MalformedPart { part: String, reason: String },

    /// A mandatory part (workbook metadata, a declared sheet) is absent
    #[error("Missing required part: {0}")]
    MissingRequiredPart(String),

    /// The container declares a schema this reader does not handle
    #[error("Unsupported format: {0}")]
    UnsupportedFormatVersion(String),

    /// The archive has no part with this name
    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] lightxl_core::Error),
}

impl XlsxError {
    pub(crate) fn malformed<P: Into<String>, R: ToString>(part: P, reason: R) -> Self {
        XlsxError::MalformedPart {
            part: part.into(),
            reason: reason.to_string(),
        }
    }
}
