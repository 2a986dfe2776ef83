//! Error types for lightxl-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in lightxl-core
///
/// Every mutating operation validates its input before touching any state,
/// so an `Err` always leaves the workbook exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed or out-of-bounds cell label or index
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Malformed range, or a merge range overlapping an existing one
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Sheet name already used in this workbook
    #[error("Sheet name already exists: {0}")]
    DuplicateSheet(String),

    /// Sheet name violates the format's naming rules
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Key-based lookup found no header cell with this text
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// A key appears more than once along a key line (strict mode only)
    #[error("Duplicate key '{key}' at line {line}")]
    DuplicateKey { key: String, line: u32 },

    /// A raw value token cannot be interpreted under its type hint
    #[error("Invalid cell token: {0}")]
    InvalidToken(String),

    /// A key cell is empty (strict mode only)
    #[error("Empty key cell at line {0}")]
    EmptyKey(u32),
}

impl Error {
    pub(crate) fn address<S: Into<String>>(msg: S) -> Self {
        Error::InvalidAddress(msg.into())
    }
}
