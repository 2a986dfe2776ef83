//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellAddress`] / [`CellRange`] - a cell's location (e.g., "A1") and rectangles of cells
//! - [`CellValue`] - the value stored in a cell
//! - [`SharedStringTable`] - the text table cells may reference by index

mod address;
mod value;

pub use address::{address_to_label, label_to_address, CellAddress, CellRange, CellRangeIterator};
pub use value::{CachedValue, CellError, CellValue, SharedStringTable, TypeHint};
