//! Key-based views over a worksheet
//!
//! [`keyed_table`] reads a sheet as records keyed by the text of one row or
//! column. [`find_tables`] locates blocks anchored by a tag cell, with
//! column keys to the right of the tag and row keys below it.
//!
//! ## Example
//!
//! ```rust
//! use lightxl_core::structured::{keyed_table, Orientation, StructuredOptions};
//! use lightxl_core::Worksheet;
//!
//! let mut ws = Worksheet::new("Config");
//! ws.set_address("A1", "host").unwrap();
//! ws.set_address("B1", "localhost").unwrap();
//! ws.set_address("A2", "port").unwrap();
//! ws.set_address("B2", 8080).unwrap();
//!
//! let table = keyed_table(&ws, &StructuredOptions::default()).unwrap();
//! assert_eq!(table.get("port").unwrap()[0].as_number(), Some(8080.0));
//! ```

use indexmap::IndexMap;

use crate::cell::{CellAddress, CellValue};
use crate::error::{Error, Result};
use crate::worksheet::Worksheet;

/// Which lines of the sheet are records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Each row is a record, keyed by its cell in the key column
    #[default]
    Rows,
    /// Each column is a record, keyed by its cell in the key row
    Columns,
}

/// Options for [`keyed_table`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredOptions {
    /// Record orientation
    pub orientation: Orientation,
    /// 1-based index of the column (for rows) or row (for columns) holding keys
    pub key_line: u32,
    /// Fail on duplicate or empty keys instead of skipping them
    pub strict: bool,
}

impl Default for StructuredOptions {
    fn default() -> Self {
        Self {
            orientation: Orientation::Rows,
            key_line: 1,
            strict: false,
        }
    }
}

impl StructuredOptions {
    /// Records are columns keyed by the cells of `row`
    pub fn columns(row: u32) -> Self {
        Self {
            orientation: Orientation::Columns,
            key_line: row,
            ..Self::default()
        }
    }

    /// Records are rows keyed by the cells of `col`
    pub fn rows(col: u16) -> Self {
        Self {
            orientation: Orientation::Rows,
            key_line: col as u32,
            ..Self::default()
        }
    }

    /// Enable strict key checking
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

/// Records keyed by text, in the order their keys were found
///
/// When a key repeats, the first record wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyedTable {
    /// Key -> values after the key cell, up to the sheet bound
    pub entries: IndexMap<String, Vec<CellValue>>,
    /// Line numbers skipped because their key cell was empty or repeated
    pub skipped: Vec<u32>,
}

impl KeyedTable {
    /// Values recorded under `key`
    pub fn get(&self, key: &str) -> Option<&[CellValue]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Keys in scan order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no records
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read a worksheet as records keyed by one row or column
///
/// Every line from 1 to the sheet bound is a candidate record. Its key is the
/// text of its cell on the key line; its values are the cells after that,
/// up to `max_col` (rows) or `max_row` (columns).
pub fn keyed_table(ws: &Worksheet, options: &StructuredOptions) -> Result<KeyedTable> {
    let (lines, key_line_bound) = match options.orientation {
        Orientation::Rows => (ws.max_row(), crate::MAX_COLS as u32),
        Orientation::Columns => (ws.max_col() as u32, crate::MAX_ROWS),
    };
    if options.key_line == 0 || options.key_line > key_line_bound {
        return Err(Error::InvalidAddress(format!(
            "key line {} outside 1..={}",
            options.key_line, key_line_bound
        )));
    }

    let mut table = KeyedTable::default();
    for line in 1..=lines {
        let record: Vec<CellValue> = match options.orientation {
            Orientation::Rows => ws.row(line).cloned().collect(),
            Orientation::Columns => ws.col(line as u16).cloned().collect(),
        };
        let key_pos = options.key_line as usize - 1;
        let key = record.get(key_pos).map(CellValue::to_string).unwrap_or_default();

        if key.is_empty() {
            if options.strict {
                return Err(Error::EmptyKey(line));
            }
            log::debug!("skipping line {} with an empty key", line);
            table.skipped.push(line);
            continue;
        }
        if table.entries.contains_key(&key) {
            if options.strict {
                return Err(Error::DuplicateKey { key, line });
            }
            log::debug!("skipping line {}: key '{}' already taken", line, key);
            table.skipped.push(line);
            continue;
        }

        let values = record.into_iter().skip(key_pos + 1).collect();
        table.entries.insert(key, values);
    }
    Ok(table)
}

/// A block of data anchored by a tag cell
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    /// Address of the tag cell
    pub anchor: CellAddress,
    /// Keys below the anchor, one per data row
    pub key_rows: Vec<String>,
    /// Keys right of the anchor, one per data column
    pub key_cols: Vec<String>,
    /// `data[i][j]` sits at row key `i`, column key `j`
    pub data: Vec<Vec<CellValue>>,
}

impl TableBlock {
    /// Value at the intersection of a row key and a column key
    pub fn get(&self, row_key: &str, col_key: &str) -> Option<&CellValue> {
        let i = self.key_rows.iter().position(|k| k == row_key)?;
        let j = self.key_cols.iter().position(|k| k == col_key)?;
        self.data.get(i)?.get(j)
    }
}

/// Find every block anchored by a cell whose text equals `tag`
///
/// Blocks are returned in row-major anchor order.
pub fn find_tables(ws: &Worksheet, tag: &str) -> Vec<TableBlock> {
    ws.iter_cells()
        .filter(|(_, value)| !value.is_empty() && value.to_string() == tag)
        .map(|(anchor, _)| read_block(ws, anchor))
        .collect()
}

fn read_block(ws: &Worksheet, anchor: CellAddress) -> TableBlock {
    let key_cols: Vec<String> = (anchor.col as u32 + 1..=ws.max_col() as u32)
        .map(|col| ws.get(CellAddress { row: anchor.row, col: col as u16 }))
        .take_while(|v| !v.is_empty())
        .map(CellValue::to_string)
        .collect();
    let key_rows: Vec<String> = (anchor.row + 1..=ws.max_row())
        .map(|row| ws.get(CellAddress { row, col: anchor.col }))
        .take_while(|v| !v.is_empty())
        .map(CellValue::to_string)
        .collect();

    let data = (0..key_rows.len() as u32)
        .map(|i| {
            (0..key_cols.len() as u16)
                .map(|j| {
                    ws.get(CellAddress {
                        row: anchor.row + 1 + i,
                        col: anchor.col + 1 + j,
                    })
                    .clone()
                })
                .collect()
        })
        .collect();

    TableBlock {
        anchor,
        key_rows,
        key_cols,
        data,
    }
}
