//! Worksheet type

use std::collections::BTreeMap;

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::error::{Error, Result};
use crate::workbook::SheetKey;

static EMPTY: CellValue = CellValue::Empty;

/// A worksheet (single sheet in a workbook)
///
/// Cells are stored sparsely: an address that was never set (or was cleared)
/// reads back as [`CellValue::Empty`]. `max_row` / `max_col` track the extent
/// of the populated cells; a single `set` only ever widens them, a bulk
/// [`Worksheet::load`] recomputes them from scratch.
#[derive(Debug, Clone, PartialEq)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Identity within the owning workbook, stable across renames
    key: SheetKey,
    /// Row number -> (column number -> value)
    rows: BTreeMap<u32, BTreeMap<u16, CellValue>>,
    max_row: u32,
    max_col: u16,
    /// Merged regions, in the order they were added
    merged: Vec<CellRange>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            key: SheetKey::UNASSIGNED,
            rows: BTreeMap::new(),
            max_row: 0,
            max_col: 0,
            merged: Vec::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// Identity of this sheet within its workbook
    pub fn key(&self) -> SheetKey {
        self.key
    }

    pub(crate) fn set_key(&mut self, key: SheetKey) {
        self.key = key;
    }

    // === Cell Access ===

    /// Get a cell value by address
    pub fn get(&self, addr: CellAddress) -> &CellValue {
        self.rows
            .get(&addr.row)
            .and_then(|r| r.get(&addr.col))
            .unwrap_or(&EMPTY)
    }

    /// Get a cell value by 1-based row and column
    pub fn index(&self, row: u32, col: u16) -> Result<&CellValue> {
        Ok(self.get(CellAddress::new(row, col)?))
    }

    /// Get a cell value by label (e.g., "B3")
    pub fn address(&self, label: &str) -> Result<&CellValue> {
        Ok(self.get(CellAddress::parse(label)?))
    }

    // === Cell Modification ===

    /// Set a cell value
    ///
    /// Setting [`CellValue::Empty`] clears the cell. Bounds widen to cover a
    /// newly populated address and never shrink here. An address outside the
    /// sheet is rejected with [`Error::InvalidAddress`].
    pub fn set<V: Into<CellValue>>(&mut self, addr: CellAddress, value: V) -> Result<()> {
        addr.validate()?;
        self.insert(addr, value.into());
        Ok(())
    }

    fn insert(&mut self, addr: CellAddress, value: CellValue) {
        if value.is_empty() {
            self.remove(addr);
            return;
        }
        self.max_row = self.max_row.max(addr.row);
        self.max_col = self.max_col.max(addr.col);
        self.rows.entry(addr.row).or_default().insert(addr.col, value);
    }

    /// Set a cell value by 1-based row and column
    pub fn set_index<V: Into<CellValue>>(&mut self, row: u32, col: u16, value: V) -> Result<()> {
        let addr = CellAddress::new(row, col)?;
        self.set(addr, value)
    }

    /// Set a cell value by label
    pub fn set_address<V: Into<CellValue>>(&mut self, label: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(label)?;
        self.set(addr, value)
    }

    /// Clear a cell by label
    pub fn clear(&mut self, label: &str) -> Result<()> {
        let addr = CellAddress::parse(label)?;
        self.remove(addr);
        Ok(())
    }

    fn remove(&mut self, addr: CellAddress) {
        if let Some(row) = self.rows.get_mut(&addr.row) {
            row.remove(&addr.col);
            if row.is_empty() {
                self.rows.remove(&addr.row);
            }
        }
    }

    /// Set the same value for every cell in a range
    ///
    /// The range is checked first, so a bad range changes nothing.
    pub fn update_range<V: Into<CellValue>>(&mut self, range: &CellRange, value: V) -> Result<()> {
        range.validate()?;
        let value = value.into();
        for addr in range.cells() {
            self.insert(addr, value.clone());
        }
        Ok(())
    }

    /// Replace the whole content of the sheet with `cells`
    ///
    /// Bounds are recomputed from the loaded cells, so they can shrink.
    /// Merged regions are kept and re-applied on top of the new data. Every
    /// address is checked before anything is replaced.
    pub fn load<I>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = (CellAddress, CellValue)>,
    {
        let cells: Vec<_> = cells.into_iter().collect();
        for (addr, _) in &cells {
            addr.validate()?;
        }

        self.rows.clear();
        self.max_row = 0;
        self.max_col = 0;
        for (addr, value) in cells {
            self.insert(addr, value);
        }
        for range in self.merged.clone() {
            self.propagate_merge(&range);
        }
        Ok(())
    }

    // === Bounds ===

    /// Highest populated row number (0 if empty)
    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    /// Highest populated column number (0 if empty)
    pub fn max_col(&self) -> u16 {
        self.max_col
    }

    /// `(max_row, max_col)`
    pub fn size(&self) -> (u32, u16) {
        (self.max_row, self.max_col)
    }

    /// The populated extent as a range from A1, if any
    pub fn used_range(&self) -> Option<CellRange> {
        if self.max_row == 0 || self.max_col == 0 {
            return None;
        }
        let end = CellAddress::new(self.max_row, self.max_col).ok()?;
        Some(CellRange::new(CellAddress { row: 1, col: 1 }, end))
    }

    // === Rows / Columns ===

    /// Values of row `n` for columns `1..=max_col`
    pub fn row(&self, n: u32) -> Line<'_> {
        Line::new(self, Axis::Row, n, self.max_col as u32)
    }

    /// Values of column `n` for rows `1..=max_row`
    pub fn col(&self, n: u16) -> Line<'_> {
        Line::new(self, Axis::Col, n as u32, self.max_row)
    }

    /// Every row from 1 to `max_row`
    pub fn rows(&self) -> impl Iterator<Item = Line<'_>> + '_ {
        (1..=self.max_row).map(move |n| self.row(n))
    }

    /// Every column from 1 to `max_col`
    pub fn cols(&self) -> impl Iterator<Item = Line<'_>> + '_ {
        (1..=self.max_col).map(move |n| self.col(n))
    }

    /// Number of the first row whose column-A cell reads `key`
    pub fn key_row_index(&self, key: &str) -> Result<u32> {
        self.col(1)
            .position(|v| matches_key(v, key))
            .map(|i| i as u32 + 1)
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    /// Number of the first column whose row-1 cell reads `key`
    pub fn key_col_index(&self, key: &str) -> Result<u16> {
        self.row(1)
            .position(|v| matches_key(v, key))
            .map(|i| i as u16 + 1)
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    /// The row whose column-A header reads `key` (first match wins)
    pub fn key_row(&self, key: &str) -> Result<Line<'_>> {
        Ok(self.row(self.key_row_index(key)?))
    }

    /// The column whose row-1 header reads `key` (first match wins)
    ///
    /// ```
    /// use lightxl_core::Worksheet;
    ///
    /// let mut ws = Worksheet::new("People");
    /// ws.set_address("A1", "ID").unwrap();
    /// ws.set_address("B1", "Name").unwrap();
    /// ws.set_address("B2", "Ada").unwrap();
    ///
    /// let name: Vec<String> = ws.key_col("Name").unwrap().map(|v| v.to_string()).collect();
    /// assert_eq!(name, ["Name", "Ada"]);
    /// ```
    pub fn key_col(&self, key: &str) -> Result<Line<'_>> {
        Ok(self.col(self.key_col_index(key)?))
    }

    /// Values of a rectangular range, row by row
    pub fn range(&self, range: &CellRange) -> Vec<Vec<CellValue>> {
        (range.start.row..=range.end.row)
            .map(|row| {
                (range.start.col..=range.end.col)
                    .map(|col| self.get(CellAddress { row, col }).clone())
                    .collect()
            })
            .collect()
    }

    // === Merged Cells ===

    /// Merged regions
    pub fn merged_ranges(&self) -> &[CellRange] {
        &self.merged
    }

    /// Record a merged region and copy its top-left value over the rest of it
    ///
    /// A single-cell range is not a merge and is ignored. Overlapping an
    /// existing region is rejected and leaves the sheet unchanged.
    pub fn add_merge(&mut self, range: CellRange) -> Result<()> {
        range.validate()?;
        if range.start == range.end {
            return Ok(());
        }
        if let Some(existing) = self.merged.iter().find(|m| m.overlaps(&range)) {
            return Err(Error::InvalidRange(format!(
                "{} overlaps merged region {}",
                range, existing
            )));
        }
        self.merged.push(range);
        self.propagate_merge(&range);
        Ok(())
    }

    /// Forget a merged region; cell values are left as they are
    pub fn remove_merge(&mut self, range: &CellRange) -> bool {
        let before = self.merged.len();
        self.merged.retain(|m| m != range);
        before != self.merged.len()
    }

    fn propagate_merge(&mut self, range: &CellRange) {
        let value = self.get(range.start).clone();
        for addr in range.cells().skip(1) {
            self.insert(addr, value.clone());
        }
    }

    // === Iteration ===

    /// Number of populated cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Check if no cell is populated
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Populated cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (CellAddress, &CellValue)> {
        self.rows.iter().flat_map(|(&row, cols)| {
            cols.iter()
                .map(move |(&col, value)| (CellAddress { row, col }, value))
        })
    }
}

fn matches_key(value: &CellValue, key: &str) -> bool {
    match value {
        CellValue::Empty => false,
        CellValue::Text(s) => s == key,
        other => other.to_string() == key,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Row,
    Col,
}

/// A lazily read row or column of a worksheet
///
/// Cloning restarts nothing; ask the worksheet for the line again to read
/// it from the start.
#[derive(Debug, Clone)]
pub struct Line<'a> {
    sheet: &'a Worksheet,
    axis: Axis,
    fixed: u32,
    next: u32,
    end: u32,
}

impl<'a> Line<'a> {
    fn new(sheet: &'a Worksheet, axis: Axis, fixed: u32, end: u32) -> Self {
        Self {
            sheet,
            axis,
            fixed,
            next: 1,
            end,
        }
    }

    /// Collect the remaining values
    pub fn to_vec(&self) -> Vec<CellValue> {
        self.clone().cloned().collect()
    }
}

impl<'a> Iterator for Line<'a> {
    type Item = &'a CellValue;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.end {
            return None;
        }
        let (row, col) = match self.axis {
            Axis::Row => (self.fixed, self.next as u16),
            Axis::Col => (self.next, self.fixed as u16),
        };
        self.next += 1;
        Some(self.sheet.get(CellAddress { row, col }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end + 1).saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Line<'_> {}
