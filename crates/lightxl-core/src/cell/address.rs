//! Cell address and range types
//!
//! Addresses are 1-based on both axes, matching the labels users see:
//! `A1` is `(row 1, col 1)`. Column letters use bijective base-26 (there is
//! no zero digit), so `Z` is followed by `AA`, `AZ` by `BA` and `ZZ` by `AAA`.

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// Convert a label such as `"AA12"` into a 1-based `(row, col)` pair.
///
/// Lowercase letters are accepted and normalized. Anything else that is not
/// `LETTERS DIGITS` (whitespace, `$`, a leading zero, a sign) is rejected.
pub fn label_to_address(label: &str) -> Result<(u32, u16)> {
    let addr = CellAddress::parse(label)?;
    Ok((addr.row, addr.col))
}

/// Convert a 1-based `(row, col)` pair into its label.
pub fn address_to_label(row: u32, col: u16) -> Result<String> {
    Ok(CellAddress::new(row, col)?.to_label())
}

/// A cell address (e.g., "A1")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellAddress {
    /// Row number, 1-based
    pub row: u32,
    /// Column number, 1-based (A=1, XFD=16384)
    pub col: u16,
}

impl CellAddress {
    /// Create an address, checking it lies inside the sheet bounds
    pub fn new(row: u32, col: u16) -> Result<Self> {
        check_bounds(row, col)?;
        Ok(Self { row, col })
    }

    /// Parse an address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use lightxl_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("B3").unwrap();
    /// assert_eq!((addr.row, addr.col), (3, 2));
    ///
    /// let addr = CellAddress::parse("aa1").unwrap();
    /// assert_eq!(addr.col, 27);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::address("empty address"));
        }

        let bytes = s.as_bytes();
        let split = bytes
            .iter()
            .position(|b| !b.is_ascii_alphabetic())
            .unwrap_or(bytes.len());

        if split == 0 {
            return Err(Error::address(format!("no column letters in '{}'", s)));
        }

        let col = Self::letters_to_column(&s[..split])?;

        let digits = &s[split..];
        if digits.is_empty() {
            return Err(Error::address(format!("no row number in '{}'", s)));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::address(format!("invalid row number in '{}'", s)));
        }
        if digits.starts_with('0') {
            return Err(Error::address(format!(
                "row number must be >= 1 without leading zeros in '{}'",
                s
            )));
        }

        let row: u32 = digits
            .parse()
            .map_err(|_| Error::address(format!("row number out of range in '{}'", s)))?;

        Self::new(row, col)
    }

    /// Convert a 1-based column number to letters (1 = A, 26 = Z, 27 = AA)
    ///
    /// Column 0 has no label and yields an empty string.
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::with_capacity(3);
        let mut n = col as u32;

        while n > 0 {
            n -= 1;
            letters.push(b'A' + (n % 26) as u8);
            n /= 26;
        }

        letters.iter().rev().map(|&b| b as char).collect()
    }

    /// Convert column letters to a 1-based column number (A = 1, AA = 27)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::address("empty column letters"));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::address(format!("invalid column letter '{}'", c)));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS as u32 {
                return Err(Error::address(format!(
                    "column '{}' exceeds the maximum of {}",
                    letters, MAX_COLS
                )));
            }
        }

        Ok(col as u16)
    }

    /// Format as an A1-style label
    pub fn to_label(&self) -> String {
        format!("{}{}", Self::column_to_letters(self.col), self.row)
    }

    /// Create a range from this address to another
    pub fn to(&self, other: CellAddress) -> CellRange {
        CellRange::new(*self, other)
    }

    /// Check the address lies inside the sheet bounds
    ///
    /// Addresses built field by field have not been through [`CellAddress::new`].
    pub fn validate(&self) -> Result<()> {
        check_bounds(self.row, self.col)
    }
}

fn check_bounds(row: u32, col: u16) -> Result<()> {
    if row == 0 || row > MAX_ROWS {
        return Err(Error::address(format!(
            "row {} outside 1..={}",
            row, MAX_ROWS
        )));
    }
    if col == 0 || col > MAX_COLS {
        return Err(Error::address(format!(
            "column {} outside 1..={}",
            col, MAX_COLS
        )));
    }
    Ok(())
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_to_letters(self.col), self.row)
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular range of cells (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRange {
    /// Top-left address
    pub start: CellAddress,
    /// Bottom-right address
    pub end: CellAddress,
}

impl CellRange {
    /// Create a new range; corners are normalized to top-left / bottom-right
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress {
                row: a.row.min(b.row),
                col: a.col.min(b.col),
            },
            end: CellAddress {
                row: a.row.max(b.row),
                col: a.col.max(b.col),
            },
        }
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse a range from `A1:B10` notation (a bare `A1` is a single cell)
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((a, b)) => {
                let start = CellAddress::parse(a)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                let end = CellAddress::parse(b)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                Ok(Self::new(start, end))
            }
            None => CellAddress::parse(s)
                .map(Self::single)
                .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e))),
        }
    }

    /// Check if a cell is within this range
    pub fn contains(&self, addr: &CellAddress) -> bool {
        addr.row >= self.start.row
            && addr.row <= self.end.row
            && addr.col >= self.start.col
            && addr.col <= self.end.col
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && self.end.row >= other.start.row
            && self.start.col <= other.end.col
            && self.end.col >= other.start.col
    }

    /// Check both corners lie inside the sheet and are ordered top-left to bottom-right
    pub fn validate(&self) -> Result<()> {
        self.start
            .validate()
            .and_then(|_| self.end.validate())
            .map_err(|e| Error::InvalidRange(format!("'{}': {}", self, e)))?;
        if self.start.row > self.end.row || self.start.col > self.end.col {
            return Err(Error::InvalidRange(format!(
                "'{}': corners are not top-left and bottom-right",
                self
            )));
        }
        Ok(())
    }

    /// Number of rows in the range (0 for a range whose corners are swapped)
    pub fn row_count(&self) -> u32 {
        self.end.row.saturating_add(1).saturating_sub(self.start.row)
    }

    /// Number of columns in the range (0 for a range whose corners are swapped)
    pub fn col_count(&self) -> u16 {
        self.end.col.saturating_add(1).saturating_sub(self.start.col)
    }

    /// Iterate over all cell addresses in the range (row by row)
    pub fn cells(&self) -> CellRangeIterator {
        CellRangeIterator {
            range: *self,
            row: self.start.row,
            col: self.start.col,
        }
    }

    /// Format as an `A1:B10` string (single-cell ranges print as `A1`)
    pub fn to_label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iterator over cells in a range
#[derive(Debug, Clone)]
pub struct CellRangeIterator {
    range: CellRange,
    row: u32,
    col: u16,
}

impl Iterator for CellRangeIterator {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row > self.range.end.row || self.range.start.col > self.range.end.col {
            return None;
        }

        let addr = CellAddress {
            row: self.row,
            col: self.col,
        };

        if self.col == self.range.end.col {
            self.col = self.range.start.col;
            self.row += 1;
        } else {
            self.col += 1;
        }

        Some(addr)
    }
}
