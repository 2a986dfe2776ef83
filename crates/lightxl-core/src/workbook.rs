//! Workbook type - the ordered collection of worksheets

use std::fmt;
use std::ops::Deref;

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// Identity of a worksheet within one [`Workbook`]
///
/// Keys are handed out when a sheet joins a workbook and never reused by that
/// workbook. They survive renames and moves, which lets a writer match a
/// sheet back to the part it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SheetKey(u32);

impl SheetKey {
    /// Key of a worksheet that does not belong to a workbook yet
    pub const UNASSIGNED: SheetKey = SheetKey(0);

    /// Raw key value
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SheetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A workbook (spreadsheet document)
///
/// Worksheets keep insertion order unless moved explicitly. Lookup by name is
/// exact and case-sensitive. Every mutation checks its arguments first, so a
/// failed call leaves the workbook unchanged.
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    next_key: u32,
}

impl Workbook {
    /// Create a new workbook with no worksheets
    pub fn new() -> Self {
        Self {
            worksheets: Vec::new(),
            next_key: 1,
        }
    }

    /// Get the number of worksheets
    pub fn len(&self) -> usize {
        self.worksheets.len()
    }

    /// Check if the workbook has no worksheets
    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    // ==================== Lookup ====================

    /// Get a worksheet by name
    pub fn sheet(&self, name: &str) -> Result<&Worksheet> {
        self.worksheets
            .iter()
            .find(|ws| ws.name() == name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    /// Get a mutable worksheet by name
    pub fn sheet_mut(&mut self, name: &str) -> Result<SheetMut<'_>> {
        let index = self.index_of(name)?;
        Ok(SheetMut::new(&mut self.worksheets[index]))
    }

    /// Get a worksheet by its key
    pub fn sheet_by_key(&self, key: SheetKey) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.key() == key)
    }

    /// Get a worksheet by position
    pub fn sheet_at(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get the position of a worksheet by name
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.name() == name)
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(Worksheet::name).collect()
    }

    /// Iterate over all worksheets
    pub fn sheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Iterate over all worksheets mutably
    pub fn sheets_mut(&mut self) -> impl Iterator<Item = SheetMut<'_>> {
        self.worksheets.iter_mut().map(SheetMut::new)
    }

    // ==================== Sheet Management ====================

    /// Append a new empty worksheet
    ///
    /// # Example
    /// ```
    /// use lightxl_core::Workbook;
    ///
    /// let mut wb = Workbook::new();
    /// wb.add_sheet("Data").unwrap();
    /// assert!(wb.add_sheet("Data").is_err());
    /// assert_eq!(wb.sheet_names(), ["Data"]);
    /// ```
    pub fn add_sheet(&mut self, name: &str) -> Result<SheetMut<'_>> {
        self.add_sheet_with(Worksheet::new(name))
    }

    /// Append an existing worksheet; it receives a fresh key
    pub fn add_sheet_with(&mut self, worksheet: Worksheet) -> Result<SheetMut<'_>> {
        self.validate_new_name(worksheet.name(), None)?;
        Ok(self.push(worksheet))
    }

    /// Append a worksheet whose name comes from an existing file
    ///
    /// Other writers accept names the naming rules reject (longer than 31
    /// characters, say). Such a name is kept as declared, with a warning;
    /// it must still be unique.
    pub fn add_sheet_as_declared(&mut self, worksheet: Worksheet) -> Result<SheetMut<'_>> {
        if let Err(e) = validate_sheet_name(worksheet.name()) {
            log::warn!("keeping sheet name as declared: {}", e);
        }
        if self.sheet_index(worksheet.name()).is_some() {
            return Err(Error::DuplicateSheet(worksheet.name().to_string()));
        }
        Ok(self.push(worksheet))
    }

    fn push(&mut self, mut worksheet: Worksheet) -> SheetMut<'_> {
        worksheet.set_key(SheetKey(self.next_key));
        self.next_key += 1;
        self.worksheets.push(worksheet);
        let last = self.worksheets.len() - 1;
        SheetMut::new(&mut self.worksheets[last])
    }

    /// Remove a worksheet by name and return it
    pub fn remove_sheet(&mut self, name: &str) -> Result<Worksheet> {
        let index = self.index_of(name)?;
        Ok(self.worksheets.remove(index))
    }

    /// Rename a worksheet in place
    pub fn rename_sheet(&mut self, old: &str, new: &str) -> Result<()> {
        let index = self.index_of(old)?;
        self.validate_new_name(new, Some(index))?;
        self.worksheets[index].set_name(new);
        Ok(())
    }

    /// Move a worksheet to a new position
    ///
    /// Positions past the end move the sheet to the end.
    pub fn move_sheet(&mut self, name: &str, to: usize) -> Result<()> {
        let from = self.index_of(name)?;
        let worksheet = self.worksheets.remove(from);
        let to = to.min(self.worksheets.len());
        self.worksheets.insert(to, worksheet);
        Ok(())
    }

    // ==================== Cell Entry Points ====================

    /// Set a cell by 1-based row and column
    pub fn update_index<V: Into<CellValue>>(
        &mut self,
        sheet: &str,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        let addr = CellAddress::new(row, col)?;
        self.sheet_mut(sheet)?.set(addr, value)
    }

    /// Set a cell by label
    pub fn update_address<V: Into<CellValue>>(
        &mut self,
        sheet: &str,
        label: &str,
        value: V,
    ) -> Result<()> {
        let addr = CellAddress::parse(label)?;
        self.sheet_mut(sheet)?.set(addr, value)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.sheet_index(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    /// Check a name is valid and unused, optionally ignoring one sheet
    fn validate_new_name(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        validate_sheet_name(name)?;
        let taken = self
            .worksheets
            .iter()
            .enumerate()
            .any(|(i, ws)| Some(i) != exclude_index && ws.name() == name);
        if taken {
            return Err(Error::DuplicateSheet(name.into()));
        }
        Ok(())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable access to one worksheet of a [`Workbook`]
///
/// Cells and merged regions change through the handle; the sheet's name and
/// key stay under the workbook's control, so a sheet cannot be swapped out
/// from under it. Reading goes through `Deref<Target = Worksheet>`.
#[derive(Debug)]
pub struct SheetMut<'a> {
    sheet: &'a mut Worksheet,
}

impl<'a> SheetMut<'a> {
    fn new(sheet: &'a mut Worksheet) -> Self {
        Self { sheet }
    }

    /// See [`Worksheet::set`]
    pub fn set<V: Into<CellValue>>(&mut self, addr: CellAddress, value: V) -> Result<()> {
        self.sheet.set(addr, value)
    }

    /// See [`Worksheet::set_index`]
    pub fn set_index<V: Into<CellValue>>(&mut self, row: u32, col: u16, value: V) -> Result<()> {
        self.sheet.set_index(row, col, value)
    }

    /// See [`Worksheet::set_address`]
    pub fn set_address<V: Into<CellValue>>(&mut self, label: &str, value: V) -> Result<()> {
        self.sheet.set_address(label, value)
    }

    /// See [`Worksheet::clear`]
    pub fn clear(&mut self, label: &str) -> Result<()> {
        self.sheet.clear(label)
    }

    /// See [`Worksheet::update_range`]
    pub fn update_range<V: Into<CellValue>>(&mut self, range: &CellRange, value: V) -> Result<()> {
        self.sheet.update_range(range, value)
    }

    /// See [`Worksheet::load`]
    pub fn load<I>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = (CellAddress, CellValue)>,
    {
        self.sheet.load(cells)
    }

    /// See [`Worksheet::add_merge`]
    pub fn add_merge(&mut self, range: CellRange) -> Result<()> {
        self.sheet.add_merge(range)
    }

    /// See [`Worksheet::remove_merge`]
    pub fn remove_merge(&mut self, range: &CellRange) -> bool {
        self.sheet.remove_merge(range)
    }
}

impl Deref for SheetMut<'_> {
    type Target = Worksheet;

    fn deref(&self) -> &Worksheet {
        &*self.sheet
    }
}

/// Check a sheet name against the format's naming rules
pub fn validate_sheet_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(Error::InvalidSheetName(format!(
            "'{}' is too long (max {} characters)",
            name, MAX_SHEET_NAME_LEN
        )));
    }

    const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
    if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
        return Err(Error::InvalidSheetName(format!(
            "'{}' cannot contain '{}'",
            name, c
        )));
    }

    Ok(())
}
