//! Cell value types

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

/// Represents the value stored in a cell
///
/// There is no implicit coercion between variants: a number is never read
/// back as text and an error code is never read back as a string. Callers
/// branch on the variant, or ask for [`CellValue::to_string`] explicitly.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Text value, whitespace kept exactly as stored
    Text(String),

    /// Numeric value (all numbers stored as f64, including dates)
    Number(f64),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Error value (#VALUE!, #REF!, etc.)
    Error(CellError),

    /// Formula with its last cached result
    ///
    /// Formulas are never evaluated; `cached` is what the file recorded.
    Formula {
        /// Formula text without the leading `=`
        formula: String,
        /// Cached result
        cached: CachedValue,
    },
}

impl CellValue {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(s.into())
    }

    /// Create a formula value with a cached result
    ///
    /// A leading `=` is stripped, so `"=SUM(A1:A2)"` and `"SUM(A1:A2)"` are
    /// the same formula.
    pub fn formula<S: AsRef<str>>(formula: S, cached: CachedValue) -> Self {
        let formula = formula.as_ref();
        CellValue::Formula {
            formula: formula.strip_prefix('=').unwrap_or(formula).to_string(),
            cached,
        }
    }

    /// Interpret a raw value token under the type hint found on its cell.
    ///
    /// Shared-string tokens are resolved against `strings`. An empty numeric
    /// token is an empty cell. Numeric tokens that do not parse and error
    /// tokens outside the known vocabulary are kept as text.
    pub fn from_token(hint: TypeHint, raw: &str, strings: &SharedStringTable) -> Result<Self> {
        match hint {
            TypeHint::Number => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Ok(CellValue::Empty);
                }
                match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok(CellValue::Number(n)),
                    _ => {
                        log::warn!("numeric token {:?} is not a number, keeping it as text", raw);
                        Ok(CellValue::Text(raw.to_string()))
                    }
                }
            }
            TypeHint::SharedString => {
                let idx: usize = raw.trim().parse().map_err(|_| {
                    Error::InvalidToken(format!("shared string index {:?} is not a number", raw))
                })?;
                let s = strings.get(idx).ok_or_else(|| {
                    Error::InvalidToken(format!(
                        "shared string index {} out of bounds (table has {})",
                        idx,
                        strings.len()
                    ))
                })?;
                Ok(CellValue::Text(s.to_string()))
            }
            TypeHint::Boolean => parse_bool(raw)
                .map(CellValue::Boolean)
                .ok_or_else(|| Error::InvalidToken(format!("{:?} is not a boolean", raw))),
            TypeHint::Error => match CellError::parse(raw.trim()) {
                Some(e) => Ok(CellValue::Error(e)),
                None => {
                    log::warn!("unknown error code {:?}, keeping it as text", raw);
                    Ok(CellValue::Text(raw.to_string()))
                }
            },
            TypeHint::Text => Ok(CellValue::Text(raw.to_string())),
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    /// Check if the cell contains an error
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// The number, if this is a number cell
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean, if this is a boolean cell
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The text, if this is a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The error code, if this is an error cell
    pub fn as_error(&self) -> Option<CellError> {
        match self {
            CellValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Get the formula text if this is a formula cell
    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellValue::Formula { formula, .. } => Some(formula),
            _ => None,
        }
    }

    /// Get the cached result if this is a formula cell
    pub fn cached_value(&self) -> Option<&CachedValue> {
        match self {
            CellValue::Formula { cached, .. } => Some(cached),
            _ => None,
        }
    }

    /// The value a reader sees: the cached result for formulas, the value itself otherwise
    pub fn effective_value(&self) -> CellValue {
        match self {
            CellValue::Formula { cached, .. } => cached.clone().into(),
            other => other.clone(),
        }
    }

    /// Get the type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Text(_) => "text",
            CellValue::Number(_) => "number",
            CellValue::Boolean(_) => "boolean",
            CellValue::Error(_) => "error",
            CellValue::Formula { .. } => "formula",
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw == "1" || raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw == "0" || raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Error(e) => write!(f, "{}", e),
            CellValue::Formula { cached, .. } => write!(f, "{}", cached),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

impl From<CachedValue> for CellValue {
    fn from(v: CachedValue) -> Self {
        match v {
            CachedValue::Text(s) => CellValue::Text(s),
            CachedValue::Number(n) => CellValue::Number(n),
            CachedValue::Boolean(b) => CellValue::Boolean(b),
            CachedValue::Error(e) => CellValue::Error(e),
        }
    }
}

/// The scalar result cached alongside a formula
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CachedValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Error(CellError),
}

impl CachedValue {
    /// Convert a parsed value into a cached result; an empty value becomes empty text
    pub fn from_value(value: CellValue) -> Self {
        match value {
            CellValue::Empty => CachedValue::Text(String::new()),
            CellValue::Text(s) => CachedValue::Text(s),
            CellValue::Number(n) => CachedValue::Number(n),
            CellValue::Boolean(b) => CachedValue::Boolean(b),
            CellValue::Error(e) => CachedValue::Error(e),
            CellValue::Formula { cached, .. } => cached,
        }
    }
}

impl Default for CachedValue {
    fn default() -> Self {
        CachedValue::Text(String::new())
    }
}

impl fmt::Display for CachedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachedValue::Text(s) => f.write_str(s),
            CachedValue::Number(n) => write!(f, "{}", n),
            CachedValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CachedValue::Error(e) => write!(f, "{}", e),
        }
    }
}

/// How the raw token of a cell should be read, from its `t` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    /// No attribute or `n`
    Number,
    /// `s`: the token is an index into the shared string table
    SharedString,
    /// `b`
    Boolean,
    /// `e`
    Error,
    /// `str`, `inlineStr`, `d` and anything unrecognised
    Text,
}

impl TypeHint {
    /// Map the `t` attribute of a cell record to a hint
    pub fn from_attr(t: Option<&str>) -> Self {
        match t {
            None | Some("n") => TypeHint::Number,
            Some("s") => TypeHint::SharedString,
            Some("b") => TypeHint::Boolean,
            Some("e") => TypeHint::Error,
            Some(_) => TypeHint::Text,
        }
    }
}

/// Spreadsheet error values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellError {
    /// #NULL! - Incorrect range operator
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized formula name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
    /// #GETTING_DATA - External data is loading
    GettingData,
    /// #SPILL! - Dynamic array cannot spill
    Spill,
    /// #CALC! - Calculation error
    Calc,
    /// #FIELD! - Missing field in a linked data type
    Field,
    /// #BLOCKED! - Blocked by a security setting
    Blocked,
    /// #UNKNOWN! - Unsupported data type
    Unknown,
    /// #CONNECT! - Could not reach a service
    Connect,
    /// #BUSY! - Still computing
    Busy,
}

impl CellError {
    const ALL: [CellError; 15] = [
        CellError::Null,
        CellError::Div0,
        CellError::Value,
        CellError::Ref,
        CellError::Name,
        CellError::Num,
        CellError::Na,
        CellError::GettingData,
        CellError::Spill,
        CellError::Calc,
        CellError::Field,
        CellError::Blocked,
        CellError::Unknown,
        CellError::Connect,
        CellError::Busy,
    ];

    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
            CellError::GettingData => "#GETTING_DATA",
            CellError::Spill => "#SPILL!",
            CellError::Calc => "#CALC!",
            CellError::Field => "#FIELD!",
            CellError::Blocked => "#BLOCKED!",
            CellError::Unknown => "#UNKNOWN!",
            CellError::Connect => "#CONNECT!",
            CellError::Busy => "#BUSY!",
        }
    }

    /// Parse an error code (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index-addressable text entries referenced by cells instead of inline text
///
/// A table is owned by the reader or writer working on one workbook; nothing
/// is cached across workbooks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedStringTable {
    entries: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl SharedStringTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry as read from a file; duplicates keep their own index
    pub fn push<S: Into<String>>(&mut self, s: S) -> usize {
        let s = s.into();
        let idx = self.entries.len();
        self.lookup.entry(s.clone()).or_insert(idx);
        self.entries.push(s);
        idx
    }

    /// Index of `s`, appending it if it is not present yet
    pub fn intern(&mut self, s: &str) -> usize {
        match self.lookup.get(s) {
            Some(&idx) => idx,
            None => self.push(s),
        }
    }

    /// Entry at a zero-based index
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.entries.get(idx).map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in index order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}
