//! Shared formula expansion
//!
//! A shared formula is stored once, on its master cell; dependent cells only
//! carry the group index. Their text is the master's with every relative
//! reference moved by the dependent's offset from the master.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use lightxl_core::{CellAddress, MAX_COLS, MAX_ROWS};

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<ca>\$?)(?P<col>[A-Z]{1,3})(?P<ra>\$?)(?P<row>[0-9]{1,7})",
        r"|(?P<ca1>\$?)(?P<col1>[A-Z]{1,3}):(?P<ca2>\$?)(?P<col2>[A-Z]{1,3})",
        r"|(?P<ra1>\$?)(?P<row1>[0-9]{1,7}):(?P<ra2>\$?)(?P<row2>[0-9]{1,7})",
    ))
    .expect("reference pattern is valid")
});

/// Move the relative references of `formula` by `(row_shift, col_shift)`
///
/// Text inside string literals and quoted sheet names is left alone, as are
/// names that merely look like references (`LOG10(`, `ABC1DEF`). A reference
/// pushed outside the sheet becomes `#REF!`. Whole-column (`A:C`) and
/// whole-row (`2:4`) ranges move along their own axis only.
pub fn translate_shared_formula(formula: &str, row_shift: i64, col_shift: i64) -> String {
    if row_shift == 0 && col_shift == 0 {
        return formula.to_string();
    }

    let mut out = String::with_capacity(formula.len() + 8);
    let mut segment_start = 0;
    let mut quote: Option<char> = None;

    for (i, c) in formula.char_indices() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                out.push_str(&formula[segment_start..=i]);
                segment_start = i + 1;
            }
            Some(_) => {}
            None if c == '"' || c == '\'' => {
                out.push_str(&shift_segment(
                    &formula[segment_start..i],
                    row_shift,
                    col_shift,
                ));
                quote = Some(c);
                segment_start = i;
            }
            None => {}
        }
    }

    let tail = &formula[segment_start..];
    if quote.is_some() {
        out.push_str(tail);
    } else {
        out.push_str(&shift_segment(tail, row_shift, col_shift));
    }
    out
}

/// Shift references in a piece of formula text with no quotes in it
fn shift_segment(text: &str, row_shift: i64, col_shift: i64) -> String {
    REFERENCE
        .replace_all(text, |caps: &Captures| {
            let whole = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));
            if !is_reference_boundary(text, whole.0, whole.1) {
                return caps[0].to_string();
            }
            shift_reference(caps, row_shift, col_shift).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// A match is a reference only when it is not glued to a name or a call
fn is_reference_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let glued_before = before.map_or(false, |c| c.is_alphanumeric() || c == '_' || c == '.');
    let glued_after = after.map_or(false, |c| c.is_alphanumeric() || c == '_' || c == '(');
    !glued_before && !glued_after
}

fn shift_reference(caps: &Captures, row_shift: i64, col_shift: i64) -> Option<String> {
    if caps.name("col").is_some() {
        shift_cell(caps, row_shift, col_shift)
    } else if caps.name("col1").is_some() {
        shift_columns(caps, col_shift)
    } else {
        shift_rows(caps, row_shift)
    }
}

fn shift_cell(caps: &Captures, row_shift: i64, col_shift: i64) -> Option<String> {
    let col_abs = !caps["ca"].is_empty();
    let row_abs = !caps["ra"].is_empty();
    // Letters past XFD are a name, not a reference
    let col = CellAddress::letters_to_column(&caps["col"]).ok()? as i64;
    let row = parse_row(&caps["row"])?;

    let new_col = shift(col, col_abs, col_shift);
    let new_row = shift(row, row_abs, row_shift);
    if !in_columns(new_col) || !in_rows(new_row) {
        return Some("#REF!".to_string());
    }

    Some(format!(
        "{}{}{}{}",
        &caps["ca"],
        CellAddress::column_to_letters(new_col as u16),
        &caps["ra"],
        new_row
    ))
}

fn shift_columns(caps: &Captures, col_shift: i64) -> Option<String> {
    let first = CellAddress::letters_to_column(&caps["col1"]).ok()? as i64;
    let last = CellAddress::letters_to_column(&caps["col2"]).ok()? as i64;
    let first = shift(first, !caps["ca1"].is_empty(), col_shift);
    let last = shift(last, !caps["ca2"].is_empty(), col_shift);
    if !in_columns(first) || !in_columns(last) {
        return Some("#REF!".to_string());
    }

    Some(format!(
        "{}{}:{}{}",
        &caps["ca1"],
        CellAddress::column_to_letters(first as u16),
        &caps["ca2"],
        CellAddress::column_to_letters(last as u16)
    ))
}

fn shift_rows(caps: &Captures, row_shift: i64) -> Option<String> {
    let first = parse_row(&caps["row1"])?;
    let last = parse_row(&caps["row2"])?;
    let first = shift(first, !caps["ra1"].is_empty(), row_shift);
    let last = shift(last, !caps["ra2"].is_empty(), row_shift);
    if !in_rows(first) || !in_rows(last) {
        return Some("#REF!".to_string());
    }

    Some(format!("{}{}:{}{}", &caps["ra1"], first, &caps["ra2"], last))
}

fn parse_row(digits: &str) -> Option<i64> {
    let row: i64 = digits.parse().ok()?;
    in_rows(row).then_some(row)
}

fn shift(index: i64, absolute: bool, by: i64) -> i64 {
    if absolute {
        index
    } else {
        index + by
    }
}

fn in_columns(col: i64) -> bool {
    (1..=MAX_COLS as i64).contains(&col)
}

fn in_rows(row: i64) -> bool {
    (1..=MAX_ROWS as i64).contains(&row)
}
