//! Text escaping for XML parts

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses this format to encode characters XML cannot carry:
/// - `_x000d_` = CR (carriage return)
/// - `_x0009_` = Tab
/// - `_x005f_` = Underscore (escaped underscore)
pub fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match parse_escape(candidate) {
            Some(c) => {
                result.push(c);
                rest = &candidate[7..];
            }
            None => {
                result.push('_');
                rest = &candidate[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Parse `_xHHHH_` at the start of `s`
fn parse_escape(s: &str) -> Option<char> {
    let bytes = s.as_bytes();
    if bytes.len() < 7 || bytes[6] != b'_' {
        return None;
    }
    let hex = &bytes[2..6];
    if bytes[1] != b'x' || !hex.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let hex = std::str::from_utf8(hex).ok()?;
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

/// Encode text so it survives a trip through an XML part.
///
/// Characters XML 1.0 cannot hold and `\r` (which parsers normalize away)
/// become `_xHHHH_`. A literal `_xHHHH_` in the text is protected as
/// `_x005F_xHHHH_` so it does not decode into something else.
pub fn encode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        if c == '_' && parse_escape(&s[i..]).is_some() {
            result.push_str("_x005F_");
        } else if needs_escape(c) {
            result.push_str(&format!("_x{:04X}_", c as u32));
        } else {
            result.push(c);
        }
    }
    result
}

fn needs_escape(c: char) -> bool {
    match c {
        '\t' | '\n' => false,
        '\r' => true,
        '\u{0}'..='\u{1F}' => true,
        '\u{FFFE}' | '\u{FFFF}' => true,
        _ => false,
    }
}

/// Escape the five XML special characters
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
