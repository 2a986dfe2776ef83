//! Tokenizers turning part bytes into flat records
//!
//! Each part kind has its own pull loop over quick-xml events. The sheet loop
//! is an explicit state machine: a cell record opens on `<c>` and closes only
//! on its own `</c>` (or on a self-closing `<c/>`). Closing a nested element
//! such as `</f>` or `</v>` ends that capture and nothing else.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use lightxl_core::{CellAddress, CellRange, SharedStringTable, MAX_COLS};

use crate::error::{XlsxError, XlsxResult};
use crate::escape::decode_excel_escapes;

/// SpreadsheetML namespaces this reader understands
pub const SPREADSHEETML_NAMESPACES: [&str; 2] = [
    "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
    "http://purl.oclc.org/ooxml/spreadsheetml/main",
];

/// A sheet as declared in the workbook part, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetDecl {
    pub name: String,
    pub sheet_id: u32,
    pub rel_id: Option<String>,
}

/// One entry of a relationships part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Check the relationship type by its last path segment (`worksheet`, `sharedStrings`, ...)
    pub fn is_kind(&self, kind: &str) -> bool {
        self.rel_type.rsplit('/').next() == Some(kind)
    }
}

/// One entry of `[Content_Types].xml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    Default {
        extension: String,
        content_type: String,
    },
    Override {
        part_name: String,
        content_type: String,
    },
}

/// Formula found on a cell
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormulaRecord {
    /// Formula text; empty for dependents of a shared formula
    pub text: String,
    /// `t` attribute (`shared`, `array`, ...)
    pub kind: Option<String>,
    /// `si` attribute of a shared formula
    pub shared_index: Option<u32>,
}

impl FormulaRecord {
    pub fn is_shared(&self) -> bool {
        self.kind.as_deref() == Some("shared") && self.shared_index.is_some()
    }
}

/// A complete cell record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRecord {
    pub address: CellAddress,
    /// `t` attribute
    pub type_attr: Option<String>,
    /// Text of `<v>`
    pub value: Option<String>,
    /// Text of `<is>`, runs concatenated
    pub inline: Option<String>,
    pub formula: Option<FormulaRecord>,
}

/// Records of a sheet part
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetRecord {
    Cell(CellRecord),
    Merge(CellRange),
}

/// A direct child of a part's root element, by byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpan {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// Layout of a part's root element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RootLayout {
    /// Direct children of the root, in document order
    pub children: Vec<ElementSpan>,
    /// Offset of the root's closing tag, if it has one
    pub close_start: Option<usize>,
    /// Namespace declarations on the root: (prefix, uri); "" is the default namespace
    pub namespaces: Vec<(String, String)>,
}

impl RootLayout {
    /// First direct child with this local name
    pub fn child(&self, name: &str) -> Option<&ElementSpan> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Prefix bound to a namespace on the root
    pub fn prefix_for(&self, uri_suffix: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|(prefix, uri)| !prefix.is_empty() && uri.ends_with(uri_suffix))
            .map(|(prefix, _)| prefix.as_str())
    }
}

fn xml_reader(bytes: &[u8]) -> Reader<&[u8]> {
    Reader::from_reader(bytes)
}

fn local_name(e: &BytesStart<'_>) -> Vec<u8> {
    e.local_name().as_ref().to_vec()
}

/// Value of an attribute by local name (any prefix)
fn attr(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local && !a.key.as_ref().starts_with(b"xmlns"))
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn preserves_space(e: &BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .any(|a| a.key.as_ref() == b"xml:space" && a.value.as_ref() == b"preserve")
}

/// Apply the format's whitespace rule to one text run
fn finish_run(raw: &str, preserve: bool) -> String {
    if preserve {
        decode_excel_escapes(raw)
    } else {
        decode_excel_escapes(raw.trim())
    }
}

// ==================== Workbook ====================

/// Read sheet declarations from the workbook part
///
/// Fails with [`XlsxError::UnsupportedFormatVersion`] when the root element
/// is bound to a namespace other than SpreadsheetML.
pub fn tokenize_workbook(part: &str, bytes: &[u8]) -> XlsxResult<Vec<SheetDecl>> {
    let mut reader = xml_reader(bytes);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if !seen_root {
                    seen_root = true;
                    check_root_namespace(part, &e)?;
                } else if e.local_name().as_ref() == b"sheet" {
                    let name = attr(&e, b"name").ok_or_else(|| {
                        XlsxError::malformed(part, "<sheet> without a name")
                    })?;
                    let sheet_id = attr(&e, b"sheetId")
                        .and_then(|s| s.trim().parse::<u32>().ok())
                        .ok_or_else(|| {
                            XlsxError::malformed(part, format!("sheet '{}' has no sheetId", name))
                        })?;
                    let rel_id = attr(&e, b"id");
                    sheets.push(SheetDecl {
                        name,
                        sheet_id,
                        rel_id,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::malformed(part, e)),
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(XlsxError::malformed(part, "no root element"));
    }
    Ok(sheets)
}

fn check_root_namespace(part: &str, root: &BytesStart<'_>) -> XlsxResult<()> {
    if root.local_name().as_ref() != b"workbook" {
        return Err(XlsxError::malformed(part, "root element is not <workbook>"));
    }
    let ns_key: Vec<u8> = match root.name().prefix() {
        Some(prefix) => [b"xmlns:".as_slice(), prefix.as_ref()].concat(),
        None => b"xmlns".to_vec(),
    };
    let declared = root
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == ns_key.as_slice())
        .map(|a| String::from_utf8_lossy(&a.value).into_owned());

    match declared {
        Some(ns) if !SPREADSHEETML_NAMESPACES.contains(&ns.as_str()) => {
            Err(XlsxError::UnsupportedFormatVersion(format!(
                "{} declares namespace {}",
                part, ns
            )))
        }
        Some(_) => Ok(()),
        None => {
            log::debug!("{} declares no namespace, assuming SpreadsheetML", part);
            Ok(())
        }
    }
}

// ==================== Relationships / content types ====================

/// Read a relationships part
pub fn tokenize_relationships(part: &str, bytes: &[u8]) -> XlsxResult<Vec<Relationship>> {
    let mut reader = xml_reader(bytes);
    let mut buf = Vec::new();
    let mut rels = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(rel_type), Some(target)) =
                    (attr(&e, b"Id"), attr(&e, b"Type"), attr(&e, b"Target"))
                {
                    let external = attr(&e, b"TargetMode").as_deref() == Some("External");
                    rels.push(Relationship {
                        id,
                        rel_type,
                        target,
                        external,
                    });
                } else {
                    log::warn!("{}: skipping incomplete relationship", part);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::malformed(part, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Read `[Content_Types].xml`
pub fn tokenize_content_types(part: &str, bytes: &[u8]) -> XlsxResult<Vec<ContentType>> {
    let mut reader = xml_reader(bytes);
    let mut buf = Vec::new();
    let mut entries = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"Default" => {
                    if let (Some(extension), Some(content_type)) =
                        (attr(&e, b"Extension"), attr(&e, b"ContentType"))
                    {
                        entries.push(ContentType::Default {
                            extension,
                            content_type,
                        });
                    }
                }
                b"Override" => {
                    if let (Some(part_name), Some(content_type)) =
                        (attr(&e, b"PartName"), attr(&e, b"ContentType"))
                    {
                        entries.push(ContentType::Override {
                            part_name,
                            content_type,
                        });
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::malformed(part, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

// ==================== Shared strings ====================

/// Accumulates the runs of one `<si>` or `<is>` item
#[derive(Debug, Default)]
struct RichText {
    text: String,
    run: Option<(String, bool)>,
    phonetic_depth: u32,
}

impl RichText {
    fn start(&mut self, name: &[u8], e: &BytesStart<'_>) {
        match name {
            b"rPh" => self.phonetic_depth += 1,
            b"t" if self.phonetic_depth == 0 => self.run = Some((String::new(), preserves_space(e))),
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"rPh" => self.phonetic_depth = self.phonetic_depth.saturating_sub(1),
            b"t" => {
                if let Some((raw, preserve)) = self.run.take() {
                    self.text.push_str(&finish_run(&raw, preserve));
                }
            }
            _ => {}
        }
    }

    fn push(&mut self, s: &str) {
        if let Some((raw, _)) = self.run.as_mut() {
            raw.push_str(s);
        }
    }

    fn finish(self) -> String {
        self.text
    }
}

/// Read the shared string table
///
/// Every `<si>` becomes one entry, so indices line up with the part even
/// when entries repeat.
pub fn tokenize_shared_strings(part: &str, bytes: &[u8]) -> XlsxResult<SharedStringTable> {
    let mut reader = xml_reader(bytes);
    let mut buf = Vec::new();
    let mut table = SharedStringTable::new();
    let mut item: Option<RichText> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if name == b"si" {
                    if item.is_some() {
                        return Err(XlsxError::malformed(part, "<si> inside <si>"));
                    }
                    item = Some(RichText::default());
                } else if let Some(item) = item.as_mut() {
                    item.start(&name, &e);
                }
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"si" {
                    table.push(String::new());
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"si" {
                    let done = item
                        .take()
                        .ok_or_else(|| XlsxError::malformed(part, "</si> without <si>"))?;
                    table.push(done.finish());
                } else if let Some(item) = item.as_mut() {
                    item.end(&name);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(item) = item.as_mut() {
                    let text = e.unescape().map_err(|e| XlsxError::malformed(part, e))?;
                    item.push(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(item) = item.as_mut() {
                    item.push(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::malformed(part, e)),
            _ => {}
        }
        buf.clear();
    }

    log::debug!("{}: {} shared strings", part, table.len());
    Ok(table)
}

// ==================== Sheets ====================

/// What the text events inside a cell currently belong to
#[derive(Debug)]
enum Capture {
    Nothing,
    Value(String),
    Formula(String),
    Inline,
}

/// A cell record being assembled between `<c>` and `</c>`
#[derive(Debug)]
struct OpenCell {
    record: CellRecord,
    capture: Capture,
    inline: Option<RichText>,
}

/// Sheet tokenizer state
struct SheetTokenizer<'p> {
    part: &'p str,
    row: u32,
    col: u16,
    cell: Option<OpenCell>,
    records: Vec<SheetRecord>,
}

impl<'p> SheetTokenizer<'p> {
    fn new(part: &'p str) -> Self {
        Self {
            part,
            row: 0,
            col: 0,
            cell: None,
            records: Vec::new(),
        }
    }

    fn malformed<R: ToString>(&self, reason: R) -> XlsxError {
        XlsxError::malformed(self.part, reason)
    }

    fn start_row(&mut self, e: &BytesStart<'_>) -> XlsxResult<()> {
        if self.cell.is_some() {
            return Err(self.malformed("<row> inside a cell"));
        }
        self.row = match attr(e, b"r") {
            Some(r) => r
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|&r| r >= 1)
                .ok_or_else(|| self.malformed(format!("invalid row number '{}'", r)))?,
            None => self.row + 1,
        };
        self.col = 0;
        Ok(())
    }

    /// Open a cell record; `<c>` inside an open cell is an error
    fn open_cell(&mut self, e: &BytesStart<'_>) -> XlsxResult<()> {
        if self.cell.is_some() {
            return Err(self.malformed("<c> inside another <c>"));
        }
        let address = match attr(e, b"r") {
            Some(label) => CellAddress::parse(&label)
                .map_err(|err| self.malformed(format!("cell reference: {}", err)))?,
            None => {
                let row = self.row.max(1);
                if self.col >= MAX_COLS {
                    return Err(self.malformed(format!("row {} runs past the last column", row)));
                }
                CellAddress::new(row, self.col + 1)
                    .map_err(|err| self.malformed(format!("inferred cell reference: {}", err)))?
            }
        };
        self.row = address.row;
        self.col = address.col;
        self.cell = Some(OpenCell {
            record: CellRecord {
                address,
                type_attr: attr(e, b"t"),
                value: None,
                inline: None,
                formula: None,
            },
            capture: Capture::Nothing,
            inline: None,
        });
        Ok(())
    }

    /// Close the open cell and emit it
    fn close_cell(&mut self) -> XlsxResult<()> {
        let open = self
            .cell
            .take()
            .ok_or_else(|| self.malformed("</c> without an open cell"))?;
        let mut record = open.record;
        if let Some(inline) = open.inline {
            record.inline = Some(inline.finish());
        }
        self.records.push(SheetRecord::Cell(record));
        Ok(())
    }

    fn start_in_cell(&mut self, name: &[u8], e: &BytesStart<'_>, empty: bool) {
        let Some(open) = self.cell.as_mut() else {
            return;
        };
        match name {
            b"v" if !empty => open.capture = Capture::Value(String::new()),
            b"v" => open.record.value = Some(String::new()),
            b"f" => {
                let formula = FormulaRecord {
                    text: String::new(),
                    kind: attr(e, b"t"),
                    shared_index: attr(e, b"si").and_then(|s| s.trim().parse().ok()),
                };
                open.record.formula = Some(formula);
                if !empty {
                    open.capture = Capture::Formula(String::new());
                }
            }
            b"is" if !empty => {
                open.capture = Capture::Inline;
                open.inline = Some(RichText::default());
            }
            b"is" => open.inline = Some(RichText::default()),
            _ => {
                if let (Capture::Inline, Some(inline)) = (&open.capture, open.inline.as_mut()) {
                    inline.start(name, e);
                    if empty {
                        inline.end(name);
                    }
                }
            }
        }
    }

    /// End tags inside a cell finish their capture and never the cell
    fn end_in_cell(&mut self, name: &[u8]) {
        let Some(open) = self.cell.as_mut() else {
            return;
        };
        match (name, std::mem::replace(&mut open.capture, Capture::Nothing)) {
            (b"v", Capture::Value(text)) => open.record.value = Some(decode_excel_escapes(&text)),
            (b"f", Capture::Formula(text)) => {
                if let Some(formula) = open.record.formula.as_mut() {
                    formula.text = text;
                }
            }
            (b"is", Capture::Inline) => {}
            (_, Capture::Inline) => {
                if let Some(inline) = open.inline.as_mut() {
                    inline.end(name);
                }
                open.capture = Capture::Inline;
            }
            (_, other) => open.capture = other,
        }
    }

    fn text(&mut self, s: &str) {
        let Some(open) = self.cell.as_mut() else {
            return;
        };
        match &mut open.capture {
            Capture::Value(buf) | Capture::Formula(buf) => buf.push_str(s),
            Capture::Inline => {
                if let Some(inline) = open.inline.as_mut() {
                    inline.push(s);
                }
            }
            Capture::Nothing => {}
        }
    }

    fn merge(&mut self, e: &BytesStart<'_>) -> XlsxResult<()> {
        if let Some(reference) = attr(e, b"ref") {
            let range = CellRange::parse(&reference)
                .map_err(|err| self.malformed(format!("merge range: {}", err)))?;
            self.records.push(SheetRecord::Merge(range));
        }
        Ok(())
    }
}

/// Tokenize a sheet part into cell and merge records
pub fn tokenize_sheet(part: &str, bytes: &[u8]) -> XlsxResult<Vec<SheetRecord>> {
    let mut reader = xml_reader(bytes);
    let mut buf = Vec::new();
    let mut state = SheetTokenizer::new(part);

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                match name.as_slice() {
                    b"row" => state.start_row(&e)?,
                    b"c" => state.open_cell(&e)?,
                    b"mergeCell" => state.merge(&e)?,
                    _ => state.start_in_cell(&name, &e, false),
                }
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                match name.as_slice() {
                    b"row" => state.start_row(&e)?,
                    b"c" => {
                        // A self-closing cell has no value; it only moves the column
                        state.open_cell(&e)?;
                        state.cell = None;
                    }
                    b"mergeCell" => state.merge(&e)?,
                    _ => state.start_in_cell(&name, &e, true),
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"c" => state.close_cell()?,
                    b"row" if state.cell.is_some() => {
                        return Err(state.malformed("</row> inside an open cell"));
                    }
                    _ => state.end_in_cell(&name),
                }
            }
            Ok(Event::Text(e)) => {
                if state.cell.is_some() {
                    let text = e.unescape().map_err(|e| XlsxError::malformed(part, e))?;
                    state.text(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if state.cell.is_some() {
                    state.text(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::malformed(part, e)),
            _ => {}
        }
        buf.clear();
    }

    if state.cell.is_some() {
        return Err(state.malformed("unterminated <c>"));
    }
    Ok(state.records)
}

// ==================== Root layout ====================

/// Locate the direct children of a part's root element by byte range
///
/// Used to splice regenerated elements into an otherwise untouched part.
pub fn root_layout(part: &str, bytes: &[u8]) -> XlsxResult<RootLayout> {
    let mut reader = xml_reader(bytes);
    let mut buf = Vec::new();
    let mut layout = RootLayout::default();
    let mut depth = 0usize;
    let mut open_child: Option<(String, usize)> = None;

    // The tag just read starts at the last '<' before the reader's position
    let tag_start = |end: usize| bytes[..end].iter().rposition(|&b| b == b'<').unwrap_or(0);

    loop {
        let event = reader.read_event_into(&mut buf);
        let end = reader.buffer_position() as usize;
        match event {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    layout.namespaces = namespaces(&e);
                } else if depth == 1 {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    open_child = Some((name, tag_start(end)));
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    layout.namespaces = namespaces(&e);
                } else if depth == 1 {
                    layout.children.push(ElementSpan {
                        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                        start: tag_start(end),
                        end,
                    });
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                if depth == 1 {
                    if let Some((name, start)) = open_child.take() {
                        layout.children.push(ElementSpan { name, start, end });
                    }
                } else if depth == 0 {
                    layout.close_start = Some(tag_start(end));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::malformed(part, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(layout)
}

fn namespaces(e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .filter_map(|a| {
            let key = a.key.as_ref();
            let prefix = if key == b"xmlns" {
                String::new()
            } else if let Some(p) = key.strip_prefix(b"xmlns:") {
                String::from_utf8_lossy(p).into_owned()
            } else {
                return None;
            };
            Some((prefix, String::from_utf8_lossy(&a.value).into_owned()))
        })
        .collect()
}
