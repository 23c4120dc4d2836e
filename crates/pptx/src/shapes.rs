//! Shape-level reading of slide and notes XML.

use deck_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// EMUs per pixel at 96 DPI.
pub(crate) const EMU_PER_PIXEL: i64 = 9525;

/// What kind of shape element a [`ShapeInfo`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ShapeKind {
    /// `p:sp`, possibly with a text body.
    #[default]
    Text,
    /// `p:pic`.
    Picture,
    /// `p:graphicFrame`, possibly holding a table.
    Frame,
}

/// A paragraph with its outline level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Paragraph {
    pub level: u32,
    pub text: String,
}

/// Information about a shape extracted from XML.
#[derive(Debug, Default)]
pub(crate) struct ShapeInfo {
    pub kind: ShapeKind,
    pub id: u32,
    pub name: String,
    /// Placeholder type (`title`, `body`, ...); `obj` when the type is implied.
    pub placeholder: Option<String>,
    pub has_text_frame: bool,
    pub paragraphs: Vec<Paragraph>,
    /// Cell text by row, for table frames.
    pub table: Option<Vec<Vec<String>>>,
    /// Relationship id of an embedded picture.
    pub embed: Option<String>,
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl ShapeInfo {
    /// Whether this is the slide's designated title placeholder.
    pub fn is_title(&self) -> bool {
        matches!(self.placeholder.as_deref(), Some("title") | Some("ctrTitle"))
    }

    /// Whole-shape text, paragraphs joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// Streaming state while walking a shape tree.
#[derive(Default)]
struct ShapeReader {
    shapes: Vec<ShapeInfo>,
    current: Option<ShapeInfo>,
    /// Shape elements opened inside the current shape (e.g. fallback pictures).
    nested: usize,
    /// Depth of open `mc:Fallback` elements; only the `mc:Choice` branch is read.
    fallback: usize,
    in_xfrm: bool,
    in_text_body: bool,
    in_table: bool,
    in_cell: bool,
    cell_has_paragraph: bool,
    in_text: bool,
}

impl ShapeReader {
    fn open(&mut self, e: &BytesStart) {
        let name = e.name();
        let local = local_name(name.as_ref());

        if local == b"Fallback" {
            self.fallback += 1;
        }
        if self.fallback > 0 {
            return;
        }

        if matches!(local, b"sp" | b"pic" | b"graphicFrame") {
            if self.current.is_some() {
                self.nested += 1;
            } else {
                let kind = match local {
                    b"pic" => ShapeKind::Picture,
                    b"graphicFrame" => ShapeKind::Frame,
                    _ => ShapeKind::Text,
                };
                self.current = Some(ShapeInfo {
                    kind,
                    ..ShapeInfo::default()
                });
            }
            return;
        }

        let in_text_body = self.in_text_body;
        let in_cell = self.in_cell;
        let in_xfrm = self.in_xfrm;
        let nested = self.nested;
        let Some(shape) = self.current.as_mut() else {
            return;
        };

        match local {
            b"cNvPr" if nested == 0 && shape.id == 0 => {
                shape.id = attr(e, b"id").and_then(|v| v.parse().ok()).unwrap_or(0);
                shape.name = attr(e, b"name").unwrap_or_default();
            }
            b"ph" if nested == 0 => {
                shape.placeholder = Some(attr(e, b"type").unwrap_or_else(|| "obj".to_string()));
            }
            b"xfrm" => self.in_xfrm = true,
            b"off" if in_xfrm && nested == 0 => {
                shape.x = attr(e, b"x").and_then(|v| v.parse().ok()).unwrap_or(shape.x);
                shape.y = attr(e, b"y").and_then(|v| v.parse().ok()).unwrap_or(shape.y);
            }
            b"ext" if in_xfrm && nested == 0 => {
                shape.cx = attr(e, b"cx").and_then(|v| v.parse().ok()).unwrap_or(shape.cx);
                shape.cy = attr(e, b"cy").and_then(|v| v.parse().ok()).unwrap_or(shape.cy);
            }
            b"txBody" if !in_cell => {
                shape.has_text_frame = true;
                self.in_text_body = true;
            }
            b"tbl" => {
                shape.table = Some(Vec::new());
                self.in_table = true;
            }
            b"tr" if self.in_table => {
                if let Some(rows) = shape.table.as_mut() {
                    rows.push(Vec::new());
                }
            }
            b"tc" if self.in_table => {
                if let Some(row) = shape.table.as_mut().and_then(|rows| rows.last_mut()) {
                    row.push(String::new());
                }
                self.in_cell = true;
                self.cell_has_paragraph = false;
            }
            b"p" if in_cell => {
                if self.cell_has_paragraph {
                    self.push_text("\n");
                }
                self.cell_has_paragraph = true;
            }
            b"p" if in_text_body => shape.paragraphs.push(Paragraph::default()),
            b"pPr" if in_text_body && !in_cell => {
                if let Some(paragraph) = shape.paragraphs.last_mut() {
                    paragraph.level = attr(e, b"lvl").and_then(|v| v.parse().ok()).unwrap_or(0);
                }
            }
            b"t" => self.in_text = true,
            b"br" => self.push_text("\n"),
            b"blip" => {
                if shape.embed.is_none() {
                    shape.embed = prefixed_attr(e, b"embed");
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, local: &[u8]) {
        if self.fallback > 0 {
            if local == b"Fallback" {
                self.fallback -= 1;
            }
            return;
        }

        match local {
            b"sp" | b"pic" | b"graphicFrame" => {
                if self.nested > 0 {
                    self.nested -= 1;
                } else if let Some(shape) = self.current.take() {
                    self.shapes.push(shape);
                    self.in_xfrm = false;
                    self.in_text_body = false;
                    self.in_table = false;
                    self.in_cell = false;
                    self.in_text = false;
                }
            }
            b"t" => self.in_text = false,
            b"xfrm" => self.in_xfrm = false,
            b"txBody" if !self.in_cell => self.in_text_body = false,
            b"tc" => {
                if let Some(cell) = self.current_cell() {
                    *cell = cell.trim().to_string();
                }
                self.in_cell = false;
            }
            b"tbl" => self.in_table = false,
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_text && self.fallback == 0 {
            self.push_text(text);
        }
    }

    fn current_cell(&mut self) -> Option<&mut String> {
        self.current
            .as_mut()
            .and_then(|shape| shape.table.as_mut())
            .and_then(|rows| rows.last_mut())
            .and_then(|row| row.last_mut())
    }

    fn push_text(&mut self, text: &str) {
        if self.in_cell {
            if let Some(cell) = self.current_cell() {
                cell.push_str(text);
            }
        } else if self.in_text_body {
            if let Some(shape) = self.current.as_mut() {
                if shape.paragraphs.is_empty() {
                    shape.paragraphs.push(Paragraph::default());
                }
                if let Some(paragraph) = shape.paragraphs.last_mut() {
                    paragraph.text.push_str(text);
                }
            }
        }
    }
}

/// Extract shapes with text, tables, pictures and positions from slide XML.
///
/// Shapes nested in group shapes are returned alongside top-level shapes, in
/// document order.
pub(crate) fn parse_shapes(xml_content: &str) -> Result<Vec<ShapeInfo>> {
    let mut reader = Reader::from_str(xml_content);
    let mut state = ShapeReader::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => state.open(e),
            Ok(Event::Empty(ref e)) => {
                state.open(e);
                let name = e.name();
                state.close(local_name(name.as_ref()));
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::XmlError(format!("Bad text content: {}", e)))?;
                state.text(&text);
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                state.close(local_name(name.as_ref()));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(state.shapes)
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Read an unprefixed attribute.
pub(crate) fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Read a namespace-prefixed attribute by local name (`r:embed`, `r:id`).
pub(crate) fn prefixed_attr(e: &BytesStart, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| {
            let key = a.key.as_ref();
            key.contains(&b':') && local_name(key) == local
        })
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}
