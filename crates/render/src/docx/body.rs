//! `word/document.xml` body construction.

use crate::markup::{classify_lines, ContentLine};
use deck_core::TableGrid;
use quick_xml::escape::escape;
use std::fmt::Write as _;

/// Numbering instance for bullet items.
pub(crate) const BULLET_NUM_ID: u32 = 1;

/// Abstract numbering definitions referenced by `w:num` entries.
pub(crate) const BULLET_ABSTRACT_ID: u32 = 0;
pub(crate) const DECIMAL_ABSTRACT_ID: u32 = 1;

/// Deepest heading style defined in styles.xml.
const MAX_HEADING_LEVEL: usize = 6;

/// Builds the body XML paragraph by paragraph.
///
/// Every run of consecutive numbered items gets its own numbering instance,
/// so each list restarts at 1.
#[derive(Debug, Default)]
pub(crate) struct BodyWriter {
    xml: String,
    /// numIds of decimal lists, in creation order.
    decimal_lists: Vec<u32>,
    in_numbered_list: bool,
}

impl BodyWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// numIds of every decimal list written so far.
    pub fn decimal_lists(&self) -> &[u32] {
        &self.decimal_lists
    }

    pub fn title(&mut self, text: &str) {
        self.end_list();
        let _ = write!(
            self.xml,
            r#"<w:p><w:pPr><w:pStyle w:val="Title"/><w:jc w:val="center"/></w:pPr>{}</w:p>"#,
            runs(text)
        );
    }

    pub fn heading(&mut self, level: usize, text: &str) {
        self.end_list();
        let level = level.clamp(1, MAX_HEADING_LEVEL);
        let _ = write!(
            self.xml,
            r#"<w:p><w:pPr><w:pStyle w:val="Heading{}"/></w:pPr>{}</w:p>"#,
            level,
            runs(text)
        );
    }

    pub fn paragraph(&mut self, text: &str) {
        self.end_list();
        let _ = write!(self.xml, "<w:p>{}</w:p>", runs(text));
    }

    /// A paragraph of `label: value` lines with bold labels.
    pub fn labeled_lines(&mut self, lines: &[(&str, String)]) {
        self.end_list();
        self.xml.push_str("<w:p>");
        for (i, (label, value)) in lines.iter().enumerate() {
            if i > 0 {
                self.xml.push_str("<w:r><w:br/></w:r>");
            }
            let _ = write!(
                self.xml,
                r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}: </w:t></w:r>{}"#,
                xml_text(label),
                runs(value)
            );
        }
        self.xml.push_str("</w:p>");
    }

    pub fn bullet(&mut self, text: &str) {
        self.end_list();
        self.list_item(BULLET_NUM_ID, text);
    }

    pub fn numbered(&mut self, text: &str) {
        if !self.in_numbered_list {
            // numIds 1 is the bullet list; decimal lists follow.
            let num_id = BULLET_NUM_ID + 1 + self.decimal_lists.len() as u32;
            self.decimal_lists.push(num_id);
            self.in_numbered_list = true;
        }
        let num_id = self.decimal_lists.last().copied().unwrap_or(BULLET_NUM_ID + 1);
        self.list_item(num_id, text);
    }

    /// End the current numbered list; the next numbered item starts a new one.
    pub fn end_list(&mut self) {
        self.in_numbered_list = false;
    }

    fn list_item(&mut self, num_id: u32, text: &str) {
        let _ = write!(
            self.xml,
            r#"<w:p><w:pPr><w:pStyle w:val="ListParagraph"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="{}"/></w:numPr></w:pPr>{}</w:p>"#,
            num_id,
            runs(text)
        );
    }

    pub fn page_break(&mut self) {
        self.end_list();
        self.xml.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
    }

    /// Model-written content: headings nest below `base_level`.
    pub fn formatted(&mut self, text: &str, base_level: usize) {
        for line in classify_lines(text) {
            match line {
                ContentLine::Heading { level, text } => self.heading(level + base_level, text),
                ContentLine::Bullet(text) => self.bullet(text),
                ContentLine::Numbered(text) => self.numbered(text),
                ContentLine::Paragraph(text) => self.paragraph(text),
            }
        }
        self.end_list();
    }

    pub fn table(&mut self, table: &TableGrid) {
        self.end_list();
        if table.is_empty() {
            return;
        }

        self.xml.push_str(r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="5000" w:type="pct"/><w:tblBorders>"#);
        for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            let _ = write!(
                self.xml,
                r#"<w:{} w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#,
                side
            );
        }
        self.xml.push_str("</w:tblBorders></w:tblPr><w:tblGrid>");
        for _ in 0..table.cols {
            self.xml.push_str("<w:gridCol/>");
        }
        self.xml.push_str("</w:tblGrid>");

        for row in &table.data {
            self.xml.push_str("<w:tr>");
            for cell in row {
                let _ = write!(
                    self.xml,
                    r#"<w:tc><w:tcPr><w:tcW w:w="0" w:type="auto"/></w:tcPr><w:p>{}</w:p></w:tc>"#,
                    runs(cell)
                );
            }
            self.xml.push_str("</w:tr>");
        }
        self.xml.push_str("</w:tbl>");

        // A table may not be the last body element before sectPr, and two
        // adjacent tables would merge.
        self.xml.push_str("<w:p/>");
    }

    /// The finished `word/document.xml`.
    pub fn into_document(self) -> String {
        let mut xml = String::with_capacity(self.xml.len() + 512);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>"#);
        xml.push_str(&self.xml);
        xml.push_str(r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#);
        xml.push_str("</w:body></w:document>");
        xml
    }
}

/// Runs for `text`, with line breaks between lines.
fn runs(text: &str) -> String {
    let mut xml = String::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            xml.push_str("<w:r><w:br/></w:r>");
        }
        if !line.is_empty() {
            let _ = write!(xml, r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#, xml_text(line));
        }
    }
    xml
}

/// Escape text and drop characters XML 1.0 cannot carry.
pub(crate) fn xml_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= ' ')
        .collect();
    escape(cleaned.as_str()).into_owned()
}
