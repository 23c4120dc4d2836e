//! `.docx` output.
//!
//! The package is written part by part as XML text and zipped; no template
//! document is involved.

mod body;
mod package;

use crate::info::DocumentInfo;
use crate::{heading, label, original_text, Renderer};
use body::BodyWriter;
use deck_core::{OutputFormat, RestructuredRecord};

/// Content headings sit below the per-slide section headings.
const CONTENT_HEADING_OFFSET: usize = 2;

/// Renders records as a word processing document.
#[derive(Debug, Clone, Default)]
pub struct DocxRenderer;

impl DocxRenderer {
    pub fn new() -> Self {
        Self
    }

    fn write_body(&self, records: &[RestructuredRecord], info: &DocumentInfo) -> BodyWriter {
        let mut body = BodyWriter::new();

        body.title(&info.title);

        body.heading(1, heading::INFO);
        let mut lines = vec![
            (label::GENERATED, info.generated_at()),
            (label::SLIDES, info.slide_count.to_string()),
        ];
        if let Some(backend) = &info.backend {
            lines.push((label::BACKEND, backend.clone()));
        }
        if let Some(model) = &info.model {
            lines.push((label::MODEL, model.clone()));
        }
        body.labeled_lines(&lines);

        body.heading(1, heading::CONTENTS);
        for record in records {
            body.numbered(&record.title);
        }
        body.page_break();

        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                body.page_break();
            }
            write_record(&mut body, record);
        }

        body
    }
}

fn write_record(body: &mut BodyWriter, record: &RestructuredRecord) {
    body.heading(1, &format!("{}. {}", record.index, record.title));

    if !record.summary.is_empty() {
        body.heading(2, heading::SUMMARY);
        body.paragraph(&record.summary);
    }

    if !record.content.is_empty() {
        body.heading(2, heading::CONTENT);
        body.formatted(&record.content, CONTENT_HEADING_OFFSET);
    }

    if !record.key_points.is_empty() {
        body.heading(2, heading::KEY_POINTS);
        for point in &record.key_points {
            body.bullet(point);
        }
    }

    if record.tables.iter().any(|t| !t.is_empty()) {
        body.heading(2, heading::TABLES);
        for table in &record.tables {
            body.table(table);
        }
    }

    if !record.tags.is_empty() {
        body.heading(2, heading::TAGS);
        body.paragraph(&record.tags.join(", "));
    }

    if !record.notes.is_empty() {
        body.heading(2, heading::NOTES);
        body.paragraph(&record.notes);
    }

    if let Some(original) = original_text(record) {
        body.heading(2, heading::ORIGINAL);
        body.formatted(original, CONTENT_HEADING_OFFSET);
    }
}

impl Renderer for DocxRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Document
    }

    fn render_bytes(&self, records: &[RestructuredRecord], info: &DocumentInfo) -> std::io::Result<Vec<u8>> {
        let body = self.write_body(records, info);
        let decimal_lists = body.decimal_lists().to_vec();
        package::package(&body.into_document(), &decimal_lists, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{bare_record, full_record};
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn document_xml(records: &[RestructuredRecord]) -> String {
        let info = DocumentInfo::from_records(records);
        let bytes = DocxRenderer::new().render_bytes(records, &info).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive.by_name("word/document.xml").unwrap().read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn test_outline() {
        let xml = document_xml(&[full_record(1, "Intro"), bare_record(2, "Wrap up")]);

        assert!(xml.contains(r#"<w:pStyle w:val="Title"/><w:jc w:val="center"/>"#));
        assert!(xml.contains(">Presentation Knowledge Document<"));
        assert!(xml.contains(">Document information<"));
        assert!(xml.contains(">1. Intro<"));
        assert!(xml.contains(">2. Wrap up<"));
        assert!(xml.contains(">finance, quarterly<"));
        assert!(xml.contains(">Remember to smile<"));
        assert!(xml.contains(">Original body<"));
    }

    #[test]
    fn test_page_breaks() {
        let records: Vec<_> = (1..=3).map(|i| bare_record(i, "Slide")).collect();
        let xml = document_xml(&records);
        // One after the contents, then one between each pair of slides.
        assert_eq!(xml.matches(r#"<w:br w:type="page"/>"#).count(), 3);
    }

    #[test]
    fn test_table_is_rendered_as_grid() {
        let xml = document_xml(&[full_record(1, "Intro")]);
        assert_eq!(xml.matches("<w:tbl>").count(), 1);
        assert_eq!(xml.matches("<w:tr>").count(), 2);
        assert_eq!(xml.matches("<w:tc>").count(), 6);
        assert!(xml.contains(">North | East<"));
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let xml = document_xml(&[bare_record(1, "Lonely")]);
        for section in [">Summary<", ">Content<", ">Key points<", ">Tables<", ">Tags<", ">Speaker notes<", ">Original text<"] {
            assert!(!xml.contains(section), "unexpected {}", section);
        }
    }

    #[test]
    fn test_text_is_escaped() {
        let mut record = bare_record(1, "R&D <2024>");
        record.summary = "a \"quoted\" summary".into();
        let xml = document_xml(&[record]);
        assert!(xml.contains("R&amp;D &lt;2024&gt;"));
        assert!(xml.contains("a &quot;quoted&quot; summary"));
    }

    #[test]
    fn test_content_lists() {
        let xml = document_xml(&[full_record(1, "Intro")]);
        // Key points and the "- North led" content line are bullets.
        assert!(xml.matches(r#"<w:numId w:val="1"/>"#).count() >= 3);
        // Heading 2 in content becomes Heading4.
        assert!(xml.contains(r#"<w:pStyle w:val="Heading4"/></w:pPr><w:r><w:t xml:space="preserve">Overview<"#));
    }
}
