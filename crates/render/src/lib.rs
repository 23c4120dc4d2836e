//! Document rendering for restructured slide records.
//!
//! Two output formats are supported: a `.docx` word processing package and a
//! `.md` markdown file. Both follow the same outline: title, document
//! information, table of contents, then one section per slide.

pub mod docx;
pub mod info;
pub mod markdown;
pub mod markup;

pub use docx::DocxRenderer;
pub use info::{DocumentInfo, DOCUMENT_TITLE};
pub use markdown::MarkdownRenderer;

use deck_core::{Error, OutputFormat, RestructuredRecord, Result};
use std::path::Path;

/// Section headings used by every renderer.
pub(crate) mod heading {
    pub const INFO: &str = "Document information";
    pub const CONTENTS: &str = "Contents";
    pub const SUMMARY: &str = "Summary";
    pub const CONTENT: &str = "Content";
    pub const KEY_POINTS: &str = "Key points";
    pub const TABLES: &str = "Tables";
    pub const TAGS: &str = "Tags";
    pub const NOTES: &str = "Speaker notes";
    pub const ORIGINAL: &str = "Original text";
}

/// Metadata labels.
pub(crate) mod label {
    pub const GENERATED: &str = "Generated";
    pub const SLIDES: &str = "Slides";
    pub const BACKEND: &str = "Backend";
    pub const MODEL: &str = "Model";
}

/// The original text is shown only when restructuring changed it.
pub(crate) fn original_text(record: &RestructuredRecord) -> Option<&str> {
    let original = record.provenance.original_text.as_str();
    (!original.trim().is_empty() && original != record.content).then_some(original)
}

/// Serializes records into one output format.
pub trait Renderer {
    fn format(&self) -> OutputFormat;

    /// Produce the complete file contents.
    fn render_bytes(&self, records: &[RestructuredRecord], info: &DocumentInfo) -> std::io::Result<Vec<u8>>;

    /// Render and write to `target`.
    fn write(&self, records: &[RestructuredRecord], info: &DocumentInfo, target: &Path) -> Result<()> {
        let render_error = |source: std::io::Error| Error::RenderError {
            path: target.to_path_buf(),
            source,
        };

        let bytes = self.render_bytes(records, info).map_err(render_error)?;
        std::fs::write(target, bytes).map_err(render_error)?;

        log::info!("Wrote {} ({} slides)", target.display(), records.len());
        Ok(())
    }
}

/// The renderer for `format`.
pub fn renderer_for(format: OutputFormat) -> Box<dyn Renderer> {
    match format {
        OutputFormat::Document => Box::new(DocxRenderer::new()),
        OutputFormat::Markup => Box::new(MarkdownRenderer::new()),
    }
}

/// Render `records` to `target` in `format`.
pub fn render(records: &[RestructuredRecord], target: &Path, format: OutputFormat) -> Result<()> {
    let info = DocumentInfo::from_records(records);
    renderer_for(format).write(records, &info, target)
}

#[cfg(test)]
pub(crate) mod testutil {
    use deck_core::{Provenance, RestructuredRecord, SlideRecord, TableGrid};

    /// A record with every optional field filled in.
    pub fn full_record(index: usize, title: &str) -> RestructuredRecord {
        let mut slide = SlideRecord::new(index, 255 + index as u32);
        slide.title = title.to_string();
        slide.body_text = "Original body".into();
        slide.bullets = vec!["Original bullet".into()];
        slide.tables.push(TableGrid::from_rows(vec![
            vec!["Region".into(), "Q1".into(), "Q2".into()],
            vec!["North | East".into(), "10".into(), "line one\nline two".into()],
        ]));
        slide.notes = "Remember to smile".into();

        let provenance = Provenance::for_slide(&slide, "local", "llama2");
        RestructuredRecord {
            content: "## Overview\nRevenue grew.\n- North led\n1. First step".into(),
            summary: "Revenue grew in Q2".into(),
            key_points: vec!["North led".into(), "Q2 beat Q1".into()],
            tags: vec!["finance".into(), "quarterly".into()],
            ..RestructuredRecord::from_slide(&slide, "", provenance)
        }
    }

    /// A record with only a title.
    pub fn bare_record(index: usize, title: &str) -> RestructuredRecord {
        let mut slide = SlideRecord::new(index, 255 + index as u32);
        slide.title = title.to_string();
        let provenance = Provenance::for_slide(&slide, "local", "llama2");
        RestructuredRecord::from_slide(&slide, "", provenance)
    }
}
