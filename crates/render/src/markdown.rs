//! Markdown output.

use crate::info::DocumentInfo;
use crate::{heading, label, original_text, Renderer};
use deck_core::{OutputFormat, RestructuredRecord, TableGrid};
use std::fmt::Write as _;

/// Renders records as a single markdown document.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render to a string.
    pub fn render_string(&self, records: &[RestructuredRecord], info: &DocumentInfo) -> String {
        let mut out = String::new();

        let _ = write!(out, "# {}\n\n", info.title);

        let _ = write!(out, "## {}\n\n", heading::INFO);
        let _ = writeln!(out, "- **{}**: {}", label::GENERATED, info.generated_at());
        let _ = writeln!(out, "- **{}**: {}", label::SLIDES, info.slide_count);
        if let Some(backend) = &info.backend {
            let _ = writeln!(out, "- **{}**: {}", label::BACKEND, backend);
        }
        if let Some(model) = &info.model {
            let _ = writeln!(out, "- **{}**: {}", label::MODEL, model);
        }
        out.push('\n');

        let _ = write!(out, "## {}\n\n", heading::CONTENTS);
        for record in records {
            let _ = writeln!(out, "{}. [{}](#slide-{})", record.index, record.title, record.index);
        }
        out.push('\n');

        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                out.push_str("---\n\n");
            }
            write_record(&mut out, record);
        }

        out
    }
}

fn write_record(out: &mut String, record: &RestructuredRecord) {
    let _ = write!(
        out,
        "## <a name=\"slide-{}\"></a>{}. {}\n\n",
        record.index, record.index, record.title
    );

    if !record.summary.is_empty() {
        let _ = write!(out, "### {}\n\n{}\n\n", heading::SUMMARY, record.summary);
    }

    if !record.content.is_empty() {
        let _ = write!(out, "### {}\n\n{}\n\n", heading::CONTENT, record.content);
    }

    if !record.key_points.is_empty() {
        let _ = write!(out, "### {}\n\n", heading::KEY_POINTS);
        for point in &record.key_points {
            let _ = writeln!(out, "- {}", point);
        }
        out.push('\n');
    }

    let tables: Vec<&TableGrid> = record.tables.iter().filter(|t| !t.is_empty()).collect();
    if !tables.is_empty() {
        let _ = write!(out, "### {}\n\n", heading::TABLES);
        for table in tables {
            write_table(out, table);
        }
    }

    if !record.tags.is_empty() {
        let _ = write!(out, "### {}\n\n{}\n\n", heading::TAGS, record.tags.join(", "));
    }

    if !record.notes.is_empty() {
        let _ = write!(out, "### {}\n\n{}\n\n", heading::NOTES, record.notes);
    }

    if let Some(original) = original_text(record) {
        let _ = write!(out, "### {}\n\n{}\n\n", heading::ORIGINAL, original);
    }
}

/// Pipe table; the first row is the header.
fn write_table(out: &mut String, table: &TableGrid) {
    let row_line = |row: &[String]| {
        let cells: Vec<String> = row.iter().map(|cell| escape_cell(cell)).collect();
        format!("| {} |\n", cells.join(" | "))
    };

    let mut rows = table.data.iter();
    if let Some(header) = rows.next() {
        out.push_str(&row_line(header));
        let _ = writeln!(out, "| {} |", vec!["---"; table.cols].join(" | "));
    }
    for row in rows {
        out.push_str(&row_line(row));
    }
    out.push('\n');
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace("\r\n", "<br>").replace('\n', "<br>")
}

impl Renderer for MarkdownRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Markup
    }

    fn render_bytes(&self, records: &[RestructuredRecord], info: &DocumentInfo) -> std::io::Result<Vec<u8>> {
        Ok(self.render_string(records, info).into_bytes())
    }
}
